//! `eml2md`: turn a single `.eml` message into Markdown plus its attachments.
//!
//! One pass over the MIME tree picks the readable body (plain text over HTML)
//! and saves attachment-disposed parts; `email.md` is written next to them.

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod model;
pub mod parser;
