//! Data model for extracted messages: addresses, metadata, and saved attachments.

pub mod address;
pub mod attachment;
pub mod metadata;
