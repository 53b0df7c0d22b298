//! Output writers: attachment files, naming helpers, and the Markdown document.

pub mod attachment;
pub mod filename;
pub mod markdown;
