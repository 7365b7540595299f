//! Storage layer: document text sources in, newline-delimited JSON artifact out.

mod error;
pub use error::StoreError;

pub mod artifact;
pub use artifact::{OutputArtifact, to_json_line};

pub mod source;
pub use source::{PlainTextSource, TextSource};
