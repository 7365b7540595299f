//! Document text sources.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::StoreError;

/// Extensions of binary document formats that need a dedicated extractor.
const BINARY_FORMATS: &[&str] = &["pdf", "doc", "docx", "odt", "rtf"];

/// Resolves a document path to its plain text.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, StoreError>;
}

/// Reads plain-text documents (`.txt`, `.md`, or no extension).
///
/// Invalid UTF-8 is replaced rather than rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextSource;

#[async_trait]
impl TextSource for PlainTextSource {
    async fn extract_text(&self, path: &Path) -> Result<String, StoreError> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let ext = ext.to_ascii_lowercase();
            if BINARY_FORMATS.contains(&ext.as_str()) {
                return Err(StoreError::UnsupportedFormat(ext));
            }
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::DocumentNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        debug!(path = %path.display(), chars = text.chars().count(), "extracted document text");
        Ok(text)
    }
}
