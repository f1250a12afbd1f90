use thiserror::Error;

pub use trainhub_models::documents::*;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Archive creation failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered file ready to be served or attached.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}
