//! Storage settings for generated documents.
//!
//! - `DOCUMENTS_STORAGE_DIR`: directory holding bulk archives (default `storage/documents`)
//! - `DOCUMENTS_BASE_URL`: public URL prefix for stored files
//! - `DOCUMENTS_MAX_ARCHIVE_BYTES`: largest archive a job may store (default 100 MiB)

use std::env;
use std::path::PathBuf;

use crate::env_parse;

pub const DEFAULT_MAX_ARCHIVE_BYTES: usize = 100 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct DocumentsConfig {
    pub storage_dir: PathBuf,
    pub base_url: String,
    pub max_archive_bytes: usize,
}

impl DocumentsConfig {
    pub fn from_env() -> Self {
        Self {
            storage_dir: env::var("DOCUMENTS_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("storage/documents")),
            base_url: env::var("DOCUMENTS_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/files".to_string()),
            max_archive_bytes: env_parse("DOCUMENTS_MAX_ARCHIVE_BYTES", DEFAULT_MAX_ARCHIVE_BYTES),
        }
    }
}
