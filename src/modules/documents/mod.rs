//! Generated documents: single downloads, bulk ZIP jobs and document emails.

pub mod archive;
pub mod content;
pub mod controller;
pub mod emails;
pub mod jobs;
pub mod model;
pub mod naming;
pub mod pdf;
pub mod router;
pub mod service;
pub mod templates;

pub use model::*;
pub use router::{
    init_document_jobs_router, init_enrollment_documents_router, init_session_documents_router,
};
