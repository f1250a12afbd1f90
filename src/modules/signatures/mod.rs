//! Signature requests for conventions and contracts, and the public signing
//! endpoints reached through the emailed link.

pub mod controller;
pub mod emails;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{
    init_enrollment_signatures_router, init_public_signatures_router,
    init_session_signatures_router, init_signature_requests_router,
};
