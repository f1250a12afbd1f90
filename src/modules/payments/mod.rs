pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{
    init_enrollment_payments_router, init_payments_router, init_session_payments_router,
};
