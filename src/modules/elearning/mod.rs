pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{init_courses_router, init_elearning_router, init_session_elearning_router};
