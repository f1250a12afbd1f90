pub mod controller;
pub mod generator;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{init_session_slots_router, init_slots_router};
