pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{init_session_attendance_router, init_slot_attendance_router};
