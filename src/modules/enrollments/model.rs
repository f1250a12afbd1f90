pub use trainhub_models::enrollments::*;
pub use trainhub_models::sessions::SessionCapacity;
