pub use trainhub_models::elearning::*;
