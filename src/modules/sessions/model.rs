pub use trainhub_models::sessions::*;
