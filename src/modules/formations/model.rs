pub use trainhub_models::formations::*;
