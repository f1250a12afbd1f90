pub use trainhub_models::payments::*;
