pub use trainhub_models::attendance::*;
