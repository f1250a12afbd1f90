pub use trainhub_models::programs::*;
