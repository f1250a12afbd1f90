pub use trainhub_models::organizations::*;
