pub use trainhub_models::students::*;
