pub use trainhub_models::grades::*;
