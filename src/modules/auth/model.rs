pub use trainhub_models::auth::*;
