pub use trainhub_models::users::*;
