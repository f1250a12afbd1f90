pub use trainhub_models::documents::Language;
pub use trainhub_models::signatures::*;
