pub use trainhub_models::slots::*;
