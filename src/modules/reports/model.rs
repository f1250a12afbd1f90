pub use trainhub_models::formations::FormationSummary;
pub use trainhub_models::reports::*;
