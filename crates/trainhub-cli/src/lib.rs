//! # TrainHub CLI
//!
//! Administration and demo-data tooling used by the `trainhub-cli` binary.
//!
//! ```ignore
//! use trainhub_cli::seeder::{seed_all, SeedConfig};
//!
//! seed_all(&pool, SeedConfig::new(3)).await?;
//! ```

pub mod admin;
pub mod seeder;
