//! Shared helpers for the HTTP layer.
//!
//! - [`auth_helpers`]: organization scoping for the authenticated caller
//! - [`email`]: SMTP delivery with attachments

pub mod auth_helpers;
pub mod email;
