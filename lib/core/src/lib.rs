//! Core types shared by the social-login crates.
//!
//! Provides strongly-typed identifiers and the rootcause-based `Result`
//! alias used across the workspace.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{IdentityId, ParseIdError};
