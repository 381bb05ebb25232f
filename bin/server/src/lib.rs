//! social-login web server.
//!
//! This crate wires the identity resolver into an Axum application: OAuth2
//! login per provider, a PostgreSQL identity store, and extractors that hand
//! handlers the session's resolved identity.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
