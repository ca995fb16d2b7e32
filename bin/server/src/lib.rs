//! hearthside web server.
//!
//! Exchanges identity-provider tokens for server-verifiable session cookies
//! and guards the privileged pages with them.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod pages;
