//! pushbox web server.
//!
//! Google sign-in and cookie sessions for the pushbox site, served with
//! Axum on top of `pushbox-session`.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
