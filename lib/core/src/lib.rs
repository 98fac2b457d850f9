//! Core identifiers and error handling shared by the pushbox crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, UserId};
