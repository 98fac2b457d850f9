//! Session management and Google sign-in state for pushbox.
//!
//! This crate provides:
//! - Session tokens and their hashed storage keys (`SessionToken`, `SessionId`)
//! - Sessions with a 30-day sliding expiry (`Session`)
//! - The session lifecycle (`SessionManager`) with a tagged read-through cache
//! - Persistence capabilities (`SessionStore`, `UserStore`) and an in-memory store
//! - OAuth `state`/PKCE helpers and the `IdentityProvider` capability
//!
//! # Example
//!
//! ```
//! use pushbox_session::{MemoryStore, SessionManager, User, UserStore, generate_session_token};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! let user = User::new("google-sub-123".to_string(), "Alice".to_string());
//! store.insert_user(&user).await.unwrap();
//!
//! let sessions = SessionManager::new(store);
//! let token = generate_session_token();
//! sessions.create_session(&token, user.id()).await.unwrap();
//!
//! let current = sessions.validate_session_token(&token).await.unwrap();
//! assert_eq!(current.map(|c| c.user_id()), Some(user.id()));
//! # });
//! ```

pub mod auth;
pub mod cache;
pub mod error;
pub mod google;
pub mod manager;
pub mod memory;
pub mod oauth;
pub mod session;
pub mod store;
pub mod token;
pub mod user;

// Re-export main types at crate root
pub use auth::AuthenticatedUser;
pub use cache::{Cached, TaggedCache};
pub use error::SessionError;
pub use google::GoogleConfig;
pub use manager::SessionManager;
pub use memory::MemoryStore;
pub use oauth::{
    IdentityProvider, LoginInitiation, ProviderProfile, ProviderTokens, begin_login,
    states_match,
};
pub use session::{Session, SessionId};
pub use store::{SessionStore, UserStore};
pub use token::{SessionToken, generate_session_token};
pub use user::User;
