//! User domain type.
//!
//! Users are identified externally by their Google subject (`sub` claim) and
//! internally by a [`UserId`]. The session layer only references users; it
//! creates them on first sign-in and otherwise reads them through the
//! session join.

use chrono::{DateTime, Utc};
use pushbox_core::UserId;
use serde::{Deserialize, Serialize};

/// A registered player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID.
    id: UserId,
    /// Google subject claim, unique per Google account.
    google_id: String,
    /// Display name from the Google profile.
    name: String,
    /// Profile picture URL, if the account has one.
    picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user for a Google account signing in for the first time.
    #[must_use]
    pub fn new(google_id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            google_id,
            name,
            picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    pub fn with_all_fields(
        id: UserId,
        google_id: String,
        name: String,
        picture: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            google_id,
            name,
            picture,
            created_at,
            updated_at,
        }
    }

    /// Sets the profile picture.
    #[must_use]
    pub fn with_picture(mut self, picture: Option<String>) -> Self {
        self.picture = picture;
        self
    }

    /// Returns the user's internal ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the Google subject claim.
    #[must_use]
    pub fn google_id(&self) -> &str {
        &self.google_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the profile picture URL, if any.
    #[must_use]
    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
