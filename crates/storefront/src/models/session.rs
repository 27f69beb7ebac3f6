//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use serde::{Deserialize, Serialize};

use harbor_core::{User, UserId};

use crate::api::{AccessToken, AuthSession};

/// Session-stored user identity.
///
/// The user record as of sign-in plus the bearer token for authenticated
/// catalog API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user: User,
    pub token: AccessToken,
}

impl CurrentUser {
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.user.id
    }

    /// Same token, refreshed user record (after a profile edit).
    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        Self { user, ..self }
    }
}

impl From<AuthSession> for CurrentUser {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user,
            token: session.token,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for storing the catalog cart ID.
    pub const CART_ID: &str = "cart_id";
}
