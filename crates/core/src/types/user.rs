//! Signed-in customer record.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserId;

/// A customer account as returned by the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

impl User {
    /// First word of the name, or the email's local part when the name is blank.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.name
            .split_whitespace()
            .next()
            .unwrap_or_else(|| self.email.local_part())
    }
}
