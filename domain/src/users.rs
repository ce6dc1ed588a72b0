//! Users and web-service tokens.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    /// Site administrators pass every capability check.
    #[serde(default)]
    pub siteadmin: bool,
}

impl User {
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

pub trait UserDirectory: Send + Sync {
    fn user(&self, id: i64) -> Option<User>;
}

/// Resolves a web-service token to the user it was issued to.
pub trait TokenStore: Send + Sync {
    fn user_for_token(&self, token: &str) -> Option<i64>;
}
