//! Users of the pipeline

use serde::{Deserialize, Serialize};

use crate::entity::UserId;

/// Role a user holds within the sales organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full administrative access
    Admin,
    /// Manages a team of salespeople
    Manager,
    /// Owns and works deals
    Salesperson,
}

/// A user who owns deals, contacts and tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Role within the organization
    pub role: UserRole,
    /// Avatar URL, if one is set
    pub avatar: Option<String>,
}

impl User {
    /// Create a user with a generated ID
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            role,
            avatar: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_labels() {
        assert_eq!(
            serde_json::to_string(&UserRole::Salesperson).unwrap(),
            "\"salesperson\""
        );
        let role: UserRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, UserRole::Admin);
    }

    #[test]
    fn test_new_user() {
        let user = User::new("Emily Davis", "emily@example.com", UserRole::Manager);
        assert_eq!(user.role, UserRole::Manager);
        assert!(user.avatar.is_none());
    }
}
