//! User domain entity and related types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    ACCOUNT_ACTIVE, ACCOUNT_BLOCKED, ACCOUNT_INACTIVE, ROLE_ADMIN, ROLE_RECEIVER, ROLE_SENDER,
};
use crate::error::DomainError;

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Sender,
    Receiver,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => ROLE_ADMIN,
            UserRole::Sender => ROLE_SENDER,
            UserRole::Receiver => ROLE_RECEIVER,
        }
    }

    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Whether a visitor may pick this role at registration.
    pub fn is_self_assignable(&self) -> bool {
        !self.is_admin()
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            ROLE_ADMIN => Ok(UserRole::Admin),
            ROLE_SENDER => Ok(UserRole::Sender),
            ROLE_RECEIVER => Ok(UserRole::Receiver),
            other => Err(DomainError::validation(format!("Unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account state, managed by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum ActiveState {
    #[default]
    Active,
    Inactive,
    Blocked,
}

impl ActiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveState::Active => ACCOUNT_ACTIVE,
            ActiveState::Inactive => ACCOUNT_INACTIVE,
            ActiveState::Blocked => ACCOUNT_BLOCKED,
        }
    }
}

impl FromStr for ActiveState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            ACCOUNT_ACTIVE => Ok(ActiveState::Active),
            ACCOUNT_INACTIVE => Ok(ActiveState::Inactive),
            ACCOUNT_BLOCKED => Ok(ActiveState::Blocked),
            other => Err(DomainError::validation(format!(
                "Unknown account state '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ActiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub active_state: ActiveState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = live, Some = deleted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Check if user is soft deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_blocked(&self) -> bool {
        self.active_state == ActiveState::Blocked
    }

    /// Deleted or blocked accounts may not act on parcels.
    pub fn is_restricted(&self) -> bool {
        self.is_deleted() || self.is_blocked()
    }

    /// Login is refused for anything but an active account.
    pub fn can_sign_in(&self) -> bool {
        !self.is_deleted() && self.active_state == ActiveState::Active
    }
}

/// Data needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address
    pub email: String,
    /// User display name
    pub name: String,
    pub role: UserRole,
    pub active_state: ActiveState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            active_state: user.active_state,
            phone: user.phone.clone(),
            address: user.address.clone(),
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse::from(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, state: ActiveState) -> User {
        User {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            password_hash: String::new(),
            name: "Someone".to_string(),
            role,
            active_state: state,
            phone: None,
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [UserRole::Admin, UserRole::Sender, UserRole::Receiver] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert_eq!("sender".parse::<UserRole>().unwrap(), UserRole::Sender);
        assert!("courier".parse::<UserRole>().is_err());
    }

    #[test]
    fn admin_is_not_self_assignable() {
        assert!(!UserRole::Admin.is_self_assignable());
        assert!(UserRole::Receiver.is_self_assignable());
    }

    #[test]
    fn blocked_and_deleted_accounts_are_restricted() {
        assert!(!user(UserRole::Sender, ActiveState::Active).is_restricted());
        assert!(user(UserRole::Sender, ActiveState::Blocked).is_restricted());

        let mut deleted = user(UserRole::Sender, ActiveState::Active);
        deleted.deleted_at = Some(Utc::now());
        assert!(deleted.is_restricted());
        assert!(!deleted.can_sign_in());
    }

    #[test]
    fn inactive_account_cannot_sign_in() {
        assert!(!user(UserRole::Receiver, ActiveState::Inactive).can_sign_in());
    }

    #[test]
    fn role_serializes_uppercase() {
        let json = serde_json::to_string(&UserRole::Receiver).unwrap();
        assert_eq!(json, "\"RECEIVER\"");
    }
}
