//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, Role, UserId, Username};

/// A marketplace user (domain type).
///
/// The password hash is deliberately not part of this type; repository
/// methods that need it return it alongside the user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (unique).
    pub email: Email,
    /// User's username (unique).
    pub username: Username,
    /// Role governing authorization decisions.
    pub role: Role,
    /// Display name.
    pub full_name: Option<String>,
    /// Shipping address.
    pub address: Option<String>,
    /// Payment reference.
    pub card_number: Option<String>,
    /// Support contact shown on seller profiles.
    pub support_email: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Profile fields are exposed only for buyer/seller accounts; admin
    /// profiles stay blank in API responses.
    #[must_use]
    pub fn exposes_profile(&self) -> bool {
        matches!(self.role, Role::Buyer | Role::Seller)
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: Username,
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub address: String,
    pub card_number: String,
}

/// A partial update to a user record.
///
/// Only fields that are `Some` are applied; everything else is preserved.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<Email>,
    pub username: Option<Username>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub card_number: Option<String>,
    pub support_email: Option<String>,
}

/// The profile view a user gets of their own account.
#[derive(Debug, Serialize)]
pub struct OwnProfile {
    pub id: UserId,
    pub email: Email,
    pub username: Username,
    pub role: Role,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub card_number: Option<String>,
    pub support_email: Option<String>,
}

impl From<&User> for OwnProfile {
    fn from(user: &User) -> Self {
        let visible = user.exposes_profile();
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            full_name: visible.then(|| user.full_name.clone()).flatten(),
            address: visible.then(|| user.address.clone()).flatten(),
            card_number: visible.then(|| user.card_number.clone()).flatten(),
            support_email: user.support_email.clone(),
        }
    }
}

/// The profile view other authenticated users get.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub username: Username,
    pub full_name: Option<String>,
    pub role: Role,
    pub support_email: Option<String>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            support_email: user.support_email.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_user(role: Role) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("alice@example.com").unwrap(),
            username: Username::parse("alice").unwrap(),
            role,
            full_name: Some("Alice Example".to_owned()),
            address: Some("1 Main St".to_owned()),
            card_number: Some("4111".to_owned()),
            support_email: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_profile_fields_are_hidden() {
        let own: OwnProfile = (&sample_user(Role::Admin)).into();
        assert!(own.full_name.is_none());
        assert!(own.address.is_none());
        assert!(own.card_number.is_none());
    }

    #[test]
    fn buyer_profile_fields_are_visible() {
        let own: OwnProfile = (&sample_user(Role::Buyer)).into();
        assert_eq!(own.full_name.as_deref(), Some("Alice Example"));
    }
}
