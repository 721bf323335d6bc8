//! User model
//!
//! Shoppers and administrators share one table. Shipping details live on
//! the user row and are edited through the "details" endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Email address, stored lowercased
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub age: Option<i64>,
    #[serde(flatten)]
    pub details: UserDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user that has not been stored yet.
    ///
    /// The password must already be hashed with `services::password::hash_password`.
    pub fn new(name: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            email: email.trim().to_lowercase(),
            password_hash,
            role,
            age: None,
            details: UserDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether this user may read or edit the account identified by `email`
    pub fn can_access_email(&self, email: &str) -> bool {
        self.is_admin() || self.email.eq_ignore_ascii_case(email.trim())
    }
}

/// Shipping/contact details attached to a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
    pub phone_number: String,
}

impl UserDetails {
    /// All fields present and not blank
    pub fn is_complete(&self) -> bool {
        [
            &self.full_name,
            &self.address,
            &self.city,
            &self.state,
            &self.country,
            &self.zip_code,
            &self.phone_number,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Partial update of the account fields an admin or the owner may change
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
}

/// Partial update of shipping details; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDetailsInput {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub phone_number: Option<String>,
}

impl UpdateUserDetailsInput {
    /// Apply the supplied fields onto existing details
    pub fn apply_to(self, details: &mut UserDetails) {
        let fields = [
            (self.full_name, &mut details.full_name),
            (self.address, &mut details.address),
            (self.city, &mut details.city),
            (self.state, &mut details.state),
            (self.country, &mut details.country),
            (self.zip_code, &mut details.zip_code),
            (self.phone_number, &mut details.phone_number),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value.trim().to_string();
            }
        }
    }
}
