// models/src/medical/user.rs
// The stored User carries the password hash; every read path goes through
// UserProfile or UserSummary, neither of which has a credential field.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{check_max_len, require_text, ValidationError, ValidationResult};
use crate::identifiers::new_id;
use crate::medical::role::Role;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_ADDRESS_LEN: usize = 200;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").expect("email pattern compiles")
});

/// Checks an address against the accepted email pattern.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

// --- DTO for New User Registration ---
// Holds the plaintext password only until it is hashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Accepted for compatibility with existing clients and ignored.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewUser {
    /// Validates the registration payload and returns it normalized
    /// (trimmed name, blank optionals dropped).
    pub fn validate(&self) -> ValidationResult<NewUser> {
        let name = require_text("name", &self.name)?;
        check_max_len("Name", &name, MAX_NAME_LEN)?;
        let email = self.email.trim().to_string();
        validate_email(&email)?;
        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
        }
        let phone = non_blank(&self.phone);
        if let Some(phone) = &phone {
            check_max_len("Phone number", phone, MAX_PHONE_LEN)?;
        }
        let address = non_blank(&self.address);
        if let Some(address) = &address {
            check_max_len("Address", address, MAX_ADDRESS_LEN)?;
        }
        Ok(NewUser {
            name,
            email,
            password: self.password.clone(),
            role: None,
            phone,
            address,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// --- Stored User Struct ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a stored user from a validated registration. The role is
    /// whatever the caller of this function decides, never the `role` field
    /// of the payload.
    pub fn from_new_user(new_user: NewUser, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        User {
            id: new_id(),
            name: new_user.name,
            email: new_user.email,
            password_hash,
            role,
            phone: new_user.phone,
            address: new_user.address,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}

/// Public view of a user, returned by auth and user endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            phone: user.phone.clone(),
            address: user.address.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Contact fields embedded in expanded doctor and appointment views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Login {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Login {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::Required("email and password"));
        }
        validate_email(self.email.trim())
    }
}
