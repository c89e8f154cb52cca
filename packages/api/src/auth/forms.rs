//! Sign-in and registration inputs.

use ledger::models::parse_number;
use ledger::{Identity, Role, ValidationError};

/// Fixed administrative login that never reaches the Identity API.
pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "1234";

/// Email and password as entered.
#[derive(Clone, Debug, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub(crate) fn is_admin_sentinel(&self) -> bool {
        self.email == ADMIN_LOGIN && self.password == ADMIN_PASSWORD
    }
}

/// The identity established by the administrative sentinel.
pub fn admin_identity() -> Identity {
    Identity {
        id: "0".to_string(),
        display_name: "Administrator".to_string(),
        email: "admin@local".to_string(),
        role: Role::Admin,
        monthly_income: 0.0,
    }
}

/// A validated registration, ready to be submitted.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub monthly_income: f64,
    /// Always [`Role::Standard`] for self-registration.
    pub role: Role,
}

impl Profile {
    /// The same profile with another role. Administrators carry no income.
    pub fn with_role(mut self, role: Role) -> Self {
        if role == Role::Admin {
            self.monthly_income = 0.0;
        }
        self.role = role;
        self
    }
}

/// Registration fields as typed, including the confirmation and textual income.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registration {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    /// Blank means unknown (zero).
    pub monthly_income: String,
}

impl Registration {
    pub fn validate(&self) -> Result<Profile, ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::Missing("Email"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Missing("Password"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        let monthly_income = parse_income(&self.monthly_income)?;
        Ok(Profile {
            display_name: self.display_name.trim().to_string(),
            email: email.to_string(),
            password: self.password.clone(),
            monthly_income,
            role: Role::Standard,
        })
    }
}

/// Blank is unknown (zero); anything else must be a non-negative number.
fn parse_income(text: &str) -> Result<f64, ValidationError> {
    if text.trim().is_empty() {
        return Ok(0.0);
    }
    parse_number(text)
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| ValidationError::InvalidIncome(text.to_string()))
}

/// Administrative edits to an existing identity. `None` keeps the field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdentityChanges {
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// A new password. The stored one is kept when `None`.
    pub password: Option<String>,
    pub monthly_income: Option<String>,
    pub role: Option<Role>,
}

impl IdentityChanges {
    pub fn apply(&self, mut identity: Identity) -> Result<Identity, ValidationError> {
        if let Some(name) = &self.display_name {
            identity.display_name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            let email = email.trim();
            if email.is_empty() {
                return Err(ValidationError::Missing("Email"));
            }
            identity.email = email.to_string();
        }
        if self.password.as_deref() == Some("") {
            return Err(ValidationError::Missing("Password"));
        }
        if let Some(income) = &self.monthly_income {
            identity.monthly_income = parse_income(income)?;
        }
        if let Some(role) = self.role {
            identity.role = role;
        }
        if identity.is_admin() {
            identity.monthly_income = 0.0;
        }
        Ok(identity)
    }
}
