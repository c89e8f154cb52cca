//! # Domain models for ledger records and identities
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`ExpenseRecord`] | One dated line item as stored remotely, including its server-assigned `id` and derived `month` tag. |
//! | [`RecordDraft`] | The body submitted when creating a record: everything except `id`. |
//! | [`NewExpense`] | What the user supplies for a new record; `month` and owner are stamped by the cache. |
//! | [`ExpenseForm`] | Raw form text, validated into a [`NewExpense`] before anything is sent. |
//! | [`Identity`] | A standard user or an administrator. |
//!
//! The serde representation uses camelCase field names. Tolerance for other
//! spellings lives at the HTTP boundary in the `api` crate, not here.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single expense owned by an identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    /// Server-assigned, opaque.
    pub id: String,
    pub description: String,
    pub category: String,
    pub amount: f64,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Canonical month tag (`"1"`..`"12"`), derived from `date`.
    pub month: String,
    pub owner_id: String,
}

/// An [`ExpenseRecord`] that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub date: String,
    pub month: String,
    pub owner_id: String,
}

impl RecordDraft {
    /// Attach an id, producing the stored form.
    pub fn with_id(self, id: impl Into<String>) -> ExpenseRecord {
        ExpenseRecord {
            id: id.into(),
            description: self.description,
            category: self.category,
            amount: self.amount,
            date: self.date,
            month: self.month,
            owner_id: self.owner_id,
        }
    }
}

/// User-supplied fields for a new expense.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewExpense {
    pub description: String,
    pub category: String,
    pub amount: f64,
    /// May be blank, in which case the selected month is used.
    pub date: String,
}

impl NewExpense {
    /// The create body for `owner_id`, filed under an already resolved `month`.
    pub fn draft(&self, month: String, owner_id: &str) -> RecordDraft {
        RecordDraft {
            description: self.description.clone(),
            category: self.category.clone(),
            amount: self.amount,
            date: self.date.clone(),
            month,
            owner_id: owner_id.to_string(),
        }
    }
}

/// Expense fields exactly as typed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpenseForm {
    pub description: String,
    pub category: String,
    pub amount: String,
    pub date: String,
}

impl ExpenseForm {
    /// Validate the form. Only the amount is checked; it must be a finite number.
    pub fn parse(&self) -> Result<NewExpense, ValidationError> {
        let amount = parse_number(&self.amount)
            .ok_or_else(|| ValidationError::InvalidAmount(self.amount.clone()))?;
        Ok(NewExpense {
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            amount,
            date: self.date.trim().to_string(),
        })
    }
}

/// Parse a decimal typed either as `45.50` or `45,50`.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "user", alias = "standard")]
    Standard,
    #[serde(rename = "admin")]
    Admin,
}

/// An authenticated user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Zero means the income is unknown. Always zero for administrators.
    #[serde(default)]
    pub monthly_income: f64,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Display name, falling back to the email when no name was given.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_form_parse() {
        let form = ExpenseForm {
            description: " Lunch ".to_string(),
            category: "Food".to_string(),
            amount: "45,50".to_string(),
            date: "2024-06-10".to_string(),
        };
        let expense = form.parse().unwrap();
        assert_eq!(expense.description, "Lunch");
        assert_eq!(expense.amount, 45.5);
    }

    #[test]
    fn test_expense_form_rejects_non_numeric_amount() {
        let form = ExpenseForm {
            amount: "forty".to_string(),
            ..Default::default()
        };
        assert_eq!(
            form.parse(),
            Err(ValidationError::InvalidAmount("forty".to_string()))
        );
        let form = ExpenseForm {
            amount: "NaN".to_string(),
            ..Default::default()
        };
        assert!(form.parse().is_err());
    }

    #[test]
    fn test_record_json_shape() {
        let record = RecordDraft {
            description: "Bus".to_string(),
            category: "Transport".to_string(),
            amount: 4.4,
            date: "2024-02-01".to_string(),
            month: "2".to_string(),
            owner_id: "2".to_string(),
        }
        .with_id("a1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ownerId"], "2");
        assert_eq!(json["month"], "2");
        assert_eq!(record.id, "a1");
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Standard).unwrap(), "\"user\"");
        let role: Role = serde_json::from_str("\"standard\"").unwrap();
        assert_eq!(role, Role::Standard);
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_identity_label() {
        let identity = Identity {
            id: "2".to_string(),
            display_name: "".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::Standard,
            monthly_income: 0.0,
        };
        assert_eq!(identity.label(), "ana@example.com");
        assert!(!identity.is_admin());
    }
}
