//! # Wire formats for the Ledger and Identity APIs
//!
//! The remote collaborators are loose about their JSON: ids arrive as numbers or
//! strings, the monthly income has two spellings (`monthlyIncome`, `rendaMensal`)
//! and may be a numeric string, and older record documents use the original field
//! names (`descricao`, `categoria`, `valor`, `data`, `mes`, `userId`).
//!
//! Incoming documents are deserialized into the permissive `Wire*` structs below
//! and converted exactly once, by [`identity_from_wire`] and [`record_from_wire`].
//! Nothing past this module sees which spelling arrived. Outgoing bodies always
//! use the canonical camelCase names.

use ledger::models::parse_number;
use ledger::month::{canonical_month, month_number};
use ledger::{ExpenseRecord, Identity, Role};
use serde::{Deserialize, Serialize};

/// A JSON value that may be a number or a string.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Loose {
    fn into_text(self) -> String {
        match self {
            Loose::Int(v) => v.to_string(),
            Loose::Float(v) => v.to_string(),
            Loose::Text(v) => v,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Loose::Int(v) => Some(*v as f64),
            Loose::Float(v) => Some(*v).filter(|v| v.is_finite()),
            Loose::Text(v) => parse_number(v),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIdentity {
    pub id: Loose,
    #[serde(default, alias = "nome", alias = "name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<Loose>,
    #[serde(default)]
    pub renda_mensal: Option<Loose>,
}

/// The single mapping from an Identity API document to an [`Identity`].
pub fn identity_from_wire(wire: WireIdentity) -> Identity {
    let role = match wire.role.as_deref() {
        Some("admin") => Role::Admin,
        _ => Role::Standard,
    };
    let monthly_income = match role {
        Role::Admin => 0.0,
        Role::Standard => wire
            .monthly_income
            .or(wire.renda_mensal)
            .and_then(|v| v.as_number())
            .unwrap_or(0.0)
            .max(0.0),
    };
    Identity {
        id: wire.id.into_text(),
        display_name: wire.display_name.unwrap_or_default(),
        email: wire.email.unwrap_or_default(),
        role,
        monthly_income,
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub id: Loose,
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
    #[serde(default, alias = "categoria")]
    pub category: Option<String>,
    #[serde(default, alias = "valor")]
    pub amount: Option<Loose>,
    #[serde(default, alias = "data")]
    pub date: Option<String>,
    #[serde(default, alias = "mes")]
    pub month: Option<Loose>,
    #[serde(default, alias = "userId")]
    pub owner_id: Option<Loose>,
}

/// The single mapping from a Ledger API document to an [`ExpenseRecord`].
///
/// Month tags are canonicalised (`"06"` becomes `"6"`). A missing or
/// unrecognised tag is derived from the date when the date parses.
pub fn record_from_wire(wire: WireRecord) -> ExpenseRecord {
    let date = wire.date.unwrap_or_default();
    let month = wire
        .month
        .map(Loose::into_text)
        .and_then(|tag| month_number(&tag))
        .map(|m| m.to_string())
        .or_else(|| canonical_month(&date).ok())
        .unwrap_or_default();
    ExpenseRecord {
        id: wire.id.into_text(),
        description: wire.description.unwrap_or_default(),
        category: wire.category.unwrap_or_default(),
        amount: wire.amount.and_then(|v| v.as_number()).unwrap_or(0.0),
        date,
        month,
        owner_id: wire.owner_id.map(Loose::into_text).unwrap_or_default(),
    }
}

/// Body of `POST /identities` and `PUT /identities/{id}`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub display_name: &'a str,
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    pub role: Role,
    pub monthly_income: f64,
}
