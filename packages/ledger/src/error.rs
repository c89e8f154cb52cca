//! Error types shared by the cache, the views and the remote collaborators.

use thiserror::Error;

/// A non-success outcome from a remote collaborator.
///
/// Both the Ledger API and the Identity API report failures in this shape so that
/// callers never branch on the transport that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("{context} (status {status})")]
    Status { status: u16, context: String },

    #[error("Could not reach the server: {0}")]
    Transport(String),

    #[error("Unexpected response from the server: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(status: u16, context: impl Into<String>) -> Self {
        Self::Status {
            status,
            context: context.into(),
        }
    }
}

/// Input rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Enter a valid amount")]
    InvalidAmount(String),

    #[error("Enter a valid monthly income")]
    InvalidIncome(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid date: {0}")]
    UnparseableDate(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("No record with id {0}")]
    UnknownRecord(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
