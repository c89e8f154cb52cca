//! Error types for the session layer and the dashboard.

use std::io;

use ledger::{LedgerError, RemoteError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Could not create the account: {0}")]
    CreationError(RemoteError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The durable session record is corrupt or expired. The session has been cleared.
    #[error("Session expired, please sign in again")]
    MalformedSession(String),

    #[error("Session storage error: {0}")]
    Storage(#[from] io::Error),
}

/// Everything the dashboard can report. `Display` is the visible error message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Sign in to continue")]
    NotSignedIn,

    #[error("Administrator access required")]
    AdminOnly,

    #[error("Administrators do not keep a personal ledger")]
    NoPersonalLedger,

    #[error("No user with id {0}")]
    UnknownIdentity(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Ledger(LedgerError::Validation(e))
    }
}

impl From<RemoteError> for AppError {
    fn from(e: RemoteError) -> Self {
        AppError::Ledger(LedgerError::Remote(e))
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
pub type AppResult<T> = Result<T, AppError>;
