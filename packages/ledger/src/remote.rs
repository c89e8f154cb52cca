//! The remote collaborator that owns the authoritative copy of every record.

use std::future::Future;

use crate::error::RemoteError;
use crate::models::{ExpenseRecord, RecordDraft};

/// Async access to the Ledger API.
///
/// Records are scoped by owner. Implementations report any non-success response
/// as a [`RemoteError`] and never retry on their own.
pub trait LedgerApi {
    /// Every record owned by `owner_id`.
    fn list(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = Result<Vec<ExpenseRecord>, RemoteError>>;

    /// Every record regardless of owner. Administrative views only.
    fn list_all(&self) -> impl Future<Output = Result<Vec<ExpenseRecord>, RemoteError>>;

    /// Create a record; the returned record carries the assigned id.
    fn create(
        &self,
        draft: &RecordDraft,
    ) -> impl Future<Output = Result<ExpenseRecord, RemoteError>>;

    /// Replace the record with the same id.
    fn update(
        &self,
        record: &ExpenseRecord,
    ) -> impl Future<Output = Result<ExpenseRecord, RemoteError>>;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), RemoteError>>;
}
