use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RemoteError;
use crate::models::{ExpenseRecord, RecordDraft};
use crate::remote::LedgerApi;

/// In-memory Ledger API for testing and offline use.
///
/// Clones share the same backing state, so a test can keep a handle after
/// moving one into a [`crate::LedgerCache`].
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<ExpenseRecord>,
    next_id: u64,
    fail_next: Option<u16>,
    calls: usize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `records` already stored.
    pub fn with_records(records: Vec<ExpenseRecord>) -> Self {
        let ledger = Self::new();
        {
            let mut inner = ledger.lock();
            inner.next_id = records.len() as u64;
            inner.records = records;
        }
        ledger
    }

    /// Make the next call answer with `status` instead of succeeding.
    pub fn fail_next(&self, status: u16) {
        self.lock().fail_next = Some(status);
    }

    /// Number of calls received so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// Snapshot of the stored records.
    pub fn records(&self) -> Vec<ExpenseRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, context: &str) -> Result<MutexGuard<'_, Inner>, RemoteError> {
        let mut inner = self.lock();
        inner.calls += 1;
        match inner.fail_next.take() {
            Some(status) => Err(RemoteError::status(status, context)),
            None => Ok(inner),
        }
    }
}

impl LedgerApi for MemoryLedger {
    async fn list(&self, owner_id: &str) -> Result<Vec<ExpenseRecord>, RemoteError> {
        let inner = self.begin("Could not load records")?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ExpenseRecord>, RemoteError> {
        let inner = self.begin("Could not load records")?;
        Ok(inner.records.clone())
    }

    async fn create(&self, draft: &RecordDraft) -> Result<ExpenseRecord, RemoteError> {
        let mut inner = self.begin("Could not add the expense")?;
        inner.next_id += 1;
        let record = draft.clone().with_id(format!("r{}", inner.next_id));
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, RemoteError> {
        let mut inner = self.begin("Could not update the expense")?;
        let Some(slot) = inner.records.iter_mut().find(|r| r.id == record.id) else {
            return Err(RemoteError::status(404, "Could not update the expense"));
        };
        *slot = record.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.begin("Could not delete the expense")?;
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        if inner.records.len() == before {
            return Err(RemoteError::status(404, "Could not delete the expense"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(owner: &str) -> RecordDraft {
        RecordDraft {
            description: "Coffee".to_string(),
            category: "Food".to_string(),
            amount: 3.5,
            date: "2024-05-02".to_string(),
            month: "5".to_string(),
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_distinct_ids() {
        let api = MemoryLedger::new();
        let a = api.create(&draft("1")).await.unwrap();
        let b = api.create(&draft("1")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(api.records().len(), 2);
    }

    #[tokio::test]
    async fn test_list_is_scoped_by_owner() {
        let api = MemoryLedger::new();
        api.create(&draft("1")).await.unwrap();
        api.create(&draft("2")).await.unwrap();
        assert_eq!(api.list("1").await.unwrap().len(), 1);
        assert_eq!(api.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let api = MemoryLedger::new();
        api.fail_next(500);
        assert!(matches!(
            api.list("1").await,
            Err(RemoteError::Status { status: 500, .. })
        ));
        assert!(api.list("1").await.is_ok());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let api = MemoryLedger::new();
        assert!(matches!(
            api.delete("missing").await,
            Err(RemoteError::Status { status: 404, .. })
        ));
    }
}
