//! # Ledger cache: the local mirror of one identity's records
//!
//! [`LedgerCache`] holds the records of the currently established identity and is
//! the single source every view is derived from. All writes are
//! **confirm-then-apply**: the remote [`LedgerApi`] call must succeed before the
//! local set changes, so a failed call leaves the cache exactly as it was and no
//! client-side id is ever exposed.
//!
//! ## Loading
//!
//! A load is split into [`begin_load`](LedgerCache::begin_load), the remote fetch,
//! and [`finish_load`](LedgerCache::finish_load). `begin_load` hands out a
//! [`LoadTicket`] stamped with the cache generation; [`clear`](LedgerCache::clear)
//! and identity switches bump the generation, so a fetch that resolves after its
//! identity has gone is recognised as stale and discarded without touching state
//! or surfacing an error. [`load`](LedgerCache::load) runs the three steps in one
//! call.
//!
//! Loads replace the set wholesale. Administrators and absent identities get an
//! empty set without a remote call.
//!
//! ## Errors
//!
//! Every failed operation stores its message in [`error`](LedgerCache::error) and
//! returns it; the next operation clears it.

use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult, RemoteError};
use crate::models::{ExpenseRecord, Identity, NewExpense};
use crate::month::resolve_month_for_mutation;
use crate::remote::LedgerApi;

/// Proof that a load was started for a given owner and generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    owner_id: String,
}

impl LoadTicket {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// What [`LedgerCache::finish_load`] did with a fetch result.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The set was replaced; carries the new record count.
    Applied(usize),
    /// The owning identity changed while the fetch was in flight.
    Stale,
    /// The fetch failed; the previous set is still installed.
    Failed(LedgerError),
}

pub struct LedgerCache<A: LedgerApi> {
    api: A,
    records: Vec<ExpenseRecord>,
    owner_id: Option<String>,
    generation: u64,
    busy: bool,
    editing: Option<String>,
    error: Option<String>,
}

impl<A: LedgerApi> LedgerCache<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            records: Vec::new(),
            owner_id: None,
            generation: 0,
            busy: false,
            editing: None,
            error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    /// Owner of the installed set, if any.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// True while a load is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The last error message, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Id of the record a consumer is currently editing.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&ExpenseRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Mark `id` as being edited. Returns the record, or `None` if it is unknown.
    pub fn begin_edit(&mut self, id: &str) -> Option<&ExpenseRecord> {
        let record = self.records.iter().find(|r| r.id == id)?;
        self.editing = Some(record.id.clone());
        Some(record)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Drop everything and invalidate loads in flight.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.records.clear();
        self.owner_id = None;
        self.busy = false;
        self.editing = None;
        self.error = None;
    }

    /// Prepare a load for `identity`.
    ///
    /// Returns `None` when there is nothing to fetch: the identity is absent or an
    /// administrator, and the set has been cleared. Switching to a different owner
    /// clears the previous owner's records before the fetch starts.
    pub fn begin_load(&mut self, identity: Option<&Identity>) -> Option<LoadTicket> {
        let Some(identity) = identity.filter(|i| !i.is_admin()) else {
            self.clear();
            return None;
        };
        if self.owner_id.as_deref() != Some(identity.id.as_str()) {
            self.clear();
            self.owner_id = Some(identity.id.clone());
        }
        self.generation += 1;
        self.busy = true;
        self.error = None;
        debug!(owner = %identity.id, generation = self.generation, "ledger load started");
        Some(LoadTicket {
            generation: self.generation,
            owner_id: identity.id.clone(),
        })
    }

    /// Install a fetch result, unless `ticket` has been superseded.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<ExpenseRecord>, RemoteError>,
    ) -> LoadOutcome {
        let current = ticket.generation == self.generation
            && self.owner_id.as_deref() == Some(ticket.owner_id.as_str());
        if !current {
            debug!(owner = %ticket.owner_id, "discarding stale ledger load");
            return LoadOutcome::Stale;
        }
        self.busy = false;
        match result {
            Ok(records) => {
                let records = dedup_by_id(records);
                info!(owner = %ticket.owner_id, count = records.len(), "ledger loaded");
                let count = records.len();
                self.records = records;
                if self
                    .editing
                    .as_deref()
                    .is_some_and(|id| !self.records.iter().any(|r| r.id == id))
                {
                    self.editing = None;
                }
                LoadOutcome::Applied(count)
            }
            Err(e) => {
                warn!(owner = %ticket.owner_id, error = %e, "ledger load failed");
                let err = LedgerError::from(e);
                self.error = Some(err.to_string());
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Fetch and install the full record set of `identity`.
    pub async fn load(&mut self, identity: Option<&Identity>) -> LedgerResult<()> {
        let Some(ticket) = self.begin_load(identity) else {
            return Ok(());
        };
        let result = self.api.list(ticket.owner_id()).await;
        match self.finish_load(ticket, result) {
            LoadOutcome::Failed(e) => Err(e),
            LoadOutcome::Applied(_) | LoadOutcome::Stale => Ok(()),
        }
    }

    /// Create a record for `owner_id` and append the server's copy.
    ///
    /// The new record is kept even when it falls outside the month being viewed;
    /// filtering is the views' business.
    pub async fn create(
        &mut self,
        input: &NewExpense,
        fallback_month: &str,
        owner_id: &str,
    ) -> LedgerResult<&ExpenseRecord> {
        self.error = None;
        let month = self.track(resolve_month_for_mutation(&input.date, fallback_month))?;
        let result = self
            .api
            .create(&input.draft(month, owner_id))
            .await
            .map_err(LedgerError::from);
        let created = self.track(result)?;
        info!(id = %created.id, owner = %owner_id, "expense created");
        let index = self.upsert(created);
        Ok(&self.records[index])
    }

    /// Submit a full replacement for `record` and swap in the server's copy.
    ///
    /// The month is recomputed from the date; a blank date keeps the record's
    /// current month. A successful update ends any edit in progress.
    pub async fn update(&mut self, mut record: ExpenseRecord) -> LedgerResult<&ExpenseRecord> {
        self.error = None;
        record.month = self.track(resolve_month_for_mutation(&record.date, &record.month))?;
        let result = self.api.update(&record).await.map_err(LedgerError::from);
        let mut updated = self.track(result)?;
        // The record keeps the id it was submitted under.
        updated.id = record.id;
        info!(id = %updated.id, "expense updated");
        self.editing = None;
        let index = self.upsert(updated);
        Ok(&self.records[index])
    }

    /// Delete `id` remotely, then locally. Clears the edit pointer if it was `id`.
    pub async fn remove(&mut self, id: &str) -> LedgerResult<()> {
        self.error = None;
        let result = self.api.delete(id).await.map_err(LedgerError::from);
        self.track(result)?;
        self.records.retain(|r| r.id != id);
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        info!(id = %id, "expense deleted");
        Ok(())
    }

    /// Replace the record with the same id, or append it. Returns its index.
    fn upsert(&mut self, record: ExpenseRecord) -> usize {
        match self.records.iter().position(|r| r.id == record.id) {
            Some(index) => {
                self.records[index] = record;
                index
            }
            None => {
                self.records.push(record);
                self.records.len() - 1
            }
        }
    }

    fn track<T>(&mut self, result: LedgerResult<T>) -> LedgerResult<T> {
        if let Err(e) = &result {
            warn!(error = %e, "ledger operation failed");
            self.error = Some(e.to_string());
        }
        result
    }
}

/// Keep the last record seen for each id.
fn dedup_by_id(records: Vec<ExpenseRecord>) -> Vec<ExpenseRecord> {
    let mut out: Vec<ExpenseRecord> = Vec::with_capacity(records.len());
    for record in records {
        match out.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => *slot = record,
            None => out.push(record),
        }
    }
    out
}
