//! # Ledger crate: expense records, derived views and the local cache
//!
//! Everything in this crate is transport-agnostic. Remote persistence goes through
//! the [`LedgerApi`] trait; the `api` crate provides the HTTP implementation and this
//! crate ships [`MemoryLedger`] for tests and offline use.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `ExpenseRecord`, `NewExpense`, `ExpenseForm`, `Identity`, `Role` |
//! | [`month`] | Canonical month tags derived from calendar dates, month labels |
//! | [`view`] | Pure projections: filters, pagination, totals, income status, annual summary |
//! | [`cache`] | `LedgerCache`, the confirm-then-apply mirror of one identity's records |
//! | [`remote`] | The `LedgerApi` collaborator trait |
//! | [`config`] | `ledgerbook.toml` view defaults |
//! | [`error`] | `LedgerError`, `RemoteError`, `ValidationError` |

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod month;
pub mod remote;
pub mod view;

mod memory;
pub use memory::MemoryLedger;

pub use cache::{LedgerCache, LoadOutcome, LoadTicket};
pub use config::LedgerConfig;
pub use error::{LedgerError, RemoteError, ValidationError};
pub use models::{ExpenseForm, ExpenseRecord, Identity, NewExpense, Role};
pub use month::{canonical_month, resolve_month_for_mutation};
pub use remote::LedgerApi;
pub use view::{AnnualSummary, IncomeStatus, MonthView, SelectionState};
