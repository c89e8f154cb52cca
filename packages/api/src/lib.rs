//! # API crate: remote collaborators, sessions and the dashboard
//!
//! Everything in the ledgerbook client that talks to the outside world: the HTTP
//! Ledger and Identity APIs, the persisted session, and [`Dashboard`], which ties
//! a session to a [`ledger::LedgerCache`] for a front end to drive.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Credentials and registration forms, [`SessionLifecycle`] with sliding expiration, durable and mirrored session storage |
//! | [`dashboard`] | [`Dashboard`]: session + ledger cache + selection, with the single visible error message |
//! | [`error`] | [`AuthError`] and [`AppError`] |
//! | [`http`] | [`HttpApi`], the reqwest client implementing both collaborator traits |
//! | [`identity`] | The [`IdentityApi`] trait and the in-memory [`MemoryIdentities`] |
//! | [`settings`] | [`Settings`] layered from defaults, `ledgerbook.toml` and `LEDGERBOOK_*` variables |
//! | [`wire`] | Normalisation of the collaborators' loosely typed JSON |
//!
//! ## Typical wiring
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use api::{Dashboard, FileSessionStore, HttpApi, SessionLifecycle, Settings};
//!
//! let settings = Settings::new()?;
//! let http = HttpApi::new(&settings.api)?;
//! let store = FileSessionStore::new(settings.data_dir());
//! let session = SessionLifecycle::new(http.clone(), store, settings.ttl());
//! let mut dashboard = Dashboard::new(session, http, settings.ledger_config());
//! dashboard.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod identity;
pub mod settings;
pub mod wire;

pub use auth::{
    Credentials, FileSessionStore, IdentityChanges, MemorySessionStore, Registration,
    SessionLifecycle, SessionStore,
};
pub use dashboard::Dashboard;
pub use error::{AppError, AppResult, AuthError, AuthResult};
pub use http::HttpApi;
pub use identity::{IdentityApi, MemoryIdentities};
pub use settings::Settings;
