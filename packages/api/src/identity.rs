//! The Identity API collaborator and its in-memory implementation.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use ledger::{Identity, RemoteError};

use crate::auth::Profile;

/// Async access to the Identity API.
pub trait IdentityApi {
    /// Identities whose email and password both match. Zero or one expected.
    fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Vec<Identity>, RemoteError>>;

    /// Create an identity from a validated profile.
    fn create(&self, profile: &Profile) -> impl Future<Output = Result<Identity, RemoteError>>;

    fn list(&self) -> impl Future<Output = Result<Vec<Identity>, RemoteError>>;

    /// Replace an identity. The password is left alone when `password` is `None`.
    fn update(
        &self,
        identity: &Identity,
        password: Option<&str>,
    ) -> impl Future<Output = Result<Identity, RemoteError>>;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), RemoteError>>;
}

/// In-memory Identity API for testing. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct MemoryIdentities {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: Vec<(Identity, String)>,
    next_id: u64,
    fail_next: Option<u16>,
    calls: usize,
}

impl MemoryIdentities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an account directly, bypassing the API.
    pub fn insert(&self, identity: Identity, password: &str) {
        let mut inner = self.lock();
        if let Ok(id) = identity.id.parse::<u64>() {
            inner.next_id = inner.next_id.max(id);
        }
        inner.accounts.push((identity, password.to_string()));
    }

    pub fn fail_next(&self, status: u16) {
        self.lock().fail_next = Some(status);
    }

    pub fn calls(&self) -> usize {
        self.lock().calls
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

impl IdentityApi for MemoryIdentities {
    async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Vec<Identity>, RemoteError> {
        let inner = self.begin("Could not verify credentials")?;
        Ok(inner
            .accounts
            .iter()
            .filter(|(identity, secret)| identity.email == email && secret == password)
            .map(|(identity, _)| identity.clone())
            .collect())
    }

    async fn create(&self, profile: &Profile) -> Result<Identity, RemoteError> {
        let mut inner = self.begin("Could not create the account")?;
        inner.next_id += 1;
        let identity = Identity {
            id: inner.next_id.to_string(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            role: profile.role,
            monthly_income: profile.monthly_income,
        };
        inner
            .accounts
            .push((identity.clone(), profile.password.clone()));
        Ok(identity)
    }

    async fn list(&self) -> Result<Vec<Identity>, RemoteError> {
        let inner = self.begin("Could not load users")?;
        Ok(inner.accounts.iter().map(|(i, _)| i.clone()).collect())
    }

    async fn update(
        &self,
        identity: &Identity,
        password: Option<&str>,
    ) -> Result<Identity, RemoteError> {
        let mut inner = self.begin("Could not update the user")?;
        let Some(slot) = inner.accounts.iter_mut().find(|(i, _)| i.id == identity.id) else {
            return Err(RemoteError::status(404, "Could not update the user"));
        };
        slot.0 = identity.clone();
        if let Some(password) = password {
            slot.1 = password.to_string();
        }
        Ok(identity.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.begin("Could not delete the user")?;
        let before = inner.accounts.len();
        inner.accounts.retain(|(i, _)| i.id != id);
        if inner.accounts.len() == before {
            return Err(RemoteError::status(404, "Could not delete the user"));
        }
        Ok(())
    }
}
