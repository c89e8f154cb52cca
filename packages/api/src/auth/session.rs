//! # Session lifecycle
//!
//! [`SessionLifecycle`] owns the signed-in identity and its token. It is the
//! only writer of the session slots in a [`SessionStore`] and is handed to
//! every consumer explicitly.
//!
//! ```text
//! NoSession ──login / register / restore──▶ ActiveSession
//! ActiveSession ──logout / expiry detected──▶ NoSession
//! ```
//!
//! ## Sliding expiration
//!
//! `expires_at` moves to `now + ttl` on every renewal. Renewal happens right
//! after a session is established, on a periodic timer every `ttl / 2`, and
//! when the client regains focus while visible. Every renewal rewrites the
//! mirrored token from the durable record.
//!
//! ## Timer ownership
//!
//! At most one renewal task exists. It is spawned when a session is established
//! and aborted on logout, on expiry detection and when a new session replaces
//! the old one. Each task also carries the session epoch it was started for
//! and exits when the epoch moves on, so a tick that is already running
//! cannot renew a cleared session.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use ledger::{Identity, ValidationError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::forms::{admin_identity, Credentials, Registration};
use super::store::{DurableSession, MirroredToken, SessionStore};
use crate::error::{AuthError, AuthResult};
use crate::identity::IdentityApi;

/// An established session.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn durable(&self) -> DurableSession {
        DurableSession {
            identity: self.identity.clone(),
            token: self.token.clone(),
            expires_at: Some(self.expires_at.to_rfc3339()),
        }
    }

    fn mirror(&self) -> MirroredToken {
        MirroredToken {
            token: self.token.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// State shared with the renewal task.
struct Shared<S> {
    store: S,
    session: Option<Session>,
    epoch: u64,
    visible: bool,
}

impl<S: SessionStore> Shared<S> {
    fn write(&mut self, session: &Session) -> AuthResult<()> {
        let json = serde_json::to_string(&session.durable()).map_err(io::Error::other)?;
        self.store.write_record(&json)?;
        self.store.write_mirror(&session.mirror())?;
        Ok(())
    }

    /// Slide the expiry forward. An already expired session is left for
    /// expiry detection instead of being revived.
    fn renew(&mut self, ttl: TimeDelta, now: DateTime<Utc>) -> AuthResult<bool> {
        let Some(mut session) = self.session.clone() else {
            return Ok(false);
        };
        if session.expires_at <= now {
            return Ok(false);
        }
        session.expires_at = expiry(now, ttl);
        self.write(&session)?;
        self.session = Some(session);
        Ok(true)
    }

    /// Drop the session and both slots. Both slots are attempted even when
    /// the first fails.
    fn clear(&mut self) -> AuthResult<()> {
        self.session = None;
        self.epoch += 1;
        let record = self.store.clear_record();
        let mirror = self.store.clear_mirror();
        record?;
        mirror?;
        Ok(())
    }
}

fn lock<S>(shared: &Mutex<Shared<S>>) -> MutexGuard<'_, Shared<S>> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

fn expiry(now: DateTime<Utc>, ttl: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Validate a durable record. Any problem is a [`AuthError::MalformedSession`].
fn parse_durable(raw: &str, now: DateTime<Utc>) -> AuthResult<Session> {
    let record: DurableSession = serde_json::from_str(raw)
        .map_err(|e| AuthError::MalformedSession(format!("unreadable record: {e}")))?;
    let text = record
        .expires_at
        .ok_or_else(|| AuthError::MalformedSession("missing expiry".to_string()))?;
    let expires_at = DateTime::parse_from_rfc3339(&text)
        .map_err(|e| AuthError::MalformedSession(format!("invalid expiry {text:?}: {e}")))?
        .with_timezone(&Utc);
    if expires_at <= now {
        return Err(AuthError::MalformedSession(format!("expired at {expires_at}")));
    }
    if record.token.is_empty() {
        return Err(AuthError::MalformedSession("empty token".to_string()));
    }
    Ok(Session {
        identity: record.identity,
        token: record.token,
        expires_at,
    })
}

/// Owns the signed-in identity, its token and the renewal timer.
pub struct SessionLifecycle<I: IdentityApi, S: SessionStore> {
    identities: I,
    shared: Arc<Mutex<Shared<S>>>,
    ttl: Duration,
    timer: Option<JoinHandle<()>>,
}

impl<I: IdentityApi, S: SessionStore> SessionLifecycle<I, S> {
    pub fn new(identities: I, store: S, ttl: Duration) -> Self {
        Self {
            identities,
            shared: Arc::new(Mutex::new(Shared {
                store,
                session: None,
                epoch: 0,
                visible: true,
            })),
            ttl,
            timer: None,
        }
    }

    pub fn identities(&self) -> &I {
        &self.identities
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX)
    }

    fn lock(&self) -> MutexGuard<'_, Shared<S>> {
        lock(&self.shared)
    }

    /// Sign in. The administrative sentinel never reaches the Identity API.
    ///
    /// When several identities match, the first one returned is used.
    pub async fn login(&mut self, credentials: &Credentials) -> AuthResult<Identity> {
        if credentials.email.trim().is_empty() {
            return Err(ValidationError::Missing("Email").into());
        }
        let identity = if credentials.is_admin_sentinel() {
            admin_identity()
        } else {
            let matches = self
                .identities
                .find_by_credentials(credentials.email.trim(), &credentials.password)
                .await?;
            if matches.len() > 1 {
                warn!(count = matches.len(), "Several identities share these credentials, using the first");
            }
            matches
                .into_iter()
                .next()
                .ok_or(AuthError::InvalidCredentials)?
        };
        self.establish(identity.clone())?;
        info!(user_id = %identity.id, "Signed in");
        Ok(identity)
    }

    /// Create a standard identity and sign in as it.
    pub async fn register(&mut self, registration: &Registration) -> AuthResult<Identity> {
        let profile = registration.validate()?;
        let identity = self
            .identities
            .create(&profile)
            .await
            .map_err(AuthError::CreationError)?;
        self.establish(identity.clone())?;
        info!(user_id = %identity.id, "Registered");
        Ok(identity)
    }

    /// Bring back the session persisted by an earlier process.
    ///
    /// An absent, corrupt or expired record clears both slots and yields `None`.
    pub fn restore(&mut self) -> AuthResult<Option<Identity>> {
        let raw = self.lock().store.read_record()?;
        let Some(raw) = raw else {
            self.end()?;
            debug!("No stored session");
            return Ok(None);
        };
        let session = match parse_durable(&raw, Utc::now()) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Discarding stored session");
                self.end()?;
                return Ok(None);
            }
        };
        let identity = session.identity.clone();
        {
            let mut shared = self.lock();
            shared.session = Some(session);
            shared.epoch += 1;
        }
        self.renew()?;
        self.start_timer();
        info!(user_id = %identity.id, "Session restored");
        Ok(Some(identity))
    }

    /// Slide the expiry to `now + ttl` and rewrite the mirror.
    pub fn renew(&mut self) -> AuthResult<()> {
        let ttl = self.ttl_delta();
        if self.lock().renew(ttl, Utc::now())? {
            debug!("Session renewed");
        }
        Ok(())
    }

    /// Record foreground visibility. Becoming visible counts as regaining focus.
    pub fn set_visible(&mut self, visible: bool) -> AuthResult<()> {
        let was_visible = std::mem::replace(&mut self.lock().visible, visible);
        if visible && !was_visible {
            self.on_focus()?;
        }
        Ok(())
    }

    /// Renew when the client regains focus. Ignored while not visible.
    pub fn on_focus(&mut self) -> AuthResult<()> {
        if !self.lock().visible {
            return Ok(());
        }
        self.renew()
    }

    /// Clear the identity, token, durable record and mirror. Idempotent.
    pub fn logout(&mut self) -> AuthResult<()> {
        let was_active = self.lock().session.is_some();
        self.end()?;
        if was_active {
            info!("Signed out");
        }
        Ok(())
    }

    /// The signed-in identity. A session found past its expiry is ended here.
    pub fn current(&mut self) -> Option<Identity> {
        let expired = {
            let shared = self.lock();
            match &shared.session {
                None => return None,
                Some(session) if session.expires_at > Utc::now() => {
                    return Some(session.identity.clone());
                }
                Some(_) => true,
            }
        };
        if expired {
            info!("Session expired");
            if let Err(e) = self.end() {
                warn!(error = %e, "Could not clear expired session");
            }
        }
        None
    }

    pub fn token(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.token.clone())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.lock().session.as_ref().map(|s| s.expires_at)
    }

    pub fn has_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn establish(&mut self, identity: Identity) -> AuthResult<()> {
        let session = Session {
            identity,
            token: Uuid::new_v4().to_string(),
            expires_at: expiry(Utc::now(), self.ttl_delta()),
        };
        {
            let mut shared = self.lock();
            shared.write(&session)?;
            shared.session = Some(session);
            shared.epoch += 1;
        }
        self.start_timer();
        Ok(())
    }

    fn end(&mut self) -> AuthResult<()> {
        self.stop_timer();
        self.lock().clear()
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn start_timer(&mut self) {
        self.stop_timer();
        let Ok(handle) = Handle::try_current() else {
            debug!("No async runtime, periodic renewal disabled");
            return;
        };
        let shared = Arc::clone(&self.shared);
        let epoch = self.lock().epoch;
        let ttl = self.ttl_delta();
        let period = (self.ttl / 2).max(Duration::from_millis(1));
        self.timer = Some(handle.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticks = tokio::time::interval_at(start, period);
            loop {
                ticks.tick().await;
                let mut state = lock(&shared);
                if state.epoch != epoch {
                    break;
                }
                match state.renew(ttl, Utc::now()) {
                    Ok(true) => debug!("Session renewed by timer"),
                    Ok(false) => break,
                    Err(e) => warn!(error = %e, "Periodic session renewal failed"),
                }
            }
        }));
    }
}

impl<I: IdentityApi, S: SessionStore> Drop for SessionLifecycle<I, S> {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemorySessionStore;
    use crate::identity::MemoryIdentities;
    use ledger::Role;

    const TTL: Duration = Duration::from_secs(1800);

    fn ana() -> Identity {
        Identity {
            id: "2".to_string(),
            display_name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::Standard,
            monthly_income: 3000.0,
        }
    }

    fn lifecycle() -> (
        SessionLifecycle<MemoryIdentities, MemorySessionStore>,
        MemoryIdentities,
        MemorySessionStore,
    ) {
        let identities = MemoryIdentities::new();
        identities.insert(ana(), "secret");
        let store = MemorySessionStore::new();
        let session = SessionLifecycle::new(identities.clone(), store.clone(), TTL);
        (session, identities, store)
    }

    fn durable(expires_at: Option<String>) -> String {
        serde_json::to_string(&DurableSession {
            identity: ana(),
            token: "stored-token".to_string(),
            expires_at,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_persists_record_and_mirror() {
        let (mut session, _, store) = lifecycle();
        let identity = session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        assert_eq!(identity, ana());
        assert_eq!(session.current(), Some(ana()));

        let record: DurableSession = serde_json::from_str(&store.record().unwrap()).unwrap();
        let mirror = store.mirror().unwrap();
        assert_eq!(Some(record.token.clone()), session.token());
        assert_eq!(mirror.token, record.token);
        assert!(session.has_timer());
    }

    #[tokio::test]
    async fn test_admin_sentinel_skips_remote() {
        let (mut session, identities, _) = lifecycle();
        let identity = session.login(&Credentials::new("admin", "1234")).await.unwrap();
        assert!(identity.is_admin());
        assert_eq!(identities.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_credentials_leave_no_session() {
        let (mut session, _, store) = lifecycle();
        let err = session
            .login(&Credentials::new("ana@example.com", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(session.current(), None);
        assert_eq!(store.record(), None);
        assert!(!session.has_timer());
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let (mut session, identities, _) = lifecycle();
        identities.insert(
            Identity {
                id: "9".to_string(),
                ..ana()
            },
            "secret",
        );
        let identity = session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        assert_eq!(identity.id, "2");
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let (mut session, _, store) = lifecycle();
        let registration = Registration {
            display_name: "Bia".to_string(),
            email: "bia@example.com".to_string(),
            password: "pw".to_string(),
            confirm_password: "pw".to_string(),
            monthly_income: "1500,50".to_string(),
        };
        let identity = session.register(&registration).await.unwrap();
        assert_eq!(identity.role, Role::Standard);
        assert_eq!(identity.monthly_income, 1500.5);
        assert!(store.record().is_some());
    }

    #[tokio::test]
    async fn test_register_failure_is_creation_error() {
        let (mut session, identities, store) = lifecycle();
        identities.fail_next(500);
        let registration = Registration {
            email: "bia@example.com".to_string(),
            password: "pw".to_string(),
            confirm_password: "pw".to_string(),
            ..Default::default()
        };
        let err = session.register(&registration).await.unwrap_err();
        assert!(matches!(err, AuthError::CreationError(_)));
        assert_eq!(store.record(), None);
    }

    #[tokio::test]
    async fn test_register_validation_precedes_remote() {
        let (mut session, identities, _) = lifecycle();
        let registration = Registration {
            email: "bia@example.com".to_string(),
            password: "pw".to_string(),
            confirm_password: "pw".to_string(),
            monthly_income: "abc".to_string(),
            ..Default::default()
        };
        let err = session.register(&registration).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ValidationError::InvalidIncome(_))));
        assert_eq!(identities.calls(), 0);
    }

    #[tokio::test]
    async fn test_restore_rederives_mirror() {
        let expires = (Utc::now() + TimeDelta::minutes(10)).to_rfc3339();
        let store = MemorySessionStore::with_record(&durable(Some(expires)));
        store.set_mirror(Some(MirroredToken {
            token: "diverged".to_string(),
            expires_at: Utc::now(),
        }));
        let mut session = SessionLifecycle::new(MemoryIdentities::new(), store.clone(), TTL);

        assert_eq!(session.restore().unwrap(), Some(ana()));
        assert_eq!(store.mirror().unwrap().token, "stored-token");
        // Renewed on restore.
        assert!(session.expires_at().unwrap() > Utc::now() + TimeDelta::minutes(20));
        assert!(session.has_timer());
    }

    #[tokio::test]
    async fn test_restore_fails_closed() {
        let past = (Utc::now() - TimeDelta::minutes(1)).to_rfc3339();
        for raw in [
            durable(Some(past)),
            durable(None),
            durable(Some("not a date".to_string())),
            "{not json".to_string(),
        ] {
            let store = MemorySessionStore::with_record(&raw);
            store.set_mirror(Some(MirroredToken {
                token: "stored-token".to_string(),
                expires_at: Utc::now(),
            }));
            let mut session = SessionLifecycle::new(MemoryIdentities::new(), store.clone(), TTL);
            assert_eq!(session.restore().unwrap(), None);
            assert_eq!(session.current(), None);
            assert_eq!(store.record(), None);
            assert_eq!(store.mirror(), None);
            assert!(!session.has_timer());
        }
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (mut session, _, store) = lifecycle();
        session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        session.logout().unwrap();
        assert_eq!(session.current(), None);
        assert_eq!(session.token(), None);
        assert_eq!(store.record(), None);
        assert_eq!(store.mirror(), None);
        assert!(!session.has_timer());
        session.logout().unwrap();
    }

    #[tokio::test]
    async fn test_focus_renews_only_when_visible() {
        let (mut session, _, store) = lifecycle();
        session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        session.set_visible(false).unwrap();
        store.set_mirror(None);
        session.on_focus().unwrap();
        assert_eq!(store.mirror(), None);

        session.set_visible(true).unwrap();
        assert_eq!(store.mirror().map(|m| m.token), session.token());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_renews_at_half_ttl() {
        let (mut session, _, store) = lifecycle();
        session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        store.set_mirror(None);

        tokio::time::sleep(TTL / 2 + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.mirror().map(|m| m.token), session.token());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_renews_while_hidden() {
        let (mut session, _, store) = lifecycle();
        session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        session.set_visible(false).unwrap();
        store.set_mirror(None);
        let before = session.expires_at().unwrap();

        tokio::time::sleep(TTL / 2 + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.mirror().map(|m| m.token), session.token());
        assert!(session.expires_at().unwrap() >= before);
    }

    #[tokio::test]
    async fn test_expired_session_ends_on_access() {
        let identities = MemoryIdentities::new();
        identities.insert(ana(), "secret");
        let store = MemorySessionStore::new();
        let mut session =
            SessionLifecycle::new(identities, store.clone(), Duration::from_millis(200));
        session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        assert!(store.record().is_some());

        // Blocks the runtime thread, so the renewal task cannot run meanwhile.
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(session.current(), None);
        assert_eq!(session.token(), None);
        assert_eq!(store.record(), None);
        assert_eq!(store.mirror(), None);
        assert!(!session.has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_cancels_timer() {
        let (mut session, _, store) = lifecycle();
        session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        session.logout().unwrap();

        tokio::time::sleep(TTL).await;
        tokio::task::yield_now().await;
        assert_eq!(store.record(), None);
        assert_eq!(store.mirror(), None);
    }

    #[tokio::test]
    async fn test_new_login_replaces_timer() {
        let (mut session, _, _) = lifecycle();
        let credentials = Credentials::new("ana@example.com", "secret");
        session.login(&credentials).await.unwrap();
        let first = session.token();
        session.login(&credentials).await.unwrap();
        assert_ne!(session.token(), first);
        assert!(session.has_timer());
    }
}
