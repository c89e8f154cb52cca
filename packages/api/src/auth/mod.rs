//! Sign-in, registration and the persisted session.

mod forms;
mod session;
mod store;

pub use forms::{
    admin_identity, Credentials, IdentityChanges, Profile, Registration, ADMIN_LOGIN, ADMIN_PASSWORD,
};
pub use session::{Session, SessionLifecycle};
pub use store::{DurableSession, FileSessionStore, MemorySessionStore, MirroredToken, SessionStore};
