//! Authentication state: restore, login, logout, and the unauthorized path.
//!
//! The [`SessionStore`] owns the process-wide [`Session`] singleton. It is
//! the single writer path for authentication state; route guards and
//! navigation read it through [`SessionStore::session`] and react to changes
//! through [`SessionStore::subscribe`].
//!
//! The session survives restarts through an injected [`Storage`]: the user
//! record is persisted on login, restored once at startup, and cleared on
//! logout or when any endpoint replies `401`.

pub mod storage;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::json;
use tracing::{debug, warn};

use crate::api::users::User;
use crate::transport::{ApiError, Method, RequestBody, Transport};

use storage::Storage;

/// Storage key under which the serialized [`User`] record lives.
pub const SESSION_STORAGE_KEY: &str = "user";

const LOGIN_PATH: &str = "/api/users/login";
const LOGOUT_PATH: &str = "/api/users/logout";

/// The authentication state visible to the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The authenticated user, or `None`.
    pub user: Option<User>,
    /// `true` only during the initial restore pass. Flips to `false` exactly
    /// once, whether or not a user was recovered.
    pub loading: bool,
}

impl Session {
    /// The state before restore has run.
    #[must_use]
    pub const fn unresolved() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    /// Returns `true` if a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unresolved()
    }
}

type SessionCallback = Arc<dyn Fn(&Session) + Send + Sync>;

/// Owner of the [`Session`] singleton.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use marquee::prelude::*;
/// use marquee::session::storage::MemoryStorage;
///
/// # async fn run(transport: Arc<Transport>) -> Result<(), ApiError> {
/// let session = Arc::new(SessionStore::new(transport, Arc::new(MemoryStorage::new())));
///
/// // Once at startup:
/// session.restore();
/// tokio::spawn({
///     let session = session.clone();
///     async move { session.run_unauthorized_listener().await }
/// });
///
/// let user = session.login("a@b.com", "secret1").await?;
/// assert_eq!(session.session().user, Some(user));
/// # Ok(())
/// # }
/// ```
pub struct SessionStore {
    transport: Arc<Transport>,
    storage: Arc<dyn Storage>,
    state: Mutex<Session>,
    subscribers: Mutex<Vec<(u64, SessionCallback)>>,
    next_subscriber_id: AtomicU64,
    restored: AtomicBool,
}

impl SessionStore {
    /// Creates a store in the unresolved state.
    pub fn new(transport: Arc<Transport>, storage: Arc<dyn Storage>) -> Self {
        Self {
            transport,
            storage,
            state: Mutex::new(Session::unresolved()),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber_id: AtomicU64::new(0),
            restored: AtomicBool::new(false),
        }
    }

    /// A snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.state.lock().expect("session lock poisoned").clone()
    }

    /// Restores the persisted user record. Runs once; later calls are no-ops.
    ///
    /// A record that fails to parse is removed so the repair is idempotent.
    /// Either way `loading` becomes `false`, exactly once.
    pub fn restore(&self) {
        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }

        let user = match self.storage.get(SESSION_STORAGE_KEY) {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    debug!(user = %user.email, "session restored from storage");
                    Some(user)
                }
                Err(err) => {
                    warn!(error = %err, "corrupt session record, clearing");
                    self.storage.remove(SESSION_STORAGE_KEY);
                    None
                }
            },
            None => None,
        };

        self.transition(|session| {
            session.user = user;
            session.loading = false;
        });
    }

    /// Authenticates against the server.
    ///
    /// On success the user is stored in memory and persisted durably, so a
    /// later [`restore`](Self::restore) reproduces it. On failure the session
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let user: User = self
            .transport
            .send_json(
                Method::POST,
                LOGIN_PATH,
                RequestBody::Json(json!({ "email": email, "password": password })),
            )
            .await?;

        let record =
            serde_json::to_string(&user).map_err(|e| ApiError::Unknown(e.to_string()))?;
        self.storage.set(SESSION_STORAGE_KEY, &record);
        self.transition(|session| session.user = Some(user.clone()));

        Ok(user)
    }

    /// Ends the session.
    ///
    /// The server is asked to end its side first. Local state is cleared on
    /// success and also when the call fails without a response (the user
    /// asked to leave; a dead network must not pin them to a stale session).
    /// A failure response from the server aborts the local clear.
    ///
    /// # Errors
    ///
    /// Forwards any non-network [`ApiError`]; the session is unchanged in
    /// that case.
    pub async fn logout(&self) -> Result<(), ApiError> {
        match self
            .transport
            .send(Method::POST, LOGOUT_PATH, RequestBody::Json(json!({})))
            .await
        {
            Ok(_) => {
                self.clear();
                Ok(())
            }
            Err(err) if err.is_network() => {
                warn!(error = %err, "logout unreachable, clearing local session anyway");
                self.clear();
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Reacts to a `401` from any endpoint: the session is invalid
    /// everywhere, so it is cleared without calling the logout endpoint.
    pub fn handle_unauthorized(&self) {
        debug!("unauthorized notification, clearing session");
        self.clear();
    }

    /// Forwards the transport's unauthorized notifications into
    /// [`handle_unauthorized`](Self::handle_unauthorized) until the transport
    /// is dropped. Spawn this once at startup.
    pub async fn run_unauthorized_listener(&self) {
        let mut rx = self.transport.subscribe_unauthorized();
        while rx.recv().await.is_ok() {
            self.handle_unauthorized();
        }
    }

    /// Registers a callback invoked after every session transition.
    /// Dropping the handle unsubscribes.
    #[must_use]
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(&Session) + Send + Sync + 'static,
    ) -> SessionSubscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push((id, Arc::new(callback)));
        SessionSubscription {
            store: Arc::clone(self),
            id,
        }
    }

    fn clear(&self) {
        self.storage.remove(SESSION_STORAGE_KEY);
        self.transition(|session| session.user = None);
    }

    fn transition(&self, apply: impl FnOnce(&mut Session)) {
        let snapshot = {
            let mut state = self.state.lock().expect("session lock poisoned");
            apply(&mut state);
            state.clone()
        };

        let callbacks: Vec<SessionCallback> = self
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.session())
            .field("restored", &self.restored.load(Ordering::Relaxed))
            .finish()
    }
}

/// Keeps a session subscription alive; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct SessionSubscription {
    store: Arc<SessionStore>,
    id: u64,
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.store
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .retain(|(id, _)| *id != self.id);
    }
}
