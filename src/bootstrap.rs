//! Session bootstrap and role resolution.
//!
//! Reconciles three sources of truth into one session: the identity provider
//! (is there a credential?), the backend (is this principal registered, and
//! with which role?) and the persisted store (what did we show last time?).
//!
//! ```text
//! Unauthenticated ──login/start──▶ Authenticating ──┬──▶ Registered(role)
//!        ▲                              │           └──▶ NeedsRoleSelection ──register──▶ Registered(role)
//!        │                              │
//!        └──── failure / cancellation ──┘             Registered(role) ──logout──▶ Unauthenticated
//! ```
//!
//! Resolution policy:
//! - the registration check strictly precedes the role fetch, and the store is
//!   written once, after both finish;
//! - if either remote call fails the session resolves to `Registered(User)`.
//!   This fails open to the least-privileged role. It can hide a backend fault
//!   that matters for permissions, so it is logged at `warn` and reported as
//!   `degraded` in the returned `Resolution`;
//! - write operations (`register_user_with_role`, `create_admin_user`) report
//!   failures as `OpResult` and leave the session untouched, so they can be retried.
//!
//! Overlapping `login()` / `bootstrap_on_start()` calls are single-flighted: a
//! caller arriving while another attempt is running waits for it and returns
//! its outcome instead of starting a second one.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actor::{ActorHandle, BackendActor, RoleTag, WriteResult};
use crate::error::{ClientError, ClientResult, OpResult, ProviderError, RemoteCallError};
use crate::identity::{Identity, IdentityProvider, LoginOptions, Principal, Role};
use crate::services::DataService;
use crate::session::{NotificationLevel, SessionStore};

/// Outcome of one bootstrap or login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Resolution {
    Unauthenticated,
    NeedsRoleSelection { principal: Principal },
    /// `degraded` is set when the role is the fail-open default after a
    /// remote error rather than the backend's answer.
    Registered { principal: Principal, role: Role, degraded: bool },
}

type FlightOutcome = Result<Resolution, ProviderError>;

pub struct SessionBootstrap {
    provider: Arc<dyn IdentityProvider>,
    actors: Arc<ActorHandle>,
    store: Arc<SessionStore>,
    login_options: LoginOptions,
    flight: tokio::sync::Mutex<()>,
    completed: AtomicU64,
    last: Mutex<Option<FlightOutcome>>,
}

impl SessionBootstrap {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        actors: ActorHandle,
        store: Arc<SessionStore>,
        login_options: LoginOptions,
    ) -> Self {
        Self {
            provider,
            actors: Arc::new(actors),
            store,
            login_options,
            flight: tokio::sync::Mutex::new(()),
            completed: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> { &self.store }

    /// Authenticated data and governance calls sharing this bootstrap's provider and actor.
    pub fn services(&self) -> DataService {
        DataService::new(self.provider.clone(), self.actors.clone(), self.store.clone())
    }

    async fn single_flight<F, Fut>(&self, run: F) -> FlightOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightOutcome>,
    {
        let seen = self.completed.load(Ordering::Acquire);
        let _guard = self.flight.lock().await;
        if self.completed.load(Ordering::Acquire) != seen {
            if let Some(prev) = self.last.lock().clone() {
                debug!(target: "ecochain", "joined in-flight session resolution");
                return prev;
            }
        }
        let out = run().await;
        *self.last.lock() = Some(out.clone());
        self.completed.fetch_add(1, Ordering::Release);
        out
    }

    async fn query_registration(&self, identity: &Identity) -> ClientResult<Option<Role>> {
        let actor = self.actors.get(identity).await?;
        if !actor.is_user_registered().await? {
            return Ok(None);
        }
        let tag = actor.get_user_role().await?;
        Ok(Some(Role::from(tag)))
    }

    /// Resolve registration and role for `identity`, then commit exactly once.
    async fn resolve(&self, identity: Identity) -> Resolution {
        let principal = identity.principal().clone();
        match self.query_registration(&identity).await {
            Ok(Some(role)) => {
                info!(target: "ecochain", "session resolved: principal={} role={}", principal, role);
                self.store.set_user(principal.clone(), role);
                Resolution::Registered { principal, role, degraded: false }
            }
            Ok(None) => {
                info!(target: "ecochain", "principal {} authenticated but not registered; role selection required", principal);
                self.store.set_needs_role_selection(principal.clone());
                Resolution::NeedsRoleSelection { principal }
            }
            Err(e) => {
                warn!(target: "ecochain", "role resolution failed for {}, falling back to User: {}", principal, e);
                self.store.set_user(principal.clone(), Role::User);
                Resolution::Registered { principal, role: Role::User, degraded: true }
            }
        }
    }

    /// A session without a usable credential must not keep granting its role.
    fn clear_stale(&self, why: &str) {
        if !self.store.snapshot().is_signed_out() {
            info!(target: "ecochain", "{}; clearing restored session", why);
            self.store.clear();
        }
    }

    /// Run once at process start, after the store has been restored.
    /// Never fails: provider errors leave the session signed out.
    pub async fn bootstrap_on_start(&self) -> Resolution {
        let out = self
            .single_flight(|| async {
                if !self.provider.is_authenticated().await {
                    self.clear_stale("provider session gone");
                    return Ok(Resolution::Unauthenticated);
                }
                match self.provider.identity().await {
                    Ok(identity) => Ok(self.resolve(identity).await),
                    Err(e) => {
                        warn!(target: "ecochain", "identity unavailable during bootstrap: {}", e);
                        self.clear_stale("no usable credential");
                        Ok(Resolution::Unauthenticated)
                    }
                }
            })
            .await;
        out.unwrap_or(Resolution::Unauthenticated)
    }

    /// Authenticate if needed, then resolve the role. Settles only after
    /// resolution has been attempted; a provider failure or cancellation clears
    /// the loading flag and is returned to the caller.
    pub async fn login(&self) -> Result<Resolution, ProviderError> {
        self.single_flight(|| async {
            if self.provider.is_authenticated().await {
                return match self.provider.identity().await {
                    Ok(identity) => Ok(self.resolve(identity).await),
                    Err(e) => {
                        warn!(target: "ecochain", "identity unavailable: {}", e);
                        self.clear_stale("no usable credential");
                        Err(e)
                    }
                };
            }

            self.store.set_loading(true);
            if let Err(e) = self.provider.login(&self.login_options).await {
                match &e {
                    ProviderError::Cancelled => info!(target: "ecochain", "login cancelled"),
                    other => {
                        error!(target: "ecochain", "login error: {}", other);
                        self.store.notify(NotificationLevel::Error, format!("Login failed: {}", other));
                    }
                }
                self.store.set_loading(false);
                return Err(e);
            }
            match self.provider.identity().await {
                Ok(identity) => Ok(self.resolve(identity).await),
                Err(e) => {
                    error!(target: "ecochain", "identity missing after login: {}", e);
                    self.store.set_loading(false);
                    Err(e)
                }
            }
        })
        .await
    }

    /// Provider logout is best-effort; the local session is always cleared.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.logout().await {
            error!(target: "ecochain", "error during logout: {}", e);
        }
        self.actors.invalidate().await;
        self.store.clear();
        info!(target: "ecochain", "logged out");
    }

    async fn registered_write<F, Fut>(&self, op: F) -> ClientResult<Principal>
    where
        F: FnOnce(Arc<dyn BackendActor>) -> Fut,
        Fut: Future<Output = Result<WriteResult, RemoteCallError>>,
    {
        let identity = self.provider.identity().await?;
        let actor = self.actors.get(&identity).await?;
        match op(actor).await? {
            WriteResult::Ok => Ok(identity.principal().clone()),
            WriteResult::Err(msg) => Err(ClientError::Registration(msg)),
        }
    }

    /// Register the pending principal with `role`. Only valid while role
    /// selection is pending.
    pub async fn register_user_with_role(&self, role: Role) -> OpResult {
        if !self.store.should_show_role_selection() {
            return OpResult::failed("role selection not pending");
        }
        let tag = RoleTag::from(role);
        match self.registered_write(|actor| async move { actor.register_user_with_role(tag).await }).await {
            Ok(principal) => {
                info!(target: "ecochain", "user {} registered with role {}", principal, role);
                self.store.set_user(principal, role);
                self.store.notify(NotificationLevel::Success, format!("Registered as {}", role));
                OpResult::ok()
            }
            Err(e) => {
                warn!(target: "ecochain", "registration failed: {}", e);
                self.store.notify(NotificationLevel::Error, format!("Registration failed: {}", e));
                e.into()
            }
        }
    }

    /// Ask the backend to make the caller the first administrator. The backend
    /// alone decides whether this is allowed.
    pub async fn create_admin_user(&self) -> OpResult {
        match self.registered_write(|actor| async move { actor.create_first_admin().await }).await {
            Ok(principal) => {
                info!(target: "ecochain", "first admin created: {}", principal);
                self.store.set_user(principal, Role::Admin);
                self.store.notify(NotificationLevel::Success, "Administrator account created");
                OpResult::ok()
            }
            Err(e) => {
                warn!(target: "ecochain", "admin creation failed: {}", e);
                self.store.notify(NotificationLevel::Error, format!("Admin creation failed: {}", e));
                e.into()
            }
        }
    }

    pub fn dismiss_notification(&self, id: Uuid) -> bool {
        self.store.dismiss_notification(id)
    }
}
