#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

use ecochain_client::actor::{ActorFactory, ActorHandle, BackendActor, DataEntry, Proposal, RoleTag, UserProfile, WriteResult};
use ecochain_client::error::{ClientError, ProviderError, RemoteCallError};
use ecochain_client::identity::{Identity, IdentityProvider, LoginOptions, Principal};
use ecochain_client::session::{MemoryPersistence, SessionPersistence, SessionStore};
use ecochain_client::SessionBootstrap;

pub fn identity(seed: u8) -> Identity {
    Identity::new(vec![seed; 32], None)
}

pub fn login_options() -> LoginOptions {
    LoginOptions {
        identity_provider_url: reqwest::Url::parse("http://localhost:4943/?canisterId=ii").unwrap(),
        max_time_to_live: Duration::from_secs(60),
    }
}

/// Identity provider double. Logging in flips `authenticated` unless an
/// outcome has been queued.
pub struct MockProvider {
    pub authenticated: AtomicBool,
    pub identity: Identity,
    pub login_outcome: Mutex<Result<(), ProviderError>>,
    pub logout_fails: AtomicBool,
    pub identity_fails: AtomicBool,
    pub login_delay: Duration,
    pub login_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(identity: Identity, authenticated: bool) -> Self {
        Self {
            authenticated: AtomicBool::new(authenticated),
            identity,
            login_outcome: Mutex::new(Ok(())),
            logout_fails: AtomicBool::new(false),
            identity_fails: AtomicBool::new(false),
            login_delay: Duration::ZERO,
            login_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_login_delay(mut self, d: Duration) -> Self {
        self.login_delay = d;
        self
    }

    pub fn fail_login(&self, err: ProviderError) {
        *self.login_outcome.lock() = Err(err);
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn identity(&self) -> Result<Identity, ProviderError> {
        if self.identity_fails.load(Ordering::SeqCst) {
            return Err(ProviderError::Failed("corrupt delegation".into()));
        }
        if self.authenticated.load(Ordering::SeqCst) {
            Ok(self.identity.clone())
        } else {
            Err(ProviderError::NotAuthenticated)
        }
    }

    async fn login(&self, _opts: &LoginOptions) -> Result<(), ProviderError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }
        let outcome = self.login_outcome.lock().clone();
        if outcome.is_ok() {
            self.authenticated.store(true, Ordering::SeqCst);
        }
        outcome
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        self.authenticated.store(false, Ordering::SeqCst);
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("idp offline".into()));
        }
        Ok(())
    }
}

/// Scripted backend. `Err(cause)` entries turn into remote call failures.
pub struct MockBackend {
    pub registered: Mutex<Result<bool, String>>,
    pub role: Mutex<Result<RoleTag, String>>,
    pub register_reply: Mutex<WriteResult>,
    pub admin_reply: Mutex<WriteResult>,
    pub promote_reply: Mutex<WriteResult>,
    pub calls: Mutex<Vec<String>>,
    pub latency: Mutex<Duration>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registered: Mutex::new(Ok(false)),
            role: Mutex::new(Ok(RoleTag::User)),
            register_reply: Mutex::new(WriteResult::Ok),
            admin_reply: Mutex::new(WriteResult::Ok),
            promote_reply: Mutex::new(WriteResult::Ok),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
        })
    }

    /// Make the registration and role queries take `d` each.
    pub fn with_latency(self: &Arc<Self>, d: Duration) -> Arc<Self> {
        *self.latency.lock() = d;
        self.clone()
    }

    async fn lag(&self) {
        let d = *self.latency.lock();
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }

    pub fn registered_as(self: &Arc<Self>, tag: RoleTag) -> Arc<Self> {
        *self.registered.lock() = Ok(true);
        *self.role.lock() = Ok(tag);
        self.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, method: &str) {
        self.calls.lock().push(method.to_string());
    }
}

pub struct MockActor {
    principal: Principal,
    backend: Arc<MockBackend>,
}

fn scripted<T: Clone>(method: &str, slot: &Mutex<Result<T, String>>) -> Result<T, RemoteCallError> {
    slot.lock().clone().map_err(|cause| RemoteCallError::new(method, cause))
}

#[async_trait]
impl BackendActor for MockActor {
    fn principal(&self) -> &Principal { &self.principal }

    async fn is_user_registered(&self) -> Result<bool, RemoteCallError> {
        self.backend.record("is_user_registered");
        self.backend.lag().await;
        scripted("is_user_registered", &self.backend.registered)
    }

    async fn get_user_role(&self) -> Result<RoleTag, RemoteCallError> {
        self.backend.record("get_user_role");
        self.backend.lag().await;
        scripted("get_user_role", &self.backend.role)
    }

    async fn register_user_with_role(&self, role: RoleTag) -> Result<WriteResult, RemoteCallError> {
        self.backend.record(&format!("register_user_with_role:{}", ecochain_client::identity::Role::from(role)));
        let reply = self.backend.register_reply.lock().clone();
        if reply == WriteResult::Ok {
            *self.backend.registered.lock() = Ok(true);
            *self.backend.role.lock() = Ok(role);
        }
        Ok(reply)
    }

    async fn create_first_admin(&self) -> Result<WriteResult, RemoteCallError> {
        self.backend.record("create_first_admin");
        Ok(self.backend.admin_reply.lock().clone())
    }

    async fn promote_user_role(&self, principal: &str, role: RoleTag) -> Result<WriteResult, RemoteCallError> {
        self.backend.record(&format!("promote_user_role:{}:{}", principal, ecochain_client::identity::Role::from(role)));
        Ok(self.backend.promote_reply.lock().clone())
    }

    async fn submit_data(&self, content: &str) -> Result<JsonValue, RemoteCallError> {
        self.backend.record("submit_data");
        Ok(json!({ "content": content }))
    }

    async fn get_pending_data(&self) -> Result<Vec<DataEntry>, RemoteCallError> {
        self.backend.record("get_pending_data");
        Ok(Vec::new())
    }

    async fn vote_on_data(&self, _id: u64, _approve: bool) -> Result<JsonValue, RemoteCallError> {
        self.backend.record("vote_on_data");
        Ok(JsonValue::Null)
    }

    async fn get_validated_data(&self) -> Result<Vec<DataEntry>, RemoteCallError> {
        self.backend.record("get_validated_data");
        Ok(Vec::new())
    }

    async fn get_proposals(&self) -> Result<Vec<Proposal>, RemoteCallError> {
        self.backend.record("get_proposals");
        Ok(Vec::new())
    }

    async fn create_proposal(&self, _title: &str, _description: &str) -> Result<JsonValue, RemoteCallError> {
        self.backend.record("create_proposal");
        Ok(JsonValue::Null)
    }

    async fn get_user_profile(&self) -> Result<Option<UserProfile>, RemoteCallError> {
        self.backend.record("get_user_profile");
        Ok(None)
    }

    async fn get_wallet_address(&self) -> Result<String, RemoteCallError> {
        self.backend.record("get_wallet_address");
        Ok("0xabc".into())
    }

    async fn reward_contributors(&self) -> Result<JsonValue, RemoteCallError> {
        self.backend.record("reward_contributors");
        Ok(JsonValue::Null)
    }

    async fn delete_data(&self, _id: u64) -> Result<JsonValue, RemoteCallError> {
        self.backend.record("delete_data");
        Ok(JsonValue::Null)
    }
}

pub struct MockFactory {
    pub backend: Arc<MockBackend>,
    pub builds: AtomicUsize,
}

#[async_trait]
impl ActorFactory for MockFactory {
    async fn build(&self, identity: &Identity) -> Result<Arc<dyn BackendActor>, ClientError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockActor { principal: identity.principal().clone(), backend: self.backend.clone() }))
    }
}

pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub backend: Arc<MockBackend>,
    pub factory: Arc<MockFactory>,
    pub persistence: Arc<MemoryPersistence>,
    pub boot: SessionBootstrap,
}

impl Harness {
    pub fn new(provider: MockProvider, backend: Arc<MockBackend>) -> Self {
        Self::with_persistence(provider, backend, Arc::new(MemoryPersistence::new()))
    }

    pub fn with_persistence(provider: MockProvider, backend: Arc<MockBackend>, persistence: Arc<MemoryPersistence>) -> Self {
        let provider = Arc::new(provider);
        let factory = Arc::new(MockFactory { backend: backend.clone(), builds: AtomicUsize::new(0) });
        let store = SessionStore::restore(persistence.clone() as Arc<dyn SessionPersistence>);
        let boot = SessionBootstrap::new(
            provider.clone(),
            ActorHandle::new(factory.clone()),
            Arc::new(store),
            login_options(),
        );
        Self { provider, backend, factory, persistence, boot }
    }

    pub fn builds(&self) -> usize {
        self.factory.builds.load(Ordering::SeqCst)
    }
}
