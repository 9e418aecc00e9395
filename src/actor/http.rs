//! reqwest-backed actor.
//!
//! Each method is one POST to
//! `{host}/api/v2/canister/{canister_id}/{query|call}/{method}` with body
//! `{"args": [...]}` and the caller's principal in `x-ecochain-principal`.
//! Replies come back as `{"reply": value}` or `{"reject": {code, message}}`.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use super::contract::{BackendActor, DataEntry, Proposal, RoleTag, UserProfile, WriteResult};
use super::handle::ActorFactory;
use crate::config::{BuildMode, ClientConfig};
use crate::error::{ClientError, ClientResult, RemoteCallError};
use crate::identity::{Identity, Principal};

pub const PRINCIPAL_HEADER: &str = "x-ecochain-principal";

#[derive(Debug, Clone, Copy)]
enum CallKind {
    Query,
    Update,
}

impl CallKind {
    fn segment(self) -> &'static str {
        match self {
            CallKind::Query => "query",
            CallKind::Update => "call",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Reject {
    #[serde(default)]
    code: Option<JsonValue>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    reply: Option<JsonValue>,
    #[serde(default)]
    reject: Option<Reject>,
}

pub struct HttpActor {
    base: Url,
    canister_id: String,
    client: reqwest::Client,
    principal: Principal,
    root_key: Option<Vec<u8>>,
}

impl HttpActor {
    pub fn root_key(&self) -> Option<&[u8]> { self.root_key.as_deref() }
    pub fn canister_id(&self) -> &str { &self.canister_id }

    async fn call<T: DeserializeOwned>(&self, kind: CallKind, method: &str, args: JsonValue) -> Result<T, RemoteCallError> {
        let path = format!(
            "api/v2/canister/{}/{}/{}",
            urlencoding::encode(&self.canister_id),
            kind.segment(),
            method
        );
        let url = self.base.join(&path).map_err(|e| RemoteCallError::new(method, e))?;
        let mut headers = HeaderMap::new();
        let principal = HeaderValue::from_str(&self.principal.to_text()).map_err(|e| RemoteCallError::new(method, e))?;
        headers.insert(PRINCIPAL_HEADER, principal);

        debug!(target: "ecochain", "-> {} {}", kind.segment(), method);
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(&json!({ "args": args }))
            .send()
            .await
            .map_err(|e| RemoteCallError::new(method, e))?;
        let status = resp.status();
        let envelope: Option<Envelope> = resp.json().await.ok();

        if let Some(reject) = envelope.as_ref().and_then(|e| e.reject.as_ref()) {
            let code = reject.code.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "?".into());
            return Err(RemoteCallError::new(method, format!("rejected ({}): {}", code, reject.message)));
        }
        if !status.is_success() {
            return Err(RemoteCallError::new(method, format!("HTTP {}", status)));
        }
        let reply = envelope
            .ok_or_else(|| RemoteCallError::new(method, "malformed reply body"))?
            .reply
            .unwrap_or(JsonValue::Null);
        serde_json::from_value(reply).map_err(|e| RemoteCallError::new(method, format!("decode reply: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    #[serde(default)]
    root_key: Option<String>,
}

/// Fetch the replica root key. Only meaningful against a local replica.
async fn fetch_root_key(client: &reqwest::Client, base: &Url) -> Result<Vec<u8>, RemoteCallError> {
    let url = base.join("api/v2/status").map_err(|e| RemoteCallError::new("status", e))?;
    let resp = client.get(url).send().await.map_err(|e| RemoteCallError::new("status", e))?;
    if !resp.status().is_success() {
        return Err(RemoteCallError::new("status", format!("HTTP {}", resp.status())));
    }
    let body: StatusReply = resp.json().await.map_err(|e| RemoteCallError::new("status", e))?;
    let encoded = body.root_key.ok_or_else(|| RemoteCallError::new("status", "no root_key in status reply"))?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| RemoteCallError::new("status", e))
}

#[async_trait]
impl BackendActor for HttpActor {
    fn principal(&self) -> &Principal { &self.principal }

    async fn is_user_registered(&self) -> Result<bool, RemoteCallError> {
        self.call(CallKind::Query, "is_user_registered", json!([])).await
    }

    async fn get_user_role(&self) -> Result<RoleTag, RemoteCallError> {
        self.call(CallKind::Query, "get_user_role", json!([])).await
    }

    async fn register_user_with_role(&self, role: RoleTag) -> Result<WriteResult, RemoteCallError> {
        self.call(CallKind::Update, "register_user_with_role", json!([role])).await
    }

    async fn create_first_admin(&self) -> Result<WriteResult, RemoteCallError> {
        self.call(CallKind::Update, "create_first_admin", json!([])).await
    }

    async fn promote_user_role(&self, principal: &str, role: RoleTag) -> Result<WriteResult, RemoteCallError> {
        self.call(CallKind::Update, "promote_user_role", json!([principal, role])).await
    }

    async fn submit_data(&self, content: &str) -> Result<JsonValue, RemoteCallError> {
        self.call(CallKind::Update, "submit_data", json!([content])).await
    }

    async fn get_pending_data(&self) -> Result<Vec<DataEntry>, RemoteCallError> {
        self.call(CallKind::Query, "get_pending_data", json!([])).await
    }

    async fn vote_on_data(&self, id: u64, approve: bool) -> Result<JsonValue, RemoteCallError> {
        self.call(CallKind::Update, "vote_on_data", json!([id, approve])).await
    }

    async fn get_validated_data(&self) -> Result<Vec<DataEntry>, RemoteCallError> {
        self.call(CallKind::Query, "get_validated_data", json!([])).await
    }

    async fn get_proposals(&self) -> Result<Vec<Proposal>, RemoteCallError> {
        self.call(CallKind::Query, "get_proposals", json!([])).await
    }

    async fn create_proposal(&self, title: &str, description: &str) -> Result<JsonValue, RemoteCallError> {
        self.call(CallKind::Update, "create_proposal", json!([title, description])).await
    }

    async fn get_user_profile(&self) -> Result<Option<UserProfile>, RemoteCallError> {
        self.call(CallKind::Query, "get_user_profile", json!([])).await
    }

    async fn get_wallet_address(&self) -> Result<String, RemoteCallError> {
        self.call(CallKind::Query, "get_wallet_address", json!([])).await
    }

    async fn reward_contributors(&self) -> Result<JsonValue, RemoteCallError> {
        self.call(CallKind::Update, "reward_contributors", json!([])).await
    }

    async fn delete_data(&self, id: u64) -> Result<JsonValue, RemoteCallError> {
        self.call(CallKind::Update, "delete_data", json!([id])).await
    }
}

/// Builds `HttpActor`s for the configured endpoint and canister.
pub struct HttpActorFactory {
    base: Url,
    canister_id: String,
    mode: BuildMode,
    client: reqwest::Client,
}

impl HttpActorFactory {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let canister_id = config.require_canister_id()?.to_string();
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteCallError::new("client", e))?;
        Ok(Self { base: config.host.clone(), canister_id, mode: config.mode, client })
    }

    /// Build an actor, running the one-time trust bootstrap first when the endpoint
    /// is a local replica. A failed bootstrap is logged and the actor is returned
    /// anyway; later calls may or may not succeed.
    pub async fn build_http(&self, identity: &Identity) -> HttpActor {
        let root_key = if self.mode.needs_trust_bootstrap() {
            match fetch_root_key(&self.client, &self.base).await {
                Ok(k) => {
                    debug!(target: "ecochain", "root key fetched ({} bytes)", k.len());
                    Some(k)
                }
                Err(e) => {
                    warn!(target: "ecochain", "failed to fetch root key: {}", e);
                    None
                }
            }
        } else {
            None
        };
        info!(target: "ecochain", "actor bound: principal={} canister={} host={}", identity.principal(), self.canister_id, self.base);
        HttpActor {
            base: self.base.clone(),
            canister_id: self.canister_id.clone(),
            client: self.client.clone(),
            principal: identity.principal().clone(),
            root_key,
        }
    }
}

#[async_trait]
impl ActorFactory for HttpActorFactory {
    async fn build(&self, identity: &Identity) -> Result<Arc<dyn BackendActor>, ClientError> {
        Ok(Arc::new(self.build_http(identity).await))
    }
}
