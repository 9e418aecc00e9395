//! Authenticated data, voting and governance calls.
//!
//! Thin wrappers: each resolves the current identity, reuses the shared actor
//! and logs failures before returning them. Only `promote_user_role` folds its
//! outcome into an `OpResult` and a session notification, since it is a
//! write that presentation renders directly.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{error, info};

use crate::actor::{ActorHandle, BackendActor, DataEntry, Proposal, RoleTag, UserProfile, WriteResult};
use crate::error::{ClientError, ClientResult, OpResult, RemoteCallError};
use crate::identity::{IdentityProvider, Principal, Role};
use crate::session::{NotificationLevel, SessionStore};

#[derive(Clone)]
pub struct DataService {
    provider: Arc<dyn IdentityProvider>,
    actors: Arc<ActorHandle>,
    store: Arc<SessionStore>,
}

impl DataService {
    pub fn new(provider: Arc<dyn IdentityProvider>, actors: Arc<ActorHandle>, store: Arc<SessionStore>) -> Self {
        Self { provider, actors, store }
    }

    async fn authenticated_actor(&self) -> ClientResult<Arc<dyn BackendActor>> {
        if !self.provider.is_authenticated().await {
            error!(target: "ecochain", "authentication required");
            return Err(ClientError::AuthRequired);
        }
        let identity = self.provider.identity().await.map_err(|_| ClientError::AuthRequired)?;
        if identity.is_expired(Utc::now()) {
            error!(target: "ecochain", "credential for {} has expired", identity.principal());
            return Err(ClientError::AuthRequired);
        }
        self.actors.get(&identity).await
    }

    fn failed(what: &str, err: RemoteCallError) -> ClientError {
        error!(target: "ecochain", "error {}: {}", what, err);
        err.into()
    }

    pub async fn submit_data(&self, content: &str) -> ClientResult<JsonValue> {
        let actor = self.authenticated_actor().await?;
        actor.submit_data(content).await.map_err(|e| Self::failed("submitting data", e))
    }

    pub async fn get_pending_data(&self) -> ClientResult<Vec<DataEntry>> {
        let actor = self.authenticated_actor().await?;
        actor.get_pending_data().await.map_err(|e| Self::failed("getting pending data", e))
    }

    pub async fn vote_on_data(&self, id: u64, approve: bool) -> ClientResult<JsonValue> {
        let actor = self.authenticated_actor().await?;
        actor.vote_on_data(id, approve).await.map_err(|e| Self::failed("voting on data", e))
    }

    pub async fn get_validated_data(&self) -> ClientResult<Vec<DataEntry>> {
        let actor = self.authenticated_actor().await?;
        actor.get_validated_data().await.map_err(|e| Self::failed("getting validated data", e))
    }

    pub async fn get_proposals(&self) -> ClientResult<Vec<Proposal>> {
        let actor = self.authenticated_actor().await?;
        actor.get_proposals().await.map_err(|e| Self::failed("getting proposals", e))
    }

    pub async fn create_proposal(&self, title: &str, description: &str) -> ClientResult<JsonValue> {
        let actor = self.authenticated_actor().await?;
        actor.create_proposal(title, description).await.map_err(|e| Self::failed("creating proposal", e))
    }

    pub async fn get_user_profile(&self) -> ClientResult<Option<UserProfile>> {
        let actor = self.authenticated_actor().await?;
        actor.get_user_profile().await.map_err(|e| Self::failed("getting user profile", e))
    }

    pub async fn get_wallet_address(&self) -> ClientResult<String> {
        let actor = self.authenticated_actor().await?;
        actor.get_wallet_address().await.map_err(|e| Self::failed("getting wallet address", e))
    }

    pub async fn reward_contributors(&self) -> ClientResult<JsonValue> {
        let actor = self.authenticated_actor().await?;
        actor.reward_contributors().await.map_err(|e| Self::failed("rewarding contributors", e))
    }

    pub async fn delete_data(&self, id: u64) -> ClientResult<JsonValue> {
        let actor = self.authenticated_actor().await?;
        actor.delete_data(id).await.map_err(|e| Self::failed("deleting data", e))
    }

    /// Assign `role` to another user. The target must be a well-formed principal
    /// and must not be the caller; both are checked before any remote call.
    /// Every outcome is also pushed as a session notification.
    pub async fn promote_user_role(&self, target: &str, role: Role) -> OpResult {
        let out = self.try_promote(target, role).await;
        match &out.error {
            None => self.store.notify(NotificationLevel::Success, format!("Assigned role {} to {}", role, target)),
            Some(msg) => self.store.notify(NotificationLevel::Error, format!("Role assignment failed: {}", msg)),
        }
        out
    }

    async fn try_promote(&self, target: &str, role: Role) -> OpResult {
        let target = match Principal::from_text(target) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        let actor = match self.authenticated_actor().await {
            Ok(a) => a,
            Err(e) => return e.into(),
        };
        if actor.principal() == &target {
            return OpResult::failed("cannot change your own role");
        }
        match actor.promote_user_role(&target.to_text(), RoleTag::from(role)).await {
            Ok(WriteResult::Ok) => {
                info!(target: "ecochain", "assigned role {} to {}", role, target);
                OpResult::ok()
            }
            Ok(WriteResult::Err(msg)) => OpResult::failed(msg),
            Err(e) => {
                error!(target: "ecochain", "error promoting user role: {}", e);
                OpResult::failed(e.to_string())
            }
        }
    }
}
