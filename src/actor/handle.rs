use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::contract::BackendActor;
use crate::error::ClientError;
use crate::identity::{Identity, Principal};

/// Constructs actors bound to an identity.
#[async_trait]
pub trait ActorFactory: Send + Sync {
    async fn build(&self, identity: &Identity) -> Result<Arc<dyn BackendActor>, ClientError>;
}

/// Owned, injectable actor cache: at most one live actor, bound to one principal.
///
/// The lock is held across construction, so concurrent first use builds a
/// single actor. Asking for a different principal rebinds.
pub struct ActorHandle {
    factory: Arc<dyn ActorFactory>,
    cached: Mutex<Option<(Principal, Arc<dyn BackendActor>)>>,
}

impl ActorHandle {
    pub fn new(factory: Arc<dyn ActorFactory>) -> Self {
        Self { factory, cached: Mutex::new(None) }
    }

    pub async fn get(&self, identity: &Identity) -> Result<Arc<dyn BackendActor>, ClientError> {
        let mut slot = self.cached.lock().await;
        if let Some((bound, actor)) = slot.as_ref() {
            if bound == identity.principal() {
                return Ok(actor.clone());
            }
            debug!(target: "ecochain", "rebinding actor from {} to {}", bound, identity.principal());
        }
        let actor = self.factory.build(identity).await?;
        *slot = Some((identity.principal().clone(), actor.clone()));
        Ok(actor)
    }

    /// Drop the cached actor; the next `get` builds a fresh one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
