//! File-backed identity provider.
//!
//! A successful login stores a delegation `{version, secret, expires_at}` as
//! JSON. The provider session therefore outlives the process and is independent
//! of the persisted session store, which is exactly the case `login()` and
//! `bootstrap_on_start()` have to reconcile.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::provider::{Identity, IdentityProvider, LoginOptions, LoginPrompt};
use crate::error::ProviderError;

const DELEGATION_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Delegation {
    version: u32,
    secret: String,
    expires_at: DateTime<Utc>,
}

impl Delegation {
    fn identity(&self) -> Result<Identity, ProviderError> {
        let secret = base64::engine::general_purpose::STANDARD
            .decode(&self.secret)
            .map_err(|e| ProviderError::Failed(format!("corrupt delegation: {}", e)))?;
        Ok(Identity::new(Sha256::digest(&secret).to_vec(), Some(self.expires_at)))
    }
}

pub struct KeyfileProvider {
    path: PathBuf,
    prompt: Arc<dyn LoginPrompt>,
    current: RwLock<Option<Delegation>>,
}

impl KeyfileProvider {
    /// Open the provider over `path`. Fails with `Unavailable` if the parent
    /// directory cannot be created. An unreadable delegation file is treated
    /// as a logged-out provider.
    pub async fn create(path: impl Into<PathBuf>, prompt: Arc<dyn LoginPrompt>) -> Result<Self, ProviderError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ProviderError::Unavailable(format!("{}: {}", dir.display(), e)))?;
        }
        let current = read_delegation(&path).await;
        Ok(Self { path, prompt, current: RwLock::new(current) })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn live_delegation(&self) -> Option<Delegation> {
        let now = Utc::now();
        self.current.read().as_ref().filter(|d| d.expires_at > now).cloned()
    }
}

async fn read_delegation(path: &Path) -> Option<Delegation> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(target: "ecochain", "identity file {} unreadable: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_slice::<Delegation>(&bytes) {
        Ok(d) if d.version == DELEGATION_VERSION => Some(d),
        Ok(d) => {
            warn!(target: "ecochain", "identity file {} has unsupported version {}", path.display(), d.version);
            None
        }
        Err(e) => {
            warn!(target: "ecochain", "identity file {} corrupt: {}", path.display(), e);
            None
        }
    }
}

async fn write_delegation(path: &Path, d: &Delegation) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(d)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await
}

#[async_trait]
impl IdentityProvider for KeyfileProvider {
    async fn is_authenticated(&self) -> bool {
        self.live_delegation().is_some()
    }

    async fn identity(&self) -> Result<Identity, ProviderError> {
        self.live_delegation().ok_or(ProviderError::NotAuthenticated)?.identity()
    }

    async fn login(&self, opts: &LoginOptions) -> Result<(), ProviderError> {
        info!(target: "ecochain", "login via {}", opts.identity_provider_url);
        if !self.prompt.confirm(opts).await? {
            return Err(ProviderError::Cancelled);
        }
        let mut secret = [0u8; 32];
        getrandom::getrandom(&mut secret).map_err(|e| ProviderError::Failed(e.to_string()))?;
        let ttl = chrono::Duration::from_std(opts.max_time_to_live)
            .map_err(|e| ProviderError::Failed(format!("invalid delegation lifetime: {}", e)))?;
        let delegation = Delegation {
            version: DELEGATION_VERSION,
            secret: base64::engine::general_purpose::STANDARD.encode(secret),
            expires_at: Utc::now() + ttl,
        };
        write_delegation(&self.path, &delegation)
            .await
            .map_err(|e| ProviderError::Failed(format!("write {}: {}", self.path.display(), e)))?;
        debug!(target: "ecochain", "delegation stored, expires_at={}", delegation.expires_at);
        *self.current.write() = Some(delegation);
        Ok(())
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        *self.current.write() = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProviderError::Failed(format!("remove {}: {}", self.path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::provider::AutoApprove;
    use std::time::Duration;

    struct Decline;

    #[async_trait]
    impl LoginPrompt for Decline {
        async fn confirm(&self, _opts: &LoginOptions) -> Result<bool, ProviderError> { Ok(false) }
    }

    fn opts(ttl: Duration) -> LoginOptions {
        LoginOptions { identity_provider_url: reqwest::Url::parse("https://identity.ic0.app").unwrap(), max_time_to_live: ttl }
    }

    #[tokio::test]
    async fn login_persists_across_instances() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state").join("identity.json");
        let p = KeyfileProvider::create(&path, Arc::new(AutoApprove)).await.unwrap();
        assert!(!p.is_authenticated().await);
        assert_eq!(p.identity().await.unwrap_err(), ProviderError::NotAuthenticated);

        p.login(&opts(Duration::from_secs(3600))).await.unwrap();
        let first = p.identity().await.unwrap();

        let reopened = KeyfileProvider::create(&path, Arc::new(AutoApprove)).await.unwrap();
        assert!(reopened.is_authenticated().await);
        assert_eq!(reopened.identity().await.unwrap().principal(), first.principal());
    }

    #[tokio::test]
    async fn declined_prompt_is_cancellation() {
        let tmp = tempfile::tempdir().unwrap();
        let p = KeyfileProvider::create(tmp.path().join("identity.json"), Arc::new(Decline)).await.unwrap();
        assert_eq!(p.login(&opts(Duration::from_secs(60))).await.unwrap_err(), ProviderError::Cancelled);
        assert!(!p.is_authenticated().await);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("identity.json");
        let p = KeyfileProvider::create(&path, Arc::new(AutoApprove)).await.unwrap();
        p.login(&opts(Duration::from_secs(60))).await.unwrap();
        p.logout().await.unwrap();
        p.logout().await.unwrap();
        assert!(!p.is_authenticated().await);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn expired_or_corrupt_delegation_reads_as_logged_out() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("identity.json");
        let stale = Delegation {
            version: DELEGATION_VERSION,
            secret: base64::engine::general_purpose::STANDARD.encode([7u8; 32]),
            expires_at: Utc::now() - chrono::Duration::seconds(5),
        };
        write_delegation(&path, &stale).await.unwrap();
        let p = KeyfileProvider::create(&path, Arc::new(AutoApprove)).await.unwrap();
        assert!(!p.is_authenticated().await);

        tokio::fs::write(&path, b"{not json").await.unwrap();
        let p = KeyfileProvider::create(&path, Arc::new(AutoApprove)).await.unwrap();
        assert!(!p.is_authenticated().await);
    }
}
