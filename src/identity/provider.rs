use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;

use super::principal::Principal;
use crate::error::ProviderError;

/// Credential handed out by an identity provider. Opaque to callers apart from
/// its principal and expiry.
#[derive(Clone)]
pub struct Identity {
    principal: Principal,
    expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(public_key: Vec<u8>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { principal: Principal::self_authenticating(&public_key), expires_at }
    }

    pub fn principal(&self) -> &Principal { &self.principal }
    pub fn expires_at(&self) -> Option<DateTime<Utc>> { self.expires_at }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("principal", &self.principal.to_text())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub identity_provider_url: Url,
    pub max_time_to_live: Duration,
}

/// Delegated-authentication client.
///
/// `login` may block on a user for minutes. It resolves without a value;
/// callers re-read `identity()` afterwards.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn is_authenticated(&self) -> bool;
    async fn identity(&self) -> Result<Identity, ProviderError>;
    async fn login(&self, opts: &LoginOptions) -> Result<(), ProviderError>;
    /// Invalidate the credential. Calling it while logged out is a no-op.
    async fn logout(&self) -> Result<(), ProviderError>;
}

/// User-facing half of an interactive login: shows where to authenticate and
/// reports whether the user completed it.
#[async_trait]
pub trait LoginPrompt: Send + Sync {
    async fn confirm(&self, opts: &LoginOptions) -> Result<bool, ProviderError>;
}

/// Prompt that accepts without asking; used for non-interactive runs.
pub struct AutoApprove;

#[async_trait]
impl LoginPrompt for AutoApprove {
    async fn confirm(&self, _opts: &LoginOptions) -> Result<bool, ProviderError> { Ok(true) }
}
