//! Unified client error model.
//! Library code returns `ClientResult<T>`; binaries wrap it in `anyhow` at the edge.
//! Bootstrap paths convert most of these into a safe session state instead of
//! returning them (see `bootstrap`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("login cancelled")]
    Cancelled,
    #[error("login failed: {0}")]
    Failed(String),
}

/// A remote call that did not produce a usable reply: transport error,
/// non-success status, an explicit reject, or an undecodable body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("remote call {method} failed: {cause}")]
pub struct RemoteCallError {
    pub method: String,
    pub cause: String,
}

impl RemoteCallError {
    pub fn new<M: Into<String>, C: ToString>(method: M, cause: C) -> Self {
        Self { method: method.into(), cause: cause.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("session state io: {0}")]
    Io(#[from] std::io::Error),
    #[error("session state json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
    /// Business-rule rejection returned as `{Err}` by a write call.
    #[error("registration rejected: {0}")]
    Registration(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("authentication required")]
    AuthRequired,
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),
}

impl ClientError {
    /// Stable short code, used in CLI output and notification text.
    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::Provider(ProviderError::Cancelled) => "login_cancelled",
            ClientError::Provider(ProviderError::NotAuthenticated) | ClientError::AuthRequired => "auth_required",
            ClientError::Provider(_) => "provider_error",
            ClientError::Remote(_) => "remote_call_error",
            ClientError::Registration(_) => "registration_error",
            ClientError::Config(_) => "config_error",
            ClientError::Persist(_) => "persist_error",
            ClientError::InvalidPrincipal(_) => "invalid_principal",
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Structured outcome of a write operation, handed to presentation as-is.
/// Failures never advance session state, so a failed operation can be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpResult {
    pub fn ok() -> Self { Self { success: true, error: None } }
    pub fn failed<S: Into<String>>(error: S) -> Self { Self { success: false, error: Some(error.into()) } }
}

impl From<ClientError> for OpResult {
    fn from(err: ClientError) -> Self {
        match err {
            // Business rejections carry the backend text verbatim
            ClientError::Registration(msg) => OpResult::failed(msg),
            other => OpResult::failed(other.to_string()),
        }
    }
}
