//! Environment-driven client configuration.
//!
//! Variables (all optional unless noted):
//! - `ECOCHAIN_MODE`: `production` selects mainnet defaults and skips the
//!   root-key trust bootstrap; anything else is treated as a local replica.
//! - `ECOCHAIN_HOST`: backend endpoint override. A path prefix (a replica
//!   behind a proxy at `/ic/`) is kept; API paths are joined beneath it.
//! - `ECOCHAIN_CANISTER_ID`: backend service identifier (required for remote calls).
//! - `ECOCHAIN_IDENTITY_PROVIDER`: delegated-auth URL override.
//! - `ECOCHAIN_II_CANISTER_ID`: identity canister on the local replica.
//! - `ECOCHAIN_STATE_DIR`: where `session.json` and `identity.json` live (default `.ecochain`).
//! - `ECOCHAIN_REQUEST_TIMEOUT_SECS`: per-request HTTP timeout (default 120).

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const PRODUCTION_HOST: &str = "https://ic0.app";
pub const LOCAL_HOST: &str = "http://localhost:4943";
pub const PRODUCTION_IDENTITY_PROVIDER: &str = "https://identity.ic0.app";

pub const SESSION_FILE: &str = "session.json";
pub const IDENTITY_FILE: &str = "identity.json";

/// Interactive login delegations live for seven days.
pub const LOGIN_MAX_TIME_TO_LIVE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Parse an endpoint URL so that relative joins land beneath its path:
/// `http://h/ic` and `http://h/ic/` both become `http://h/ic/`.
pub fn parse_host(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|_| ConfigError::Invalid { var: "ECOCHAIN_HOST", value: raw.to_string() })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Production,
    Local,
}

impl BuildMode {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("production") { BuildMode::Production } else { BuildMode::Local }
    }

    pub fn default_host(self) -> &'static str {
        match self {
            BuildMode::Production => PRODUCTION_HOST,
            BuildMode::Local => LOCAL_HOST,
        }
    }

    /// Non-production endpoints need the replica's root key before responses can be trusted.
    pub fn needs_trust_bootstrap(self) -> bool { self == BuildMode::Local }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub mode: BuildMode,
    pub host: Url,
    pub canister_id: Option<String>,
    pub identity_provider: Url,
    pub state_dir: PathBuf,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = lookup("ECOCHAIN_MODE").map(|m| BuildMode::parse(&m)).unwrap_or(BuildMode::Local);

        let host_raw = lookup("ECOCHAIN_HOST").unwrap_or_else(|| mode.default_host().to_string());
        let host = parse_host(&host_raw)?;

        let canister_id = lookup("ECOCHAIN_CANISTER_ID").filter(|s| !s.trim().is_empty());

        let idp_raw = match lookup("ECOCHAIN_IDENTITY_PROVIDER") {
            Some(v) => v,
            None => match mode {
                BuildMode::Production => PRODUCTION_IDENTITY_PROVIDER.to_string(),
                BuildMode::Local => {
                    let ii = lookup("ECOCHAIN_II_CANISTER_ID").unwrap_or_default();
                    format!("{}?canisterId={}", LOCAL_HOST, urlencoding::encode(&ii))
                }
            },
        };
        let identity_provider = Url::parse(&idp_raw)
            .map_err(|_| ConfigError::Invalid { var: "ECOCHAIN_IDENTITY_PROVIDER", value: idp_raw.clone() })?;

        let state_dir = lookup("ECOCHAIN_STATE_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".ecochain"));

        let request_timeout = match lookup("ECOCHAIN_REQUEST_TIMEOUT_SECS") {
            Some(v) => {
                let secs: u64 = v
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid { var: "ECOCHAIN_REQUEST_TIMEOUT_SECS", value: v.clone() })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(120),
        };

        Ok(Self { mode, host, canister_id, identity_provider, state_dir, request_timeout })
    }

    pub fn require_canister_id(&self) -> Result<&str, ConfigError> {
        self.canister_id.as_deref().ok_or(ConfigError::Missing("ECOCHAIN_CANISTER_ID"))
    }

    pub fn session_path(&self) -> PathBuf { self.state_dir.join(SESSION_FILE) }
    pub fn identity_path(&self) -> PathBuf { self.state_dir.join(IDENTITY_FILE) }
}
