//! Persisted subset of the session.
//!
//! The on-disk schema is versioned separately from `Session`; every field
//! defaults so snapshots written by older or newer builds restore safely.
//! `is_loading` is never written.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::state::{Notification, Session};
use crate::error::PersistError;
use crate::identity::{Principal, Role};

pub const PERSISTED_VERSION: u32 = 1;

fn current_version() -> u32 { PERSISTED_VERSION }

/// Unknown role names restore as "no role" instead of failing the whole snapshot.
fn lenient_role<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Role>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub needs_role_selection: bool,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl Default for PersistedSession {
    fn default() -> Self { Self::from_session(&Session::default()) }
}

impl PersistedSession {
    pub fn from_session(s: &Session) -> Self {
        Self {
            version: PERSISTED_VERSION,
            principal: s.principal.as_ref().map(|p| p.to_text()),
            role: s.role,
            is_authenticated: s.is_authenticated,
            needs_role_selection: s.needs_role_selection,
            notifications: s.notifications.clone(),
        }
    }

    /// Rebuild a session. Transient flags start from their defaults and the
    /// result is normalized, so a damaged snapshot degrades to signed-out.
    pub fn into_session(self) -> Session {
        let principal = self.principal.as_deref().and_then(|t| match Principal::from_text(t) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(target: "ecochain", "discarding persisted principal: {}", e);
                None
            }
        });
        Session {
            principal,
            role: self.role,
            is_authenticated: self.is_authenticated,
            is_loading: false,
            needs_role_selection: self.needs_role_selection,
            notifications: self.notifications,
        }
        .normalized()
    }
}

/// Storage for the persisted session snapshot.
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>, PersistError>;
    fn save(&self, snapshot: &PersistedSession) -> Result<(), PersistError>;
}

/// JSON file, replaced atomically through a sibling temp file.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }
}

impl SessionPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<PersistedSession>, PersistError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, snapshot: &PersistedSession) -> Result<(), PersistError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryPersistence {
    pub fn new() -> Self { Self::default() }
    pub fn snapshot(&self) -> Option<PersistedSession> { self.slot.lock().clone() }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<PersistedSession>, PersistError> { Ok(self.slot.lock().clone()) }

    fn save(&self, snapshot: &PersistedSession) -> Result<(), PersistError> {
        *self.slot.lock() = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default() {
        let p: PersistedSession = serde_json::from_value(json!({"principal": "2vxsx-fae", "is_authenticated": true, "role": "Validator"})).unwrap();
        assert_eq!(p.version, PERSISTED_VERSION);
        assert!(p.notifications.is_empty());
        let s = p.into_session();
        assert_eq!(s.role, Some(Role::Validator));
        assert!(s.holds_invariants());
    }

    #[test]
    fn unknown_role_and_bad_principal_degrade() {
        let p: PersistedSession = serde_json::from_value(json!({
            "version": 9, "principal": "2vxsx-fae", "is_authenticated": true, "role": "Overlord", "extra": 1
        }))
        .unwrap();
        let s = p.into_session();
        assert_eq!(s.role, None);
        assert!(s.needs_role_selection);

        let p: PersistedSession = serde_json::from_value(json!({"principal": "zzzz", "is_authenticated": true, "role": "User"})).unwrap();
        assert!(p.into_session().is_signed_out());
    }

    #[test]
    fn file_persistence_missing_then_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let fp = JsonFilePersistence::new(tmp.path().join("nested").join("session.json"));
        assert!(fp.load().unwrap().is_none());
        let snap = PersistedSession { principal: Some("2vxsx-fae".into()), role: Some(Role::Admin), is_authenticated: true, ..Default::default() };
        fp.save(&snap).unwrap();
        assert_eq!(fp.load().unwrap(), Some(snap));
        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(fp.path()).unwrap()).unwrap();
        assert!(raw.get("is_loading").is_none());
    }
}
