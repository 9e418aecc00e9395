//! Remote call contract of the EcoChain backend service and its wire types.
//!
//! Variants cross the wire in the backend's tagged form, one key per value:
//! `{"Validator": null}`, `{"Ok": null}`, `{"Err": "reason"}`.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::RemoteCallError;
use crate::identity::{Principal, Role};

/// Pull the tag out of a tagged value. Bare strings are accepted as a tag
/// with no payload.
fn single_tag(v: &JsonValue) -> Option<(&str, &JsonValue)> {
    match v {
        JsonValue::Object(m) if m.len() == 1 => m.iter().next().map(|(k, v)| (k.as_str(), v)),
        JsonValue::String(s) => Some((s.as_str(), &JsonValue::Null)),
        _ => None,
    }
}

fn tagged_unit(tag: &str) -> JsonValue {
    let mut m = serde_json::Map::new();
    m.insert(tag.to_string(), JsonValue::Null);
    JsonValue::Object(m)
}

/// Remote role representation. `Unknown` absorbs absent or unrecognized tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTag {
    User,
    Validator,
    Admin,
    Unknown,
}

impl RoleTag {
    pub fn from_json(v: &JsonValue) -> Self {
        match single_tag(v).map(|(t, _)| t) {
            Some("User") => RoleTag::User,
            Some("Validator") => RoleTag::Validator,
            Some("Admin") => RoleTag::Admin,
            _ => RoleTag::Unknown,
        }
    }
}

/// Total mapping to the local enum. Unrecognized tags resolve to `User`, the
/// least-privileged role; this is a default, not an error.
impl From<RoleTag> for Role {
    fn from(tag: RoleTag) -> Self {
        match tag {
            RoleTag::User | RoleTag::Unknown => Role::User,
            RoleTag::Validator => Role::Validator,
            RoleTag::Admin => Role::Admin,
        }
    }
}

impl From<Role> for RoleTag {
    fn from(role: Role) -> Self {
        match role {
            Role::User => RoleTag::User,
            Role::Validator => RoleTag::Validator,
            Role::Admin => RoleTag::Admin,
        }
    }
}

impl Serialize for RoleTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tag = match self {
            RoleTag::User | RoleTag::Unknown => "User",
            RoleTag::Validator => "Validator",
            RoleTag::Admin => "Admin",
        };
        tagged_unit(tag).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RoleTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(RoleTag::from_json(&JsonValue::deserialize(deserializer)?))
    }
}

/// Reply of a write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Ok,
    Err(String),
}

impl WriteResult {
    /// Null counts as success: older backends return unit from write calls.
    pub fn from_json(v: &JsonValue) -> Result<Self, String> {
        if v.is_null() {
            return Ok(WriteResult::Ok);
        }
        match single_tag(v) {
            Some(("Ok", _)) => Ok(WriteResult::Ok),
            Some(("Err", JsonValue::String(msg))) => Ok(WriteResult::Err(msg.clone())),
            Some(("Err", other)) => Ok(WriteResult::Err(other.to_string())),
            _ => Err(format!("unexpected write reply: {}", v)),
        }
    }
}

impl<'de> Deserialize<'de> for WriteResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = JsonValue::deserialize(deserializer)?;
        WriteResult::from_json(&v).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    Pending,
    Validated,
    Rejected,
}

impl DataStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DataStatus::Pending => "Pending",
            DataStatus::Validated => "Validated",
            DataStatus::Rejected => "Rejected",
        }
    }
}

impl Serialize for DataStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        tagged_unit(self.as_str()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = JsonValue::deserialize(deserializer)?;
        match single_tag(&v).map(|(t, _)| t) {
            Some("Pending") => Ok(DataStatus::Pending),
            Some("Validated") => Ok(DataStatus::Validated),
            Some("Rejected") => Ok(DataStatus::Rejected),
            _ => Err(serde::de::Error::custom(format!("unknown data status: {}", v))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub id: u64,
    pub content: String,
    pub submitted_by: String,
    pub status: DataStatus,
    #[serde(default)]
    pub votes_for: u64,
    #[serde(default)]
    pub votes_against: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub votes_for: Option<u64>,
    #[serde(default)]
    pub votes_against: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub role: RoleTag,
    #[serde(default)]
    pub submissions: u64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub wallet_address: String,
}

/// Typed proxy for one backend service, bound to one caller identity.
/// Every method is a single network round trip.
#[async_trait]
pub trait BackendActor: Send + Sync {
    /// Caller the handle signs as.
    fn principal(&self) -> &Principal;

    async fn is_user_registered(&self) -> Result<bool, RemoteCallError>;
    async fn get_user_role(&self) -> Result<RoleTag, RemoteCallError>;
    async fn register_user_with_role(&self, role: RoleTag) -> Result<WriteResult, RemoteCallError>;
    async fn create_first_admin(&self) -> Result<WriteResult, RemoteCallError>;
    async fn promote_user_role(&self, principal: &str, role: RoleTag) -> Result<WriteResult, RemoteCallError>;

    async fn submit_data(&self, content: &str) -> Result<JsonValue, RemoteCallError>;
    async fn get_pending_data(&self) -> Result<Vec<DataEntry>, RemoteCallError>;
    async fn vote_on_data(&self, id: u64, approve: bool) -> Result<JsonValue, RemoteCallError>;
    async fn get_validated_data(&self) -> Result<Vec<DataEntry>, RemoteCallError>;
    async fn get_proposals(&self) -> Result<Vec<Proposal>, RemoteCallError>;
    async fn create_proposal(&self, title: &str, description: &str) -> Result<JsonValue, RemoteCallError>;

    async fn get_user_profile(&self) -> Result<Option<UserProfile>, RemoteCallError>;
    async fn get_wallet_address(&self) -> Result<String, RemoteCallError>;
    async fn reward_contributors(&self) -> Result<JsonValue, RemoteCallError>;
    async fn delete_data(&self, id: u64) -> Result<JsonValue, RemoteCallError>;
}
