use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ClientError;

/// Stable textual identifier for a caller, backed by `candid::Principal`.
/// Serializes as its canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal(candid::Principal);

impl Principal {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ClientError> {
        candid::Principal::try_from_slice(bytes)
            .map(Self)
            .map_err(|e| ClientError::InvalidPrincipal(format!("{} bytes: {}", bytes.len(), e)))
    }

    /// Principal owned by a key: sha224(public key) followed by the self-authenticating tag.
    pub fn self_authenticating(public_key: &[u8]) -> Self {
        Self(candid::Principal::self_authenticating(public_key))
    }

    pub fn anonymous() -> Self { Self(candid::Principal::anonymous()) }

    /// Parse the dash-grouped text form. The checksum and the canonical
    /// grouping are both checked.
    pub fn from_text(text: &str) -> Result<Self, ClientError> {
        candid::Principal::from_text(text.trim())
            .map(Self)
            .map_err(|e| ClientError::InvalidPrincipal(format!("{}: {}", text, e)))
    }

    pub fn as_slice(&self) -> &[u8] { self.0.as_slice() }
    pub fn to_text(&self) -> String { self.0.to_text() }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0.to_text()) }
}

impl std::str::FromStr for Principal {
    type Err = ClientError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Principal::from_text(s) }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_text())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Principal::from_text(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_principals() {
        assert_eq!(Principal::from_slice(&[]).unwrap().to_text(), "aaaaa-aa");
        assert_eq!(Principal::anonymous().to_text(), "2vxsx-fae");
        assert_eq!(Principal::from_text("2vxsx-fae").unwrap(), Principal::anonymous());
        assert!(Principal::from_slice(&[0u8; 30]).is_err());
    }

    #[test]
    fn self_authenticating_is_stable_and_tagged() {
        let a = Principal::self_authenticating(b"public-key-material");
        let b = Principal::self_authenticating(b"public-key-material");
        assert_eq!(a, b);
        assert_eq!(a.as_slice().len(), 29);
        assert_eq!(*a.as_slice().last().unwrap(), 0x02);
        let parsed = Principal::from_text(&a.to_text()).unwrap();
        assert_eq!(parsed, a);
        assert_ne!(a, Principal::self_authenticating(b"other-key"));
    }

    #[test]
    fn rejects_bad_checksum_and_garbage() {
        // flip one character of a valid principal
        let good = Principal::self_authenticating(b"k").to_text();
        let mut chars: Vec<char> = good.chars().collect();
        chars[0] = if chars[0] == 'a' { 'b' } else { 'a' };
        let bad: String = chars.into_iter().collect();
        assert!(Principal::from_text(&bad).is_err());
        assert!(Principal::from_text("not a principal!").is_err());
        assert!(Principal::from_text("").is_err());
        // right bytes, wrong grouping
        assert!(Principal::from_text("2vxsxfae").is_err());
    }

    #[test]
    fn serde_uses_text_form() {
        let p = Principal::anonymous();
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v, serde_json::json!("2vxsx-fae"));
        let back: Principal = serde_json::from_value(v).unwrap();
        assert_eq!(back, p);
    }
}
