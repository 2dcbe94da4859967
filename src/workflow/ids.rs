/// Registry identifiers
///
/// `S` followed by 26 Crockford base32 characters of a v7 UUID: the leading
/// 48 bits are a millisecond timestamp, so ids sort lexicographically by
/// creation time, and the random tail keeps concurrent registrations apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator marking a string as a registry id
pub const ID_PREFIX: char = 'S';

/// Total length of a valid id
pub const ID_LEN: usize = 27;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryId(String);

impl RegistryId {
    /// Mint a fresh time-ordered id
    pub fn generate() -> Self {
        let mut value = Uuid::now_v7().as_u128();
        let mut encoded = [0u8; ID_LEN - 1];
        for slot in encoded.iter_mut().rev() {
            *slot = CROCKFORD[(value & 0x1f) as usize];
            value >>= 5;
        }

        let mut id = String::with_capacity(ID_LEN);
        id.push(ID_PREFIX);
        id.extend(encoded.iter().map(|b| *b as char));
        Self(id)
    }

    /// Accept a caller-supplied id if it passes the shape check
    pub fn parse(raw: &str) -> Option<Self> {
        is_valid(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fixed length and discriminator prefix
pub fn is_valid(raw: &str) -> bool {
    raw.len() == ID_LEN && raw.starts_with(ID_PREFIX)
}

impl std::fmt::Display for RegistryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for RegistryId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
