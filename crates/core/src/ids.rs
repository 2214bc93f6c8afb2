use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Store-assigned row identity. Zero means "not yet assigned".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub const UNASSIGNED: Self = Self(0);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl From<i64> for RecordId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag for a capture whose animal carries no physical identifier,
/// e.g. `ANIMAL_3F9A01C2`.
pub fn generate_animal_id() -> String {
    // The leading hex digits of a v7 UUID are the timestamp; take the random tail.
    let hex = Uuid::now_v7().simple().to_string();
    format!("ANIMAL_{}", hex[hex.len() - 8..].to_uppercase())
}
