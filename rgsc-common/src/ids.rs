//! Identifier generation

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Generate a new UUIDv4 (session ids)
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Fields that identify a play for duplicate detection
pub struct ScoreIdentity<'a> {
    pub user_id: i64,
    pub chart_id: &'a str,
    pub score: f64,
    pub lamp: &'a str,
    pub optional: &'a BTreeMap<String, f64>,
    pub time_achieved: Option<i64>,
}

/// Content-derived score id: the same play imported twice gets the same id
pub fn score_id(identity: &ScoreIdentity<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.user_id.to_le_bytes());
    hasher.update(identity.chart_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(identity.score.to_bits().to_le_bytes());
    hasher.update(identity.lamp.as_bytes());
    hasher.update([0u8]);
    for (name, value) in identity.optional {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.to_bits().to_le_bytes());
    }
    match identity.time_achieved {
        Some(t) => {
            hasher.update([1u8]);
            hasher.update(t.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }

    let hash_bytes = hasher.finalize();
    format!("R{:x}", hash_bytes)
}
