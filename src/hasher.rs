use sha2::{Digest, Sha256};

use crate::models::{Column, Transaction};

/// Deterministic content digest of a record, used as its deduplication key.
///
/// Hashes the canonical string form of the immutable columns in their fixed
/// order, so the same transaction always maps to the same 32-hex-char id while
/// any differing field value changes it. Collision resistance against crafted
/// input is not a goal here, only stable dedup of naturally recurring rows.
pub fn content_id(tx: &Transaction) -> String {
    let mut hasher = Sha256::new();
    for column in Column::IMMUTABLE {
        hasher.update(tx.canonical_value(column).as_bytes());
        // field separator, keeps ("ab", "c") apart from ("a", "bc")
        hasher.update([0x1f]);
    }
    hex::encode(&hasher.finalize()[..16])
}
