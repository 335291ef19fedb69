//! Key encoding utilities for `RocksDB`.
//!
//! Entry and transition ids are ULIDs, so `org_id || id` composite keys
//! sort chronologically within an organization's prefix.

use tally_core::{EntryId, OrgId, TransitionId};

/// Create an organization key from an org id.
#[must_use]
pub fn org_key(org_id: &OrgId) -> Vec<u8> {
    org_id.as_bytes().to_vec()
}

/// Create an entry key from an entry id.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create an org-entry index key.
///
/// Format: `org_id (16 bytes) || entry_id (16 bytes)`.
#[must_use]
pub fn org_entry_key(org_id: &OrgId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(org_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all of an organization's index keys.
#[must_use]
pub fn org_prefix(org_id: &OrgId) -> Vec<u8> {
    org_id.as_bytes().to_vec()
}

/// Extract the entry id from an org-entry index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create an idempotency receipt key.
///
/// Format: `org_id (16 bytes) || request_id (UTF-8 bytes)`. Request ids
/// are caller-chosen strings, scoped per organization by the prefix.
#[must_use]
pub fn receipt_key(org_id: &OrgId, request_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + request_id.len());
    key.extend_from_slice(org_id.as_bytes());
    key.extend_from_slice(request_id.as_bytes());
    key
}

/// Create a usage rate key from a feature type.
#[must_use]
pub fn rate_key(feature_type: &str) -> Vec<u8> {
    feature_type.as_bytes().to_vec()
}

/// Create a transition key from a transition id.
#[must_use]
pub fn transition_key(transition_id: &TransitionId) -> Vec<u8> {
    transition_id.to_bytes().to_vec()
}

/// Create an org-transition index key.
///
/// Format: `org_id (16 bytes) || transition_id (16 bytes)`.
#[must_use]
pub fn org_transition_key(org_id: &OrgId, transition_id: &TransitionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(org_id.as_bytes());
    key.extend_from_slice(&transition_id.to_bytes());
    key
}

/// Extract the transition id from an org-transition index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_transition_id(key: &[u8]) -> TransitionId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    TransitionId::from_bytes(bytes).expect("valid ULID bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_key_length() {
        let org_id = OrgId::generate();
        assert_eq!(org_key(&org_id).len(), 16);
    }

    #[test]
    fn org_entry_key_format() {
        let org_id = OrgId::generate();
        let entry_id = EntryId::generate();
        let key = org_entry_key(&org_id, &entry_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], org_id.as_bytes());
        assert_eq!(&key[16..], entry_id.to_bytes());
    }

    #[test]
    fn extract_entry_id_roundtrip() {
        let org_id = OrgId::generate();
        let entry_id = EntryId::generate();
        let key = org_entry_key(&org_id, &entry_id);

        assert_eq!(extract_entry_id(&key), entry_id);
    }

    #[test]
    fn receipt_key_scopes_by_org() {
        let a = OrgId::generate();
        let b = OrgId::generate();
        assert_ne!(receipt_key(&a, "req-1"), receipt_key(&b, "req-1"));
        assert_eq!(receipt_key(&a, "req-1"), receipt_key(&a, "req-1"));
    }

    #[test]
    fn extract_transition_id_roundtrip() {
        let org_id = OrgId::generate();
        let transition_id = TransitionId::generate();
        let key = org_transition_key(&org_id, &transition_id);

        assert_eq!(extract_transition_id(&key), transition_id);
    }
}
