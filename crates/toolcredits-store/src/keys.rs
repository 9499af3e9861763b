//! Key encoding utilities.
//!
//! User-scoped keys are `user_id || 0x00 || suffix`. User ids never contain
//! control characters, so the NUL separator keeps one user's prefix from
//! matching another user whose id merely starts with the same bytes.

use toolcredits_core::{LedgerEntryId, PurchaseId, ToolKey, UsageId, UserId};

use crate::error::{Result, StoreError};

const SEPARATOR: u8 = 0x00;

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create the prefix shared by every key scoped to a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.as_bytes().len() + 1);
    key.extend_from_slice(user_id.as_bytes());
    key.push(SEPARATOR);
    key
}

fn user_scoped_key(user_id: &UserId, suffix: &[u8]) -> Vec<u8> {
    let mut key = user_prefix(user_id);
    key.extend_from_slice(suffix);
    key
}

/// Create a ledger entry key.
///
/// Format: `user_id || 0x00 || entry_id (16 bytes)`. Entry ids are
/// time-ordered, so a user's entries sort oldest to newest.
#[must_use]
pub fn ledger_entry_key(user_id: &UserId, entry_id: &LedgerEntryId) -> Vec<u8> {
    user_scoped_key(user_id, &entry_id.to_bytes())
}

/// Create a usage record key from a usage ID.
#[must_use]
pub fn usage_key(usage_id: &UsageId) -> Vec<u8> {
    usage_id.to_bytes().to_vec()
}

/// Create a user-usage index key.
#[must_use]
pub fn user_usage_key(user_id: &UserId, usage_id: &UsageId) -> Vec<u8> {
    user_scoped_key(user_id, &usage_id.to_bytes())
}

/// Create a user-purchase index key.
#[must_use]
pub fn user_purchase_key(user_id: &UserId, purchase_id: &PurchaseId) -> Vec<u8> {
    user_scoped_key(user_id, &purchase_id.to_bytes())
}

/// Create an idempotency record key.
#[must_use]
pub fn idempotency_key(user_id: &UserId, key: &str) -> Vec<u8> {
    user_scoped_key(user_id, key.as_bytes())
}

/// Create a pricing key from a tool key.
#[must_use]
pub fn pricing_key(tool_key: &ToolKey) -> Vec<u8> {
    tool_key.as_bytes().to_vec()
}

/// Create a purchase key from a processor session id.
#[must_use]
pub fn purchase_key(session_id: &str) -> Vec<u8> {
    session_id.as_bytes().to_vec()
}

/// Create a payment-event marker key from a processor event id.
#[must_use]
pub fn payment_event_key(event_id: &str) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}

/// Extract the 16-byte ULID that follows `prefix` in an index key.
///
/// # Errors
///
/// Returns `StoreError::CorruptKey` if the key is not `prefix || 16 bytes`.
pub fn trailing_id(key: &[u8], prefix: &[u8]) -> Result<[u8; 16]> {
    key.strip_prefix(prefix)
        .and_then(|rest| <[u8; 16]>::try_from(rest).ok())
        .ok_or_else(|| StoreError::CorruptKey(format!("unexpected index key length {}", key.len())))
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` if no such key exists (the prefix is all `0xFF`).
#[must_use]
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn user_scoped_key_format() {
        let user_id = user("alice");
        let entry_id = LedgerEntryId::generate();
        let key = ledger_entry_key(&user_id, &entry_id);

        assert_eq!(key.len(), 5 + 1 + 16);
        assert_eq!(&key[..5], b"alice");
        assert_eq!(key[5], 0);
        assert_eq!(&key[6..], entry_id.to_bytes());
    }

    #[test]
    fn prefixes_do_not_overlap_between_users() {
        let short = user_prefix(&user("bob"));
        let long = user_usage_key(&user("bobby"), &UsageId::generate());
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn trailing_id_roundtrip() {
        let user_id = user("carol");
        let usage_id = UsageId::generate();
        let key = user_usage_key(&user_id, &usage_id);

        let extracted = trailing_id(&key, &user_prefix(&user_id)).unwrap();
        assert_eq!(UsageId::from_bytes(extracted), usage_id);
    }

    #[test]
    fn trailing_id_rejects_short_keys() {
        let prefix = user_prefix(&user("dave"));
        let mut key = prefix.clone();
        key.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            trailing_id(&key, &prefix),
            Err(StoreError::CorruptKey(_))
        ));
    }

    #[test]
    fn upper_bound_of_user_prefix() {
        let prefix = user_prefix(&user("erin"));
        let bound = prefix_upper_bound(&prefix).unwrap();
        assert_eq!(bound, b"erin\x01".to_vec());
        assert_eq!(prefix_upper_bound(&[0x10, 0xFF]), Some(vec![0x11]));
        assert_eq!(prefix_upper_bound(&[0xFF, 0xFF]), None);
    }
}
