//! Identifier types for toolcredits.
//!
//! Two families of identifiers live here:
//!
//! - **External string identifiers** (`UserId`, `ToolKey`) supplied by callers
//!   and validated on parse.
//! - **Time-ordered identifiers** (`UsageId`, `LedgerEntryId`, `PurchaseId`)
//!   minted by the engine. They are ULIDs drawn from a process-wide monotonic
//!   generator, so ids minted later in the same process always sort later,
//!   even within one millisecond.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError};
use ulid::{Generator, Ulid};

/// Maximum length in bytes of a user identifier.
pub const MAX_USER_ID_LEN: usize = 128;

/// Maximum length in bytes of a tool key.
pub const MAX_TOOL_KEY_LEN: usize = 64;

/// Mint the next ULID from the shared monotonic generator.
fn next_ulid() -> Ulid {
    static GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();

    let mut generator = GENERATOR
        .get_or_init(|| Mutex::new(Generator::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    // Overflow of the random component within one millisecond is the only
    // failure mode; fall back to a fresh ULID rather than failing the caller.
    generator.generate().unwrap_or_else(|_| Ulid::new())
}

/// Macro to define a ULID-based identifier type with standard trait implementations.
///
/// Generates a newtype around `ulid::Ulid` with:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as string)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`
/// - 16-byte big-endian encoding for storage keys
macro_rules! ulid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Ulid);

        impl $name {
            /// Create an identifier from a ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Mint a new identifier, later than every id minted before it in this process.
            #[must_use]
            pub fn generate() -> Self {
                Self(next_ulid())
            }

            /// Return the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> &Ulid {
                &self.0
            }

            /// Return the 16 key bytes. Byte order matches time order.
            #[must_use]
            pub fn to_bytes(&self) -> [u8; 16] {
                self.0.to_bytes()
            }

            /// Rebuild an identifier from its 16 key bytes.
            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Ulid::from_bytes(bytes))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
                Ok(Self(ulid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

ulid_id_type!(UsageId, "Identifier of a metered tool invocation (usage record).");
ulid_id_type!(LedgerEntryId, "Identifier of an immutable ledger entry.");
ulid_id_type!(PurchaseId, "Identifier of an applied purchase.");

/// Macro to define a validated string identifier.
///
/// The validator receives the raw string and returns the error to report,
/// if any. Validation runs on parse and on deserialization.
macro_rules! string_id_type {
    ($name:ident, $validate:path, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the value fails validation.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                $validate(&value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the identifier's bytes.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id_type!(
    UserId,
    validate_user_id,
    "A user identifier issued by the identity provider.\n\nOpaque, 1 to 128 bytes, no control characters."
);
string_id_type!(
    ToolKey,
    validate_tool_key,
    "Key of a metered tool in the pricing catalog (e.g. `brand_scraper`).\n\nLowercase ASCII letters, digits, `_` and `-`, 1 to 64 bytes."
);

fn validate_user_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() || value.len() > MAX_USER_ID_LEN {
        return Err(IdError::InvalidUserId);
    }
    // Storage keys use NUL as a separator after the user id.
    if value.chars().any(char::is_control) {
        return Err(IdError::InvalidUserId);
    }
    Ok(())
}

fn validate_tool_key(value: &str) -> Result<(), IdError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_TOOL_KEY_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(IdError::InvalidToolKey)
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,

    /// The input is not an acceptable user id.
    #[error("invalid user id")]
    InvalidUserId,

    /// The input is not an acceptable tool key.
    #[error("invalid tool key")]
    InvalidToolKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_id_roundtrip() {
        let id = UsageId::generate();
        let parsed = UsageId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(UsageId::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn generated_ids_are_strictly_increasing() {
        let ids: Vec<LedgerEntryId> = (0..1000).map(|_| LedgerEntryId::generate()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.windows(2).all(|w| w[0].to_bytes() < w[1].to_bytes()));
    }

    #[test]
    fn user_id_validation() {
        assert!(UserId::new("firebase-uid-123").is_ok());
        assert_eq!(UserId::new(""), Err(IdError::InvalidUserId));
        assert_eq!(UserId::new("bad\0id"), Err(IdError::InvalidUserId));
        assert_eq!(
            UserId::new("x".repeat(MAX_USER_ID_LEN + 1)),
            Err(IdError::InvalidUserId)
        );
    }

    #[test]
    fn tool_key_validation() {
        assert!(ToolKey::new("brand_scraper").is_ok());
        assert!(ToolKey::new("ai-chat-2").is_ok());
        assert_eq!(ToolKey::new("Brand"), Err(IdError::InvalidToolKey));
        assert_eq!(ToolKey::new("a b"), Err(IdError::InvalidToolKey));
        assert_eq!(ToolKey::new(""), Err(IdError::InvalidToolKey));
    }

    #[test]
    fn string_ids_validate_on_deserialize() {
        let id: UserId = serde_json::from_str("\"user-1\"").unwrap();
        assert_eq!(id.as_str(), "user-1");
        assert!(serde_json::from_str::<ToolKey>("\"NOT OK\"").is_err());
    }
}
