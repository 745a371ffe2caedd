//! # Addresses & Deterministic Derivation
//!
//! Every participant identity and every ledger record lives at a 32-byte
//! [`Address`]. Caller identities arrive from the outside (the platform
//! authenticates them before the engine is invoked); record addresses are
//! *derived* -- computed reproducibly from a namespace tag and a tuple of
//! seed byte strings, with no lookup table:
//!
//! ```text
//! (namespace, seed_0, seed_1, ...) -> (address, salt)
//! ```
//!
//! Derivation is an injected capability ([`AddressResolver`]) rather than a
//! free function. The engine trusts the resolver to be injective over
//! `(namespace, seeds)`; tests exercise what happens when that trust is
//! violated by injecting a deliberately colliding resolver.
//!
//! The default [`Blake3Resolver`] uses BLAKE3's `derive_key` mode for
//! domain separation -- two namespaces can never collide by construction --
//! and length-prefixes every seed so that seed tuples are unambiguous
//! (`["ab", "c"]` and `["a", "bc"]` hash differently).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a platform address in bytes.
pub const ADDRESS_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing an address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The base58 string could not be decoded.
    #[error("base58 decode error: {0}")]
    Base58Decode(String),

    /// The decoded data has an unexpected length.
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {got}")]
    InvalidLength {
        /// Actual number of bytes decoded.
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 32-byte platform address.
///
/// Used for both caller identities and derived record addresses -- the two
/// occupy the same address space, which is exactly why the ledger defends
/// against record-kind and owner confusion (see [`crate::ledger`]).
///
/// The human-readable form is base58, the encoding the surrounding platform
/// uses for account addresses. Serde follows the format: base58 strings for
/// human-readable serializers (JSON), raw bytes otherwise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Encodes this address as a base58 string.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parses a base58-encoded address.
    pub fn from_base58(s: &str) -> Result<Self, AddressError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressError::Base58Decode(e.to_string()))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength { got: bytes.len() });
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Generates a random address.
    ///
    /// For test identities and local simulation. Real caller identities are
    /// derived from key material by the platform, which is out of scope here.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}...)", &self.to_base58()[..8])
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_base58(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != ADDRESS_LENGTH {
                return Err(serde::de::Error::custom(format!(
                    "expected {}-byte address, got {}",
                    ADDRESS_LENGTH,
                    bytes.len()
                )));
            }
            let mut arr = [0u8; ADDRESS_LENGTH];
            arr.copy_from_slice(&bytes);
            Ok(Address(arr))
        }
    }
}

// ---------------------------------------------------------------------------
// AddressResolver
// ---------------------------------------------------------------------------

/// Deterministic address derivation.
///
/// Given a namespace tag and an ordered tuple of seed byte strings,
/// produces the unique record address plus a derivation salt. The engine
/// trusts implementations to be injective over `(namespace, seeds)` and to
/// be pure -- same inputs, same output, forever.
pub trait AddressResolver: Send + Sync {
    /// Derives `(address, salt)` for the given namespace and seeds.
    fn derive(&self, namespace: &str, seeds: &[&[u8]]) -> (Address, u8);
}

/// The default resolver: BLAKE3 `derive_key` with the namespace as the
/// key-derivation context.
///
/// The address is the keyed hash of the length-prefixed seed tuple. The
/// salt is a single byte drawn from a second derivation under a `/salt`
/// sub-context, so it carries no information about the address bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Resolver;

impl Blake3Resolver {
    fn keyed_hash(context: &str, seeds: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        for seed in seeds {
            // Length prefix keeps seed tuples unambiguous.
            hasher.update(&(seed.len() as u64).to_le_bytes());
            hasher.update(seed);
        }
        *hasher.finalize().as_bytes()
    }
}

impl AddressResolver for Blake3Resolver {
    fn derive(&self, namespace: &str, seeds: &[&[u8]]) -> (Address, u8) {
        let address = Address::from_bytes(Self::keyed_hash(namespace, seeds));
        let salt_context = format!("{namespace}/salt");
        let salt = Self::keyed_hash(&salt_context, seeds)[0];
        (address, salt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
