//! # RecordStore -- Address-Keyed Ledger Storage
//!
//! A flat map from [`Address`] to [`Record`], the durable slot layer the
//! operations engine mutates. The store itself is deliberately dumb about
//! concurrency: it is a plain data structure, and the engine serializes
//! whole operations around it so that every mutation sequence is
//! all-or-nothing with respect to concurrent callers.
//!
//! What the store *is* opinionated about is confusion: creating over an
//! occupied address fails, reading a record of the wrong kind fails, and
//! reading a member record whose stored owner differs from the expected
//! owner fails loudly -- that last one is the defense against address
//! collisions and spoofed member records.
//!
//! ## State Digest
//!
//! [`RecordStore::state_digest`] folds every entry into a single BLAKE3
//! digest over sorted entries, so two stores with the same records produce
//! the same digest regardless of insertion order. Tests lean on this to
//! prove that failed operations leave the ledger byte-identical.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::address::Address;

use super::records::{Member, Record, Vault};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by ledger record access and mutation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A record already occupies the target address -- duplicate creation.
    #[error("record already exists at {address}")]
    AlreadyExists {
        /// The occupied address.
        address: Address,
    },

    /// An existing member record's owner differs from the caller.
    ///
    /// This signals an address-derivation collision or a spoofing attempt,
    /// not a benign user error -- callers should log it distinctly.
    #[error("owner mismatch at {address}: record owned by {stored}, caller is {caller}")]
    OwnerMismatch {
        /// The member record's address.
        address: Address,
        /// The owner recorded in the ledger.
        stored: Address,
        /// The identity that attempted the operation.
        caller: Address,
    },

    /// The record at the address is of a different kind than expected.
    #[error("record at {address} is a {found}, expected {expected}")]
    WrongRecordKind {
        /// The colliding address.
        address: Address,
        /// The kind actually stored there.
        found: &'static str,
        /// The kind the caller was looking for.
        expected: &'static str,
    },

    /// No vault record exists at the address.
    #[error("no vault at {address}")]
    VaultNotFound {
        /// The address that was looked up.
        address: Address,
    },

    /// A checked addition overflowed the balance width.
    #[error("arithmetic overflow: current {current}, delta {delta}")]
    ArithmeticOverflow {
        /// Value before the failed operation.
        current: u64,
        /// The delta that caused the overflow.
        delta: u64,
    },

    /// A checked subtraction would have produced a negative result.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The balance available.
        available: u64,
        /// The amount requested.
        requested: u64,
    },
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// In-memory ledger record store keyed by deterministic addresses.
///
/// # Thread Safety
///
/// Carries no interior locking. The engine wraps the store in a
/// `parking_lot::Mutex` and holds the lock for the duration of each
/// operation, which is what gives operations their atomicity.
#[derive(Debug, Default)]
pub struct RecordStore {
    /// Records keyed by derived address.
    records: HashMap<Address, Record>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Returns `true` if any record occupies the address.
    pub fn contains(&self, address: &Address) -> bool {
        self.records.contains_key(address)
    }

    /// Creates a vault record at `address`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AlreadyExists`] if *any* record already lives there --
    /// a second initialize must fail rather than silently reset the vault.
    pub fn create_vault(&mut self, address: Address, vault: Vault) -> Result<(), LedgerError> {
        if self.records.contains_key(&address) {
            return Err(LedgerError::AlreadyExists { address });
        }
        self.records.insert(address, Record::Vault(vault));
        Ok(())
    }

    /// Reads the vault record at `address`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::VaultNotFound`] when the address is empty,
    /// [`LedgerError::WrongRecordKind`] when it holds a non-vault record.
    pub fn vault(&self, address: &Address) -> Result<&Vault, LedgerError> {
        match self.records.get(address) {
            Some(Record::Vault(vault)) => Ok(vault),
            Some(other) => Err(LedgerError::WrongRecordKind {
                address: *address,
                found: other.kind(),
                expected: "vault",
            }),
            None => Err(LedgerError::VaultNotFound { address: *address }),
        }
    }

    /// Reads the member record at `address`, validating ownership.
    ///
    /// Returns `Ok(None)` when the address is empty (the member has not
    /// been materialized yet).
    ///
    /// # Errors
    ///
    /// [`LedgerError::OwnerMismatch`] when a member record exists but its
    /// stored owner differs from `expected_owner`;
    /// [`LedgerError::WrongRecordKind`] when the address holds a non-member
    /// record.
    pub fn member_checked(
        &self,
        address: &Address,
        expected_owner: &Address,
    ) -> Result<Option<&Member>, LedgerError> {
        match self.records.get(address) {
            Some(Record::Member(member)) => {
                if member.owner != *expected_owner {
                    return Err(LedgerError::OwnerMismatch {
                        address: *address,
                        stored: member.owner,
                        caller: *expected_owner,
                    });
                }
                Ok(Some(member))
            }
            Some(other) => Err(LedgerError::WrongRecordKind {
                address: *address,
                found: other.kind(),
                expected: "member",
            }),
            None => Ok(None),
        }
    }

    /// Reads the member record at `address` without an ownership check.
    pub fn member(&self, address: &Address) -> Option<&Member> {
        match self.records.get(address) {
            Some(Record::Member(member)) => Some(member),
            _ => None,
        }
    }

    /// Writes a staged vault copy back to the store (insert-or-replace).
    pub fn put_vault(&mut self, address: Address, vault: Vault) {
        self.records.insert(address, Record::Vault(vault));
    }

    /// Writes a staged member copy back to the store (insert-or-replace).
    pub fn put_member(&mut self, address: Address, member: Member) {
        self.records.insert(address, Record::Member(member));
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over all `(address, record)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Record)> {
        self.records.iter()
    }

    /// Computes a deterministic digest of the entire ledger state.
    ///
    /// Entries are visited in address order and folded into a single
    /// BLAKE3 hash of `address || canonical-JSON(record)`. Two stores with
    /// identical records produce identical digests regardless of insertion
    /// order. An empty store digests to the hash of the empty input.
    pub fn state_digest(&self) -> [u8; 32] {
        let sorted: BTreeMap<&Address, &Record> = self.records.iter().collect();

        let mut hasher = blake3::Hasher::new();
        for (address, record) in sorted {
            hasher.update(address.as_bytes());
            // Record serialization is statically infallible; fail loudly
            // rather than fold a bad entry into the digest silently.
            let bytes =
                serde_json::to_vec(record).expect("ledger records serialize infallibly");
            hasher.update(&bytes);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hex rendering of [`state_digest`](Self::state_digest), for logs.
    pub fn state_digest_hex(&self) -> String {
        hex::encode(self.state_digest())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::records::AssetKind;

    fn vault_record(authority: Address) -> Vault {
        Vault::new(authority, AssetKind::Native, None, 0xAB)
    }

    #[test]
    fn create_vault_then_read() {
        let mut store = RecordStore::new();
        let addr = Address::random();
        let authority = Address::random();

        store.create_vault(addr, vault_record(authority)).unwrap();

        let vault = store.vault(&addr).unwrap();
        assert_eq!(vault.authority, authority);
        assert_eq!(vault.total_deposited, 0);
    }

    #[test]
    fn create_over_occupied_address_rejected() {
        let mut store = RecordStore::new();
        let addr = Address::random();

        store
            .create_vault(addr, vault_record(Address::random()))
            .unwrap();
        let err = store
            .create_vault(addr, vault_record(Address::random()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExists { .. }));
    }

    #[test]
    fn vault_lookup_on_empty_address() {
        let store = RecordStore::new();
        let err = store.vault(&Address::random()).unwrap_err();
        assert!(matches!(err, LedgerError::VaultNotFound { .. }));
    }

    #[test]
    fn vault_lookup_on_member_record_rejected() {
        let mut store = RecordStore::new();
        let addr = Address::random();
        store.put_member(addr, Member::new(Address::random(), Address::random(), 0));

        let err = store.vault(&addr).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::WrongRecordKind {
                found: "member",
                expected: "vault",
                ..
            }
        ));
    }

    #[test]
    fn member_checked_absent_is_none() {
        let store = RecordStore::new();
        let result = store
            .member_checked(&Address::random(), &Address::random())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn member_checked_matching_owner() {
        let mut store = RecordStore::new();
        let addr = Address::random();
        let owner = Address::random();
        store.put_member(addr, Member::new(Address::random(), owner, 1));

        let member = store.member_checked(&addr, &owner).unwrap().unwrap();
        assert_eq!(member.owner, owner);
    }

    #[test]
    fn member_checked_foreign_owner_rejected() {
        let mut store = RecordStore::new();
        let addr = Address::random();
        let owner = Address::random();
        let intruder = Address::random();
        store.put_member(addr, Member::new(Address::random(), owner, 1));

        let err = store.member_checked(&addr, &intruder).unwrap_err();
        match err {
            LedgerError::OwnerMismatch { stored, caller, .. } => {
                assert_eq!(stored, owner);
                assert_eq!(caller, intruder);
            }
            other => panic!("expected OwnerMismatch, got {other:?}"),
        }
    }

    #[test]
    fn member_checked_on_vault_record_rejected() {
        let mut store = RecordStore::new();
        let addr = Address::random();
        store.put_vault(addr, vault_record(Address::random()));

        let err = store
            .member_checked(&addr, &Address::random())
            .unwrap_err();
        assert!(matches!(err, LedgerError::WrongRecordKind { .. }));
    }

    #[test]
    fn digest_is_insertion_order_independent() {
        let addr_a = Address::random();
        let addr_b = Address::random();
        let vault = vault_record(Address::random());
        let member = Member::new(addr_a, Address::random(), 2);

        let mut store1 = RecordStore::new();
        store1.put_vault(addr_a, vault.clone());
        store1.put_member(addr_b, member.clone());

        let mut store2 = RecordStore::new();
        store2.put_member(addr_b, member);
        store2.put_vault(addr_a, vault);

        assert_eq!(store1.state_digest(), store2.state_digest());
    }

    #[test]
    fn digest_changes_with_state() {
        let mut store = RecordStore::new();
        let before = store.state_digest();

        store.put_vault(Address::random(), vault_record(Address::random()));
        assert_ne!(before, store.state_digest());
    }

    #[test]
    fn digest_hex_is_64_chars() {
        let store = RecordStore::new();
        assert_eq!(store.state_digest_hex().len(), 64);
    }
}
