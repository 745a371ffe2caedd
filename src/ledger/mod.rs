//! # Ledger Module -- Vault & Member Records
//!
//! The ledger is where the pooled-savings bookkeeping lives. Two record
//! types, one invariant that everything else hangs off:
//!
//! ```text
//! records.rs -- Vault and Member records, checked balance arithmetic
//! store.rs   -- RecordStore: address-keyed record map, all-or-nothing access
//! ```
//!
//! A vault's `total_deposited` always equals the sum of its members'
//! contributions minus everything the authority has withdrawn; for token
//! vaults it additionally equals the custodial sub-account's external
//! balance. Member records are a contribution history, not a spendable
//! balance -- withdrawal never touches them.

pub mod records;
pub mod store;

pub use records::{AssetKind, Member, Record, Vault};
pub use store::{LedgerError, RecordStore};
