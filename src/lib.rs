// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SUSU Vault -- Pooled-Savings Ledger Engine
//!
//! SUSU is a pooled-savings vault: members deposit into a shared pot, the
//! ledger remembers exactly who contributed what, and a single designated
//! authority controls aggregate outflow. It is the on-ledger version of the
//! rotating savings circles the protocol is named after -- except the books
//! can't be fudged and the treasurer can't overdraw.
//!
//! ## Architecture
//!
//! The engine is split into modules that mirror its actual concerns:
//!
//! - **config** -- Protocol constants: derivation namespaces, unit scale.
//! - **address** -- 32-byte platform addresses and deterministic derivation.
//! - **ledger** -- The record store: `Vault` and `Member` records and the
//!   invariants every mutation must preserve.
//! - **engine** -- The three state transitions (initialize, deposit,
//!   withdraw) and the platform collaborators they consume.
//! - **events** -- Typed receipts emitted by successful operations.
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` in smallest-unit denomination.** No floating
//!    point, no decimals in arithmetic, every add and subtract is checked.
//! 2. **Operations are all-or-nothing.** An operation either commits every
//!    record mutation together with the value transfer, or commits nothing.
//!    There is no state in which the ledger disagrees with custody.
//! 3. **Collaborators are injected.** Address derivation, value movement,
//!    and slot provisioning are traits, not globals -- the engine stays
//!    deterministic and testable, including collision scenarios.
//! 4. **Serializable state.** Every record derives `Serialize` and
//!    `Deserialize` so ledger state can be persisted, transmitted, or
//!    digested for audit.

pub mod address;
pub mod config;
pub mod engine;
pub mod events;
pub mod ledger;

pub use address::{Address, AddressResolver, Blake3Resolver};
pub use engine::{EngineError, InMemoryBank, VaultEngine};
pub use events::{DepositMade, VaultInitialized, WithdrawalPerformed};
pub use ledger::{AssetKind, LedgerError, Member, RecordStore, Vault};
