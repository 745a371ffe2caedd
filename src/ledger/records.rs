//! # Ledger Records
//!
//! The two persistent record types of the pooled-savings ledger, plus the
//! asset tag that distinguishes native vaults from token vaults.
//!
//! All balance mutation goes through the checked methods here
//! ([`Vault::credit_total`], [`Vault::debit_total`], [`Member::credit`]) so
//! that overflow and negative results are structurally impossible -- the
//! raw fields are public for inspection, but the engine never writes them
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;

use super::store::LedgerError;

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

/// The value representation a vault holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// The platform's native value unit, held at the vault address itself.
    Native,
    /// A fungible token identified by its mint, held in a custodial
    /// sub-account owned by the vault record.
    Token {
        /// The token's mint identity.
        mint: Address,
    },
}

impl AssetKind {
    /// Single-byte discriminant, fed into vault address derivation.
    pub fn discriminant(&self) -> u8 {
        match self {
            AssetKind::Native => 0,
            AssetKind::Token { .. } => 1,
        }
    }

    /// Returns the mint for token assets, `None` for native.
    pub fn mint(&self) -> Option<Address> {
        match self {
            AssetKind::Native => None,
            AssetKind::Token { mint } => Some(*mint),
        }
    }

    /// Returns `true` for token assets.
    pub fn is_token(&self) -> bool {
        matches!(self, AssetKind::Token { .. })
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Native => write!(f, "native"),
            AssetKind::Token { mint } => write!(f, "token({mint})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The per-authority, per-asset pooled account record.
///
/// One vault exists per `(authority, asset)` pair, at the address derived
/// from that pair. `authority` and `asset` are set at creation and never
/// change; only `total_deposited` and `member_count` move afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// The sole identity permitted to withdraw. Immutable.
    pub authority: Address,

    /// The value representation this vault pools. Immutable.
    pub asset: AssetKind,

    /// Custodial sub-account holding the token balance, for token vaults
    /// only. `None` for native vaults -- native value is held at the vault
    /// address itself.
    pub custody: Option<Address>,

    /// Derivation salt returned by the resolver for this vault's address.
    pub salt: u8,

    /// Sum of all member contributions minus all withdrawals.
    ///
    /// Invariant: never negative, and for token vaults always equal to the
    /// custody account's external balance.
    pub total_deposited: u64,

    /// Number of distinct member records ever created under this vault.
    /// Monotonically non-decreasing -- withdrawal does not delete members.
    pub member_count: u64,

    /// When the vault was initialized (UTC).
    pub created_at: DateTime<Utc>,
}

impl Vault {
    /// Fixed-width layout size in bytes, for integrations that persist
    /// records in sized slots: authority (32) + asset tag (1) + mint (32)
    /// + custody (32) + salt (1) + total_deposited (8) + member_count (8).
    pub const ENCODED_LEN: usize = 32 + 1 + 32 + 32 + 1 + 8 + 8;

    /// Creates an empty vault for the given authority and asset.
    pub fn new(authority: Address, asset: AssetKind, custody: Option<Address>, salt: u8) -> Self {
        Self {
            authority,
            asset,
            custody,
            salt,
            total_deposited: 0,
            member_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Credits a deposit to the pooled total (checked add).
    ///
    /// Returns the new total.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ArithmeticOverflow`] if the credit would exceed `u64::MAX`.
    pub fn credit_total(&mut self, amount: u64) -> Result<u64, LedgerError> {
        self.total_deposited = self.total_deposited.checked_add(amount).ok_or(
            LedgerError::ArithmeticOverflow {
                current: self.total_deposited,
                delta: amount,
            },
        )?;
        Ok(self.total_deposited)
    }

    /// Debits a withdrawal from the pooled total (checked subtract).
    ///
    /// Returns the new total.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientFunds`] if `amount` exceeds the total.
    pub fn debit_total(&mut self, amount: u64) -> Result<u64, LedgerError> {
        self.total_deposited = self.total_deposited.checked_sub(amount).ok_or(
            LedgerError::InsufficientFunds {
                available: self.total_deposited,
                requested: amount,
            },
        )?;
        Ok(self.total_deposited)
    }

    /// Records the creation of a new member under this vault (checked add).
    pub fn record_new_member(&mut self) -> Result<u64, LedgerError> {
        self.member_count =
            self.member_count
                .checked_add(1)
                .ok_or(LedgerError::ArithmeticOverflow {
                    current: self.member_count,
                    delta: 1,
                })?;
        Ok(self.member_count)
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// A per-depositor contribution record under a vault.
///
/// Materialized lazily on the owner's first deposit, updated in place on
/// every subsequent deposit, and never deleted. `deposited_amount` is a
/// cumulative contribution ledger -- it is the one quantity withdrawal does
/// not touch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The vault this member belongs to.
    pub vault: Address,

    /// The depositing identity. Immutable.
    pub owner: Address,

    /// Cumulative net deposits by this owner.
    pub deposited_amount: u64,

    /// When the owner first deposited (UTC).
    pub joined_at: DateTime<Utc>,

    /// Derivation salt returned by the resolver for this member's address.
    pub salt: u8,
}

impl Member {
    /// Fixed-width layout size in bytes, for integrations that persist
    /// records in sized slots: vault (32) + owner (32) + deposited_amount
    /// (8) + joined_at (8) + salt (1).
    pub const ENCODED_LEN: usize = 32 + 32 + 8 + 8 + 1;

    /// Creates a fresh member record with zero contributions.
    pub fn new(vault: Address, owner: Address, salt: u8) -> Self {
        Self {
            vault,
            owner,
            deposited_amount: 0,
            joined_at: Utc::now(),
            salt,
        }
    }

    /// Credits a deposit to this member's contribution total (checked add).
    ///
    /// Returns the new total.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ArithmeticOverflow`] if the credit would exceed `u64::MAX`.
    pub fn credit(&mut self, amount: u64) -> Result<u64, LedgerError> {
        self.deposited_amount = self.deposited_amount.checked_add(amount).ok_or(
            LedgerError::ArithmeticOverflow {
                current: self.deposited_amount,
                delta: amount,
            },
        )?;
        Ok(self.deposited_amount)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A store entry: every address holds at most one record of one kind.
///
/// Keeping the kind inside the entry lets the store reject type-confusion
/// on address collision -- a member lookup that lands on a vault record is
/// an anomaly, not a cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    /// A vault record.
    Vault(Vault),
    /// A member record.
    Member(Member),
}

impl Record {
    /// Human-readable kind tag, used in error context and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Vault(_) => "vault",
            Record::Member(_) => "member",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
