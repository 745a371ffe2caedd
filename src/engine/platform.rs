//! # Platform Collaborators
//!
//! The engine does not move value or provision storage itself -- the
//! surrounding platform does. These traits are the narrow seams through
//! which the engine consumes it:
//!
//! - [`ValueTransfer`] -- moves native units or token units between
//!   accounts, atomically and synchronously from the engine's perspective.
//! - [`AccountProvisioner`] -- allocates the durable slot backing a
//!   custodial sub-account.
//!
//! [`InMemoryBank`] implements both as a reference platform: real balances
//! in plain maps, suitable for tests and local simulation. A production
//! integration would implement the same traits over the actual chain
//! runtime.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::address::Address;
use crate::ledger::AssetKind;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by the platform collaborators.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The source account lacks the requested balance.
    #[error("insufficient balance in {from}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The debited account.
        from: Address,
        /// Its spendable balance.
        available: u64,
        /// The amount requested.
        requested: u64,
    },

    /// The platform refused the transfer on authorization grounds.
    ///
    /// Never produced by [`InMemoryBank`] -- the engine performs its own
    /// authorization before calling -- but real platforms can reject a
    /// transfer independently, so the interface carries the case.
    #[error("platform rejected transfer from {from}")]
    Unauthorized {
        /// The account the platform refused to debit.
        from: Address,
    },

    /// The target slot is already provisioned.
    #[error("account already exists at {address}")]
    AlreadyExists {
        /// The occupied address.
        address: Address,
    },

    /// Crediting the destination would overflow the balance width.
    #[error("balance overflow in {account}")]
    BalanceOverflow {
        /// The account whose balance would overflow.
        account: Address,
    },
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Moves value between platform accounts.
///
/// The engine treats a transfer as atomic: it either fully happens or
/// fully fails, with no partial custody change. Any waiting for external
/// confirmation belongs behind this trait, not in the engine.
pub trait ValueTransfer: Send + Sync {
    /// Moves `amount` of `asset` from `from` to `to`.
    fn transfer(
        &self,
        from: Address,
        to: Address,
        amount: u64,
        asset: &AssetKind,
    ) -> Result<(), PlatformError>;
}

/// Provisions durable storage slots.
pub trait AccountProvisioner: Send + Sync {
    /// Allocates the slot at `address` with the given size hint, owned (in
    /// the capability sense) by `owner`.
    ///
    /// # Errors
    ///
    /// [`PlatformError::AlreadyExists`] if the slot is occupied.
    fn create_account(
        &self,
        address: Address,
        size_hint: usize,
        owner: Address,
    ) -> Result<(), PlatformError>;
}

// ---------------------------------------------------------------------------
// InMemoryBank
// ---------------------------------------------------------------------------

/// Reference platform: native and token balances in plain maps.
///
/// Balances are keyed by holder address (native) or `(holder, mint)`
/// (token); destination entries materialize on first credit. The
/// provisioned-slot set only backs the [`AccountProvisioner`] duplicate
/// check.
///
/// # Thread Safety
///
/// Internally locked with `parking_lot::RwLock`; share freely via `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    /// Native balances by holder address.
    native: RwLock<HashMap<Address, u64>>,
    /// Token balances by `(holder, mint)`.
    token: RwLock<HashMap<(Address, Address), u64>>,
    /// Slots allocated through [`AccountProvisioner::create_account`].
    provisioned: RwLock<HashSet<Address>>,
}

impl InMemoryBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Faucet: credits native units to `holder` out of thin air.
    pub fn mint_native(&self, holder: Address, amount: u64) {
        let mut native = self.native.write();
        let balance = native.entry(holder).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Faucet: credits token units to `(holder, mint)` out of thin air.
    pub fn mint_token(&self, holder: Address, mint: Address, amount: u64) {
        let mut token = self.token.write();
        let balance = token.entry((holder, mint)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// The holder's native balance (0 if never credited).
    pub fn native_balance(&self, holder: &Address) -> u64 {
        self.native.read().get(holder).copied().unwrap_or(0)
    }

    /// The holder's balance of the given mint (0 if never credited).
    pub fn token_balance(&self, holder: &Address, mint: &Address) -> u64 {
        self.token
            .read()
            .get(&(*holder, *mint))
            .copied()
            .unwrap_or(0)
    }

    /// Returns `true` if the slot was allocated via `create_account`.
    pub fn is_provisioned(&self, address: &Address) -> bool {
        self.provisioned.read().contains(address)
    }

    fn move_in_map<K: std::hash::Hash + Eq>(
        map: &mut HashMap<K, u64>,
        from_key: K,
        to_key: K,
        from_addr: Address,
        to_addr: Address,
        amount: u64,
    ) -> Result<(), PlatformError> {
        let available = map.get(&from_key).copied().unwrap_or(0);
        if available < amount {
            return Err(PlatformError::InsufficientBalance {
                from: from_addr,
                available,
                requested: amount,
            });
        }

        // Self-transfer: debit and credit cancel, balance must not move.
        if from_key == to_key {
            return Ok(());
        }

        let credited = map
            .get(&to_key)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(PlatformError::BalanceOverflow { account: to_addr })?;

        map.insert(from_key, available - amount);
        map.insert(to_key, credited);
        Ok(())
    }
}

impl ValueTransfer for InMemoryBank {
    fn transfer(
        &self,
        from: Address,
        to: Address,
        amount: u64,
        asset: &AssetKind,
    ) -> Result<(), PlatformError> {
        match asset {
            AssetKind::Native => {
                let mut native = self.native.write();
                Self::move_in_map(&mut native, from, to, from, to, amount)?;
            }
            AssetKind::Token { mint } => {
                let mut token = self.token.write();
                Self::move_in_map(&mut token, (from, *mint), (to, *mint), from, to, amount)?;
            }
        }
        debug!(%from, %to, amount, %asset, "transfer applied");
        Ok(())
    }
}

impl AccountProvisioner for InMemoryBank {
    fn create_account(
        &self,
        address: Address,
        size_hint: usize,
        owner: Address,
    ) -> Result<(), PlatformError> {
        let mut provisioned = self.provisioned.write();
        if !provisioned.insert(address) {
            return Err(PlatformError::AlreadyExists { address });
        }
        debug!(%address, size_hint, %owner, "account provisioned");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_transfer_moves_balance() {
        let bank = InMemoryBank::new();
        let alice = Address::random();
        let bob = Address::random();
        bank.mint_native(alice, 1_000);

        bank.transfer(alice, bob, 400, &AssetKind::Native).unwrap();

        assert_eq!(bank.native_balance(&alice), 600);
        assert_eq!(bank.native_balance(&bob), 400);
    }

    #[test]
    fn native_transfer_insufficient_rejected() {
        let bank = InMemoryBank::new();
        let alice = Address::random();
        let bob = Address::random();
        bank.mint_native(alice, 100);

        let err = bank
            .transfer(alice, bob, 200, &AssetKind::Native)
            .unwrap_err();
        assert!(matches!(
            err,
            PlatformError::InsufficientBalance {
                available: 100,
                requested: 200,
                ..
            }
        ));
        // Nothing moved.
        assert_eq!(bank.native_balance(&alice), 100);
        assert_eq!(bank.native_balance(&bob), 0);
    }

    #[test]
    fn token_transfer_is_per_mint() {
        let bank = InMemoryBank::new();
        let alice = Address::random();
        let bob = Address::random();
        let mint_a = Address::random();
        let mint_b = Address::random();
        bank.mint_token(alice, mint_a, 500);
        bank.mint_token(alice, mint_b, 900);

        bank.transfer(alice, bob, 500, &AssetKind::Token { mint: mint_a })
            .unwrap();

        assert_eq!(bank.token_balance(&alice, &mint_a), 0);
        assert_eq!(bank.token_balance(&bob, &mint_a), 500);
        // The other mint is untouched.
        assert_eq!(bank.token_balance(&alice, &mint_b), 900);
        assert_eq!(bank.token_balance(&bob, &mint_b), 0);
    }

    #[test]
    fn self_transfer_conserves_balance() {
        let bank = InMemoryBank::new();
        let alice = Address::random();
        let mint = Address::random();
        bank.mint_native(alice, 100);
        bank.mint_token(alice, mint, 100);

        bank.transfer(alice, alice, 60, &AssetKind::Native).unwrap();
        bank.transfer(alice, alice, 60, &AssetKind::Token { mint })
            .unwrap();

        assert_eq!(bank.native_balance(&alice), 100);
        assert_eq!(bank.token_balance(&alice, &mint), 100);
    }

    #[test]
    fn self_transfer_still_checks_sufficiency() {
        let bank = InMemoryBank::new();
        let alice = Address::random();
        bank.mint_native(alice, 50);

        let err = bank
            .transfer(alice, alice, 60, &AssetKind::Native)
            .unwrap_err();
        assert!(matches!(
            err,
            PlatformError::InsufficientBalance {
                available: 50,
                requested: 60,
                ..
            }
        ));
        assert_eq!(bank.native_balance(&alice), 50);
    }

    #[test]
    fn transfer_from_unknown_account_rejected() {
        let bank = InMemoryBank::new();
        let err = bank
            .transfer(Address::random(), Address::random(), 1, &AssetKind::Native)
            .unwrap_err();
        assert!(matches!(
            err,
            PlatformError::InsufficientBalance { available: 0, .. }
        ));
    }

    #[test]
    fn credit_overflow_rejected() {
        let bank = InMemoryBank::new();
        let alice = Address::random();
        let bob = Address::random();
        bank.mint_native(alice, 10);
        bank.mint_native(bob, u64::MAX);

        let err = bank
            .transfer(alice, bob, 1, &AssetKind::Native)
            .unwrap_err();
        assert!(matches!(err, PlatformError::BalanceOverflow { .. }));
        assert_eq!(bank.native_balance(&alice), 10);
    }

    #[test]
    fn create_account_once() {
        let bank = InMemoryBank::new();
        let slot = Address::random();
        let owner = Address::random();

        bank.create_account(slot, 72, owner).unwrap();
        assert!(bank.is_provisioned(&slot));

        let err = bank.create_account(slot, 72, owner).unwrap_err();
        assert!(matches!(err, PlatformError::AlreadyExists { .. }));
    }
}
