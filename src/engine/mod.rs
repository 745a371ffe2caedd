//! # Vault Operations Engine
//!
//! The three state transitions of the pooled-savings ledger -- initialize,
//! deposit, withdraw -- plus the platform seams they consume:
//!
//! ```text
//! platform.rs -- ValueTransfer / AccountProvisioner traits, InMemoryBank
//! mod.rs      -- VaultEngine: the operations themselves
//! ```
//!
//! ## Atomicity Model
//!
//! Each operation takes the store mutex for its whole duration, stages
//! every record mutation on cloned copies with checked arithmetic, invokes
//! the external value transfer, and only then writes the staged copies
//! back. A failure at any point -- bad precondition, overflow, transfer
//! rejection -- returns before the first write, so the ledger is left
//! byte-identical to its pre-call state. Concurrent deposits against the
//! same vault serialize on the mutex; there are no lost updates and no
//! partially-applied peers to observe.
//!
//! The engine never retries and never blocks beyond the mutex: given a
//! consistent snapshot of the records involved, it deterministically
//! computes the new state or a definite error. Retry policy belongs to the
//! caller.

pub mod platform;

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::address::{Address, AddressResolver, Blake3Resolver};
use crate::config::{NS_MEMBER, NS_TOKEN_ACCOUNT, NS_VAULT, TOKEN_ACCOUNT_SIZE_HINT};
use crate::events::{DepositMade, VaultInitialized, WithdrawalPerformed};
use crate::ledger::{AssetKind, LedgerError, Member, RecordStore, Vault};

pub use platform::{AccountProvisioner, InMemoryBank, PlatformError, ValueTransfer};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by the vault operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A ledger record operation failed (duplicate creation, owner
    /// mismatch, overflow, insufficient funds, ...).
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A platform collaborator failed; no ledger state was changed.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// The caller is not the vault's withdrawal authority.
    #[error("unauthorized: {caller} is not the authority of vault {vault}")]
    Unauthorized {
        /// The vault whose authority gate rejected the call.
        vault: Address,
        /// The identity that attempted the withdrawal.
        caller: Address,
    },

    /// Zero-amount operations are no-ops and likely a caller bug.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// A token vault record carries no custody account. Should be
    /// impossible for vaults created through [`VaultEngine::initialize`].
    #[error("invalid vault configuration: token vault {vault} has no custody account")]
    InvalidVaultConfig {
        /// The malformed vault's address.
        vault: Address,
    },
}

// ---------------------------------------------------------------------------
// VaultEngine
// ---------------------------------------------------------------------------

/// The pooled-savings operations engine.
///
/// Owns the [`RecordStore`] and consumes three injected collaborators: an
/// [`AddressResolver`] for deterministic record addressing, a
/// [`ValueTransfer`] for custody changes, and an [`AccountProvisioner`]
/// for custodial slot allocation. The outer dispatch layer authenticates
/// callers before invoking an operation; the `caller` argument is the
/// authenticated identity.
pub struct VaultEngine {
    /// The ledger, locked for the duration of each operation.
    store: Mutex<RecordStore>,
    /// Deterministic address derivation.
    resolver: Arc<dyn AddressResolver>,
    /// Moves value between platform accounts.
    transfer: Arc<dyn ValueTransfer>,
    /// Allocates custodial sub-account slots.
    provisioner: Arc<dyn AccountProvisioner>,
}

impl VaultEngine {
    /// Creates an engine over an empty ledger with the given collaborators.
    pub fn new(
        resolver: Arc<dyn AddressResolver>,
        transfer: Arc<dyn ValueTransfer>,
        provisioner: Arc<dyn AccountProvisioner>,
    ) -> Self {
        Self {
            store: Mutex::new(RecordStore::new()),
            resolver,
            transfer,
            provisioner,
        }
    }

    /// Convenience constructor for tests and local simulation: the default
    /// BLAKE3 resolver plus a fresh [`InMemoryBank`] serving as both
    /// transfer and provisioner. Returns the bank so callers can fund
    /// identities and inspect balances.
    pub fn in_memory() -> (Self, Arc<InMemoryBank>) {
        let bank = Arc::new(InMemoryBank::new());
        let engine = Self::new(
            Arc::new(Blake3Resolver),
            Arc::clone(&bank) as Arc<dyn ValueTransfer>,
            Arc::clone(&bank) as Arc<dyn AccountProvisioner>,
        );
        (engine, bank)
    }

    // -----------------------------------------------------------------------
    // Address Derivation
    // -----------------------------------------------------------------------

    /// Derives the vault address for `(authority, asset)`.
    pub fn vault_address(&self, authority: &Address, asset: &AssetKind) -> (Address, u8) {
        let disc = [asset.discriminant()];
        match asset {
            AssetKind::Native => self
                .resolver
                .derive(NS_VAULT, &[authority.as_bytes(), &disc]),
            AssetKind::Token { mint } => {
                self.resolver
                    .derive(NS_VAULT, &[authority.as_bytes(), &disc, mint.as_bytes()])
            }
        }
    }

    /// Derives the member address for `(vault, owner)`.
    pub fn member_address(&self, vault: &Address, owner: &Address) -> (Address, u8) {
        self.resolver
            .derive(NS_MEMBER, &[vault.as_bytes(), owner.as_bytes()])
    }

    // -----------------------------------------------------------------------
    // Record Access
    // -----------------------------------------------------------------------

    /// Snapshot of the vault record at `address`, if one exists.
    pub fn vault(&self, address: &Address) -> Option<Vault> {
        self.store.lock().vault(address).ok().cloned()
    }

    /// Snapshot of the member record at `address`, if one exists.
    pub fn member(&self, address: &Address) -> Option<Member> {
        self.store.lock().member(address).cloned()
    }

    /// Deterministic digest of the entire ledger state.
    pub fn state_digest(&self) -> [u8; 32] {
        self.store.lock().state_digest()
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Creates the vault for `(authority, asset)`.
    ///
    /// For token vaults, also derives and provisions the custodial
    /// sub-account, owned in the capability sense by the vault record
    /// rather than by `authority` directly.
    ///
    /// Initialization is not idempotent: a second call for
    /// the same `(authority, asset)` fails with
    /// [`LedgerError::AlreadyExists`] instead of silently resetting the
    /// vault's totals.
    pub fn initialize(
        &self,
        authority: Address,
        asset: AssetKind,
    ) -> Result<VaultInitialized, EngineError> {
        let (vault_addr, salt) = self.vault_address(&authority, &asset);
        let mut store = self.store.lock();

        if store.contains(&vault_addr) {
            return Err(LedgerError::AlreadyExists {
                address: vault_addr,
            }
            .into());
        }

        let custody = match &asset {
            AssetKind::Native => None,
            AssetKind::Token { .. } => {
                let (custody_addr, _) = self
                    .resolver
                    .derive(NS_TOKEN_ACCOUNT, &[vault_addr.as_bytes()]);
                self.provisioner
                    .create_account(custody_addr, TOKEN_ACCOUNT_SIZE_HINT, vault_addr)?;
                Some(custody_addr)
            }
        };

        let vault = Vault::new(authority, asset, custody, salt);
        let created_at = vault.created_at;
        store.create_vault(vault_addr, vault)?;

        info!(vault = %vault_addr, %authority, %asset, "vault initialized");
        Ok(VaultInitialized {
            vault: vault_addr,
            authority,
            asset,
            custody,
            salt,
            timestamp: created_at,
        })
    }

    /// Deposits `amount` from `caller` into the vault at `vault_addr`,
    /// materializing the caller's member record on first contact.
    ///
    /// The value transfer and the ledger updates commit together: if the
    /// transfer fails, or any staged update fails first, no ledger state
    /// changes -- not even the lazy member creation.
    pub fn deposit(
        &self,
        caller: Address,
        vault_addr: Address,
        amount: u64,
    ) -> Result<DepositMade, EngineError> {
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }

        let mut store = self.store.lock();
        let mut vault = store.vault(&vault_addr)?.clone();

        let (member_addr, member_salt) = self.member_address(&vault_addr, &caller);
        let existing = store
            .member_checked(&member_addr, &caller)
            .map_err(|err| {
                if matches!(err, LedgerError::OwnerMismatch { .. }) {
                    // Derivation collision or spoofing attempt -- this is a
                    // security anomaly, not a user error.
                    warn!(member = %member_addr, %caller, vault = %vault_addr,
                          "deposit rejected: member record owner mismatch");
                }
                err
            })?
            .cloned();

        let member_joined = existing.is_none();
        let mut member = existing.unwrap_or_else(|| Member::new(vault_addr, caller, member_salt));

        // Stage every mutation before value moves; a failure from here on
        // returns with the ledger untouched.
        let new_member_total = member.credit(amount)?;
        let new_vault_total = vault.credit_total(amount)?;
        if member_joined {
            vault.record_new_member()?;
        }

        let destination = Self::custody_account(&vault_addr, &vault)?;
        self.transfer
            .transfer(caller, destination, amount, &vault.asset)?;

        store.put_member(member_addr, member);
        store.put_vault(vault_addr, vault);

        debug!(digest = %store.state_digest_hex(), "ledger digest after deposit");
        info!(vault = %vault_addr, member = %member_addr, amount, new_vault_total,
              member_joined, "deposit committed");
        Ok(DepositMade {
            vault: vault_addr,
            member: member_addr,
            owner: caller,
            amount,
            new_member_total,
            new_vault_total,
            member_joined,
            timestamp: Utc::now(),
        })
    }

    /// Withdraws `amount` from the vault at `vault_addr` to `recipient`.
    ///
    /// The sole authorization gate is a strict identity match against the
    /// vault's recorded authority, checked before anything else about the
    /// vault is examined. Withdrawal debits only the pooled total -- member
    /// contribution records are a history, not per-member entitlements,
    /// and are never touched.
    pub fn withdraw(
        &self,
        caller: Address,
        vault_addr: Address,
        amount: u64,
        recipient: Address,
    ) -> Result<WithdrawalPerformed, EngineError> {
        let mut store = self.store.lock();
        let mut vault = store.vault(&vault_addr)?.clone();

        if caller != vault.authority {
            debug!(vault = %vault_addr, %caller, "withdrawal rejected: not the vault authority");
            return Err(EngineError::Unauthorized {
                vault: vault_addr,
                caller,
            });
        }

        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }

        let new_vault_total = vault.debit_total(amount)?;

        let source = Self::custody_account(&vault_addr, &vault)?;
        self.transfer
            .transfer(source, recipient, amount, &vault.asset)?;

        store.put_vault(vault_addr, vault);

        info!(vault = %vault_addr, %recipient, amount, new_vault_total, "withdrawal committed");
        Ok(WithdrawalPerformed {
            vault: vault_addr,
            authority: caller,
            recipient,
            amount,
            new_vault_total,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    /// The account actually holding the vault's value: the vault address
    /// itself for native vaults, the custodial sub-account for token
    /// vaults.
    fn custody_account(vault_addr: &Address, vault: &Vault) -> Result<Address, EngineError> {
        match &vault.asset {
            AssetKind::Native => Ok(*vault_addr),
            AssetKind::Token { .. } => vault.custody.ok_or(EngineError::InvalidVaultConfig {
                vault: *vault_addr,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_native_vault() {
        let (engine, _bank) = VaultEngine::in_memory();
        let authority = Address::random();

        let event = engine.initialize(authority, AssetKind::Native).unwrap();
        assert_eq!(event.authority, authority);
        assert!(event.custody.is_none());

        let vault = engine.vault(&event.vault).unwrap();
        assert_eq!(vault.total_deposited, 0);
        assert_eq!(vault.member_count, 0);
        assert_eq!(vault.salt, event.salt);
    }

    #[test]
    fn initialize_token_vault_provisions_custody() {
        let (engine, bank) = VaultEngine::in_memory();
        let asset = AssetKind::Token {
            mint: Address::random(),
        };

        let event = engine.initialize(Address::random(), asset).unwrap();
        let custody = event.custody.expect("token vault gets a custody account");
        assert!(bank.is_provisioned(&custody));
        assert_eq!(engine.vault(&event.vault).unwrap().custody, Some(custody));
    }

    #[test]
    fn initialize_twice_rejected() {
        let (engine, _bank) = VaultEngine::in_memory();
        let authority = Address::random();

        engine.initialize(authority, AssetKind::Native).unwrap();
        let err = engine.initialize(authority, AssetKind::Native).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Ledger(LedgerError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn same_authority_native_and_token_vaults_coexist() {
        let (engine, _bank) = VaultEngine::in_memory();
        let authority = Address::random();
        let token = AssetKind::Token {
            mint: Address::random(),
        };

        let native = engine.initialize(authority, AssetKind::Native).unwrap();
        let tokenized = engine.initialize(authority, token).unwrap();
        assert_ne!(native.vault, tokenized.vault);
    }

    #[test]
    fn deposit_zero_rejected() {
        let (engine, _bank) = VaultEngine::in_memory();
        let event = engine
            .initialize(Address::random(), AssetKind::Native)
            .unwrap();

        let err = engine.deposit(Address::random(), event.vault, 0).unwrap_err();
        assert!(matches!(err, EngineError::ZeroAmount));
    }

    #[test]
    fn deposit_into_missing_vault_rejected() {
        let (engine, bank) = VaultEngine::in_memory();
        let user = Address::random();
        bank.mint_native(user, 1_000);

        let err = engine.deposit(user, Address::random(), 100).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Ledger(LedgerError::VaultNotFound { .. })
        ));
    }

    #[test]
    fn withdraw_zero_rejected_for_authority() {
        let (engine, _bank) = VaultEngine::in_memory();
        let authority = Address::random();
        let event = engine.initialize(authority, AssetKind::Native).unwrap();

        let err = engine
            .withdraw(authority, event.vault, 0, Address::random())
            .unwrap_err();
        assert!(matches!(err, EngineError::ZeroAmount));
    }

    #[test]
    fn unauthorized_withdraw_beats_zero_amount() {
        // The authority gate comes first: a non-authority caller learns
        // nothing about the vault, not even that its amount was zero.
        let (engine, _bank) = VaultEngine::in_memory();
        let event = engine
            .initialize(Address::random(), AssetKind::Native)
            .unwrap();

        let err = engine
            .withdraw(Address::random(), event.vault, 0, Address::random())
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { .. }));
    }

    #[test]
    fn vault_address_derivation_is_stable() {
        let (engine, _bank) = VaultEngine::in_memory();
        let authority = Address::random();

        let (addr1, salt1) = engine.vault_address(&authority, &AssetKind::Native);
        let (addr2, salt2) = engine.vault_address(&authority, &AssetKind::Native);
        assert_eq!(addr1, addr2);
        assert_eq!(salt1, salt2);
    }
}
