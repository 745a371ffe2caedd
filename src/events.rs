//! # Operation Events
//!
//! Every successful state transition returns a typed event describing
//! exactly what changed -- the addresses involved, the amount moved, and
//! the post-state totals. Callers use them as receipts; an outer dispatch
//! layer can forward them to whatever event sink the platform provides
//! (event-log persistence itself is out of scope here).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::ledger::AssetKind;

/// Emitted when a vault is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInitialized {
    /// Address of the new vault record.
    pub vault: Address,
    /// The withdrawal authority.
    pub authority: Address,
    /// The asset the vault pools.
    pub asset: AssetKind,
    /// Custodial sub-account, for token vaults.
    pub custody: Option<Address>,
    /// Derivation salt of the vault address.
    pub salt: u8,
    /// When the vault was created (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a deposit commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMade {
    /// The vault that received the deposit.
    pub vault: Address,
    /// Address of the member record.
    pub member: Address,
    /// The depositing identity.
    pub owner: Address,
    /// Amount deposited, in smallest units.
    pub amount: u64,
    /// The member's cumulative contribution after this deposit.
    pub new_member_total: u64,
    /// The vault's pooled total after this deposit.
    pub new_vault_total: u64,
    /// `true` if this deposit materialized the member record.
    pub member_joined: bool,
    /// When the deposit committed (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a withdrawal commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPerformed {
    /// The vault that was debited.
    pub vault: Address,
    /// The authority that performed the withdrawal.
    pub authority: Address,
    /// Where the value went.
    pub recipient: Address,
    /// Amount withdrawn, in smallest units.
    pub amount: u64,
    /// The vault's pooled total after this withdrawal.
    pub new_vault_total: u64,
    /// When the withdrawal committed (UTC).
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_event_serde_roundtrip() {
        let event = DepositMade {
            vault: Address::random(),
            member: Address::random(),
            owner: Address::random(),
            amount: 1_000,
            new_member_total: 1_000,
            new_vault_total: 3_000,
            member_joined: true,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialize");
        let recovered: DepositMade = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered, event);
    }

    #[test]
    fn withdrawal_event_serde_roundtrip() {
        let event = WithdrawalPerformed {
            vault: Address::random(),
            authority: Address::random(),
            recipient: Address::random(),
            amount: 250,
            new_vault_total: 750,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialize");
        let recovered: WithdrawalPerformed = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered, event);
    }
}
