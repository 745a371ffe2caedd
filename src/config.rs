//! # Protocol Configuration & Constants
//!
//! Every magic number in the SUSU engine lives here. The derivation
//! namespaces in particular are consensus-critical: change one and every
//! vault, member, and custody address on the network moves.

// ---------------------------------------------------------------------------
// Derivation Namespaces
// ---------------------------------------------------------------------------

/// Namespace for vault record addresses.
/// Seeds: `(authority, asset-discriminant[, mint])`.
pub const NS_VAULT: &str = "vault";

/// Namespace for member record addresses.
/// Seeds: `(vault_address, owner)`.
pub const NS_MEMBER: &str = "member";

/// Namespace for the custodial token sub-account of a token vault.
/// Seeds: `(vault_address)`.
pub const NS_TOKEN_ACCOUNT: &str = "token_account";

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

/// Size hint for a custodial token sub-account slot:
/// mint (32) + capability owner (32) + balance (8).
pub const TOKEN_ACCOUNT_SIZE_HINT: usize = 32 + 32 + 8;

// ---------------------------------------------------------------------------
// Value Units
// ---------------------------------------------------------------------------

/// Smallest units per whole native unit.
///
/// All arithmetic in the engine is done in smallest units; this scale
/// exists for display and for callers that think in whole units
/// (e.g. "deposit 0.5" means `UNITS_PER_NATIVE / 2`).
pub const UNITS_PER_NATIVE: u64 = 1_000_000_000;
