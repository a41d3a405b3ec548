//! # Vault Configuration & Constants
//!
//! Every magic number the vault generations share lives here. Fee and rate
//! arithmetic, record capacity and version tags must agree across all three
//! logic generations, because they all operate on the same state record.
//! Changing a value here after a vault holds deposits is a migration, not a
//! tweak.

// ---------------------------------------------------------------------------
// Basis Points
// ---------------------------------------------------------------------------

/// One whole in basis points. All fee and rate parameters are expressed
/// against this denominator: 500 bps = 5%.
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Highest deposit fee the initializer accepts. A 100% fee is legal (the
/// deposit is credited with zero) but anything above it is nonsense.
pub const MAX_DEPOSIT_FEE_BPS: u16 = BPS_DENOMINATOR;

/// Highest yield rate accepted by generation 2 (100% per accrual period).
pub const MAX_YIELD_RATE_BPS: u16 = BPS_DENOMINATOR;

/// Highest emergency-exit penalty accepted by generation 3.
pub const MAX_EMERGENCY_PENALTY_BPS: u16 = BPS_DENOMINATOR;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// The period over which `yield_rate_bps` is earned, in seconds. Rates are
/// annual.
pub const YIELD_ACCRUAL_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// One day. The delay operators usually configure for generation 3.
pub const DEFAULT_WITHDRAWAL_DELAY_SECS: u64 = 86_400;

// ---------------------------------------------------------------------------
// State Record
// ---------------------------------------------------------------------------

/// Total number of slots a state record can ever hold. Named fields take
/// the low slots; the rest is reserved for future generations.
pub const RECORD_SLOT_CAPACITY: u16 = 64;

/// Generation that introduces the pause/yield extension.
pub const YIELD_EXTENSION_GENERATION: u8 = 2;

/// Generation that introduces the delayed/emergency withdrawal extension.
pub const WITHDRAWAL_EXTENSION_GENERATION: u8 = 3;

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

pub const VERSION_TAG_V1: &str = "V1";
pub const VERSION_TAG_V2: &str = "V2";
pub const VERSION_TAG_V3: &str = "V3";

/// Returns the version tag for a generation number, `None` for unknown ones.
pub fn version_tag_for(generation: u8) -> Option<&'static str> {
    match generation {
        1 => Some(VERSION_TAG_V1),
        2 => Some(VERSION_TAG_V2),
        3 => Some(VERSION_TAG_V3),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Deployment Defaults
// ---------------------------------------------------------------------------

/// Deposit fee used by the deployment tooling when none is given (5%).
pub const DEFAULT_DEPOSIT_FEE_BPS: u16 = 500;

/// Yield rate the scenario runner configures after upgrading to generation 2.
pub const DEFAULT_YIELD_RATE_BPS: u16 = 500;

/// Initial supply minted by the in-memory reference token.
pub const DEFAULT_TOKEN_SUPPLY: u128 = 1_000_000_000;
