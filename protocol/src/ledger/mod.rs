//! # External Asset Ledger
//!
//! The vault does not hold the asset itself. Balances live on an external
//! fungible-asset ledger, and the vault only ever asks that ledger to move
//! units: pull from a depositor (approval-gated) or push to a recipient.
//!
//! ```text
//! deposit:  depositor --transfer_from--> vault
//! withdraw: vault     --transfer------> recipient
//! ```
//!
//! Each ledger call is atomic on its own: it either moves the full amount or
//! returns an error and moves nothing. The vault builds its all-or-nothing
//! guarantee on top of that: it validates first, calls the ledger, and only
//! writes its own bookkeeping once the ledger call succeeded.

pub mod token;

pub use token::InMemoryToken;

use thiserror::Error;

use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by an asset ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The sending account does not hold enough units.
    #[error("insufficient ledger balance for {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The account being debited.
        account: Address,
        /// Units it holds.
        available: u128,
        /// Units requested.
        requested: u128,
    },

    /// The spender has not been approved for enough units.
    #[error("insufficient allowance: {spender} may move {available} of {owner}'s units, requested {requested}")]
    InsufficientAllowance {
        /// The account whose units are being pulled.
        owner: Address,
        /// The account doing the pulling.
        spender: Address,
        /// Current approved amount.
        available: u128,
        /// Units requested.
        requested: u128,
    },

    /// One of the accounts is frozen by the ledger operator.
    #[error("account {0} is frozen on the asset ledger")]
    AccountFrozen(Address),

    /// Transfers to or from the zero address are rejected.
    #[error("transfer involves the zero address")]
    ZeroAddress,

    /// Crediting would overflow the recipient's balance or the total supply.
    #[error("ledger arithmetic overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// AssetLedger
// ---------------------------------------------------------------------------

/// Interface to the fungible-asset ledger a vault custodies.
///
/// Implementations must conserve total supply across transfers, never let a
/// balance go negative, and gate `transfer_from` on a prior approval.
pub trait AssetLedger: Send + Sync {
    /// Identity of the asset. A vault's `asset_reference` must match it.
    fn asset_id(&self) -> Address;

    /// Units held by `account`.
    fn balance_of(&self, account: &Address) -> u128;

    /// Pushes `amount` units from `from` to `to`. The caller is `from`.
    fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError>;

    /// Pulls `amount` units from `owner` to `to` on behalf of `spender`,
    /// consuming `spender`'s allowance.
    fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError>;
}
