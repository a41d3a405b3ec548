//! # Token Vault Contracts
//!
//! Business logic for the upgradeable token vault. A [`Vault`] owns one
//! persistent state record and delegates every call to the installed logic
//! generation:
//!
//! - **V1**: fee-bearing deposits and balance-checked withdrawals.
//! - **V2**: adds pausable deposits and a linear yield projection.
//! - **V3**: adds delayed withdrawal requests and an emergency exit.
//!
//! ## Design Principles
//!
//! 1. Upgrades swap behavior, never state. The record is extended in place
//!    and every committed field keeps its slot and its value.
//! 2. All balance arithmetic is checked. A deposit that would overflow is
//!    refused before any asset moves.
//! 3. Admin-only operations require an [`AdminCap`], minted once per call.
//! 4. A failed call changes nothing: not the record, not the ledger, not the
//!    event log.

use std::sync::Arc;

pub mod access;
pub mod error;
pub mod events;
pub mod logic;
pub mod proxy;
pub mod v1;
pub mod v2;
pub mod v3;

pub use access::AdminCap;
pub use error::{ErrorKind, VaultError};
pub use events::{EventRecord, VaultEvent};
pub use logic::{CallContext, InitParams, VaultLogic};
pub use proxy::Vault;
pub use v1::TokenVaultV1;
pub use v2::TokenVaultV2;
pub use v3::TokenVaultV3;

/// The logic module for `generation`, if one exists.
pub fn logic_for_generation(generation: u8) -> Option<Arc<dyn VaultLogic>> {
    match generation {
        1 => Some(Arc::new(TokenVaultV1)),
        2 => Some(Arc::new(TokenVaultV2)),
        3 => Some(Arc::new(TokenVaultV3)),
        _ => None,
    }
}
