//! # Administrator Capability
//!
//! Admin-only logic operations take an [`AdminCap`] argument. The only way
//! to obtain one is [`AdminCap::authorize`], which the vault wrapper calls
//! once at the entry of every privileged call. Logic generations therefore
//! cannot forget the role check: without the capability the operation does
//! not type-check.

use tokenvault_protocol::identity::Address;
use tokenvault_protocol::storage::StateRecord;
use tracing::warn;

use crate::error::VaultError;

/// Proof that the current caller is the vault administrator.
///
/// Not `Clone`, not constructible outside this crate, and only valid for the
/// call it was minted for.
#[derive(Debug)]
pub struct AdminCap {
    holder: Address,
}

impl AdminCap {
    /// Checks `caller` against the administrator recorded in `state`.
    pub(crate) fn authorize(
        state: &StateRecord,
        caller: Address,
        action: &'static str,
    ) -> Result<Self, VaultError> {
        if !state.is_initialized() || caller.is_zero() || state.administrator() != caller {
            warn!(%caller, action, "unauthorized admin call");
            return Err(VaultError::Unauthorized { caller, action });
        }
        Ok(Self { holder: caller })
    }

    /// The administrator this capability was issued to.
    pub fn holder(&self) -> Address {
        self.holder
    }
}
