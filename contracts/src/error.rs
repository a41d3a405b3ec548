//! Error types for vault operations.
//!
//! Every vault call that can fail returns a [`VaultError`]. A failed call
//! leaves the state record, the event log and the asset ledger exactly as
//! they were before the call. Nothing is retried here; retry is the caller's
//! policy.

use thiserror::Error;
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::ledger::LedgerError;
use tokenvault_protocol::storage::{LayoutError, StorageError};

/// Coarse classification of a [`VaultError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks the required role, or the instance is a bare template.
    Authorization,
    /// Operation invoked in the wrong lifecycle state.
    State,
    /// Out-of-range or zero-valued input.
    Validation,
    /// Amount exceeds the recorded balance.
    InsufficientBalance,
    /// A time or pause precondition is not met.
    Precondition,
    /// The external asset ledger refused the transfer.
    ExternalTransfer,
}

/// Errors that can occur during vault operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The caller is not the administrator.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// Who called.
        caller: Address,
        /// What they tried to do.
        action: &'static str,
    },

    /// The instance is a bare logic template and can never be initialized
    /// or used.
    #[error("logic template is disabled and cannot be initialized or used")]
    TemplateDisabled,

    /// The initializer already ran on this record.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// The vault has not been initialized yet.
    #[error("vault is not initialized")]
    NotInitialized,

    /// The installed generation does not provide this operation.
    #[error("operation '{operation}' is not supported by logic {version}")]
    Unsupported {
        /// Operation name.
        operation: &'static str,
        /// Installed version tag.
        version: &'static str,
    },

    /// A withdrawal request is already outstanding for this caller.
    #[error("withdrawal request already pending for {0}")]
    RequestAlreadyPending(Address),

    /// No withdrawal request is outstanding for this caller.
    #[error("no pending withdrawal request for {0}")]
    NoPendingRequest(Address),

    /// The storage layout of the new logic would reinterpret existing state.
    #[error("incompatible storage layout: {0}")]
    IncompatibleLayout(#[from] LayoutError),

    /// A generation extension is missing from the state record.
    #[error("storage extension '{0}' is missing")]
    ExtensionMissing(&'static str),

    /// Amount must be greater than zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// A basis-point parameter is outside its allowed range.
    #[error("{parameter} of {value} bps exceeds the maximum of {max} bps")]
    BpsOutOfRange {
        /// Parameter name.
        parameter: &'static str,
        /// Offered value.
        value: u16,
        /// Allowed maximum.
        max: u16,
    },

    /// An address parameter is the zero address.
    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    /// The asset reference does not match the ledger the vault is wired to.
    #[error("asset reference {given} does not match ledger asset {expected}")]
    AssetMismatch {
        /// Asset given to the initializer.
        given: Address,
        /// Asset of the wired ledger.
        expected: Address,
    },

    /// Amount exceeds the caller's recorded balance.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Recorded balance.
        available: u128,
        /// Requested amount.
        requested: u128,
    },

    /// Balance arithmetic would overflow.
    #[error("balance overflow")]
    Overflow,

    /// Deposits are paused.
    #[error("deposits are paused")]
    DepositsPaused,

    /// The withdrawal delay has not elapsed.
    #[error("delay not met: executable at {ready_at}, now {now}")]
    DelayNotMet {
        /// Earliest executable timestamp.
        ready_at: u64,
        /// Time of the call.
        now: u64,
    },

    /// The asset ledger refused a transfer.
    #[error("asset transfer failed: {0}")]
    Transfer(#[from] LedgerError),
}

impl VaultError {
    /// Maps the error onto the vault's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Unauthorized { .. } | VaultError::TemplateDisabled => {
                ErrorKind::Authorization
            }
            VaultError::AlreadyInitialized
            | VaultError::NotInitialized
            | VaultError::Unsupported { .. }
            | VaultError::RequestAlreadyPending(_)
            | VaultError::NoPendingRequest(_)
            | VaultError::IncompatibleLayout(_)
            | VaultError::ExtensionMissing(_) => ErrorKind::State,
            VaultError::ZeroAmount
            | VaultError::BpsOutOfRange { .. }
            | VaultError::ZeroAddress(_)
            | VaultError::AssetMismatch { .. }
            | VaultError::Overflow => ErrorKind::Validation,
            VaultError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            VaultError::DepositsPaused | VaultError::DelayNotMet { .. } => ErrorKind::Precondition,
            VaultError::Transfer(_) => ErrorKind::ExternalTransfer,
        }
    }
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyInitialized => VaultError::AlreadyInitialized,
            StorageError::Disabled => VaultError::TemplateDisabled,
            StorageError::InsufficientBalance {
                available,
                requested,
                ..
            } => VaultError::InsufficientBalance {
                available,
                requested,
            },
            StorageError::Overflow => VaultError::Overflow,
            StorageError::ExtensionMissing(name) => VaultError::ExtensionMissing(name),
            StorageError::Layout(layout) => VaultError::IncompatibleLayout(layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_vault_taxonomy() {
        let err: VaultError = StorageError::InsufficientBalance {
            user: Address::from_label("u"),
            available: 0,
            requested: 1,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(
            VaultError::from(StorageError::Disabled).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            VaultError::from(StorageError::AlreadyInitialized).kind(),
            ErrorKind::State
        );
    }

    #[test]
    fn ledger_errors_are_external() {
        let err: VaultError = LedgerError::ZeroAddress.into();
        assert_eq!(err.kind(), ErrorKind::ExternalTransfer);
    }

    #[test]
    fn delay_message_names_ready_time() {
        let err = VaultError::DelayNotMet {
            ready_at: 86_400,
            now: 10,
        };
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.to_string().contains("delay not met"));
    }
}
