//! # Vault Events
//!
//! Notifications for off-system observers. Events raised inside a call are
//! staged and only appended to the vault's log when the call succeeds; a
//! failed call leaves no trace in the log.

use serde::{Deserialize, Serialize};
use tokenvault_protocol::identity::Address;

/// Something observable that happened to a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultEvent {
    Initialized {
        asset: Address,
        administrator: Address,
        deposit_fee_bps: u16,
    },
    Deposited {
        user: Address,
        amount: u128,
        fee: u128,
        credited: u128,
    },
    Withdrawn {
        user: Address,
        amount: u128,
    },
    DepositsPaused {
        by: Address,
    },
    DepositsResumed {
        by: Address,
    },
    YieldRateUpdated {
        previous_bps: u16,
        new_bps: u16,
    },
    WithdrawalDelayUpdated {
        previous_seconds: u64,
        new_seconds: u64,
    },
    EmergencyPenaltyUpdated {
        previous_bps: u16,
        new_bps: u16,
    },
    WithdrawalRequested {
        user: Address,
        amount: u128,
        requested_at: u64,
    },
    WithdrawalExecuted {
        user: Address,
        amount: u128,
    },
    /// A pending request was dropped because a plain withdrawal left less
    /// than the requested amount.
    WithdrawalRequestCancelled {
        user: Address,
        amount: u128,
    },
    /// The caller left through the emergency exit. `amount` is what was paid
    /// out; `penalty` stayed in the vault.
    EmergencyWithdrawn {
        user: Address,
        amount: u128,
        penalty: u128,
    },
    Upgraded {
        from_version: String,
        to_version: String,
        layout_fingerprint: String,
    },
    AdministratorTransferred {
        previous: Address,
        new: Address,
    },
}

impl VaultEvent {
    /// Short name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::Initialized { .. } => "Initialized",
            VaultEvent::Deposited { .. } => "Deposited",
            VaultEvent::Withdrawn { .. } => "Withdrawn",
            VaultEvent::DepositsPaused { .. } => "DepositsPaused",
            VaultEvent::DepositsResumed { .. } => "DepositsResumed",
            VaultEvent::YieldRateUpdated { .. } => "YieldRateUpdated",
            VaultEvent::WithdrawalDelayUpdated { .. } => "WithdrawalDelayUpdated",
            VaultEvent::EmergencyPenaltyUpdated { .. } => "EmergencyPenaltyUpdated",
            VaultEvent::WithdrawalRequested { .. } => "WithdrawalRequested",
            VaultEvent::WithdrawalExecuted { .. } => "WithdrawalExecuted",
            VaultEvent::WithdrawalRequestCancelled { .. } => "WithdrawalRequestCancelled",
            VaultEvent::EmergencyWithdrawn { .. } => "EmergencyWithdrawn",
            VaultEvent::Upgraded { .. } => "Upgraded",
            VaultEvent::AdministratorTransferred { .. } => "AdministratorTransferred",
        }
    }
}

/// A committed event with its position in the vault's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub emitted_at: u64,
    pub event: VaultEvent,
}
