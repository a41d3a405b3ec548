//! # Logic Modules
//!
//! A logic module is a stateless bundle of behavior that operates on a
//! vault's state record. The vault wrapper owns the record and delegates
//! each call to whichever module is installed; replacing the module changes
//! behavior, never state.
//!
//! Every generation implements [`VaultLogic`]. Operations a generation does
//! not provide keep their default body, which fails with
//! [`VaultError::Unsupported`], the same outcome as calling a function the
//! installed code does not have.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::ledger::AssetLedger;
use tokenvault_protocol::storage::{StateRecord, StorageLayout, WithdrawalRequest};

use crate::access::AdminCap;
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::v1;

/// Arguments to the one-shot initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitParams {
    pub asset: Address,
    pub administrator: Address,
    pub deposit_fee_bps: u16,
}

/// Everything a logic operation may touch during one call.
pub struct CallContext<'a> {
    /// Who is calling.
    pub caller: Address,
    /// The vault's own address on the asset ledger.
    pub vault: Address,
    /// Time of the call, read once at entry.
    pub now: u64,
    /// The persistent state record.
    pub state: &'a mut StateRecord,
    /// The external asset ledger.
    pub ledger: &'a dyn AssetLedger,
    staged: Vec<VaultEvent>,
}

impl<'a> CallContext<'a> {
    pub fn new(
        caller: Address,
        vault: Address,
        now: u64,
        state: &'a mut StateRecord,
        ledger: &'a dyn AssetLedger,
    ) -> Self {
        Self {
            caller,
            vault,
            now,
            state,
            ledger,
            staged: Vec::new(),
        }
    }

    /// Stages an event. It is published only if the call succeeds.
    pub fn emit(&mut self, event: VaultEvent) {
        self.staged.push(event);
    }

    /// Consumes the context and returns the staged events.
    pub fn into_events(self) -> Vec<VaultEvent> {
        self.staged
    }
}

/// Behavior of one vault generation.
pub trait VaultLogic: Send + Sync + fmt::Debug {
    /// Version tag written into the record while this module is installed.
    fn version(&self) -> &'static str;

    /// Slot layout this module reads and writes.
    fn layout(&self) -> StorageLayout;

    fn unsupported(&self, operation: &'static str) -> VaultError {
        VaultError::Unsupported {
            operation,
            version: self.version(),
        }
    }

    // -- generation 1 --------------------------------------------------------

    /// One-shot initializer. Shared by every generation.
    fn initialize(&self, ctx: &mut CallContext<'_>, params: InitParams) -> Result<(), VaultError> {
        v1::initialize(ctx, params, self.version())
    }

    /// Deposits `amount`; returns the credited amount after fees.
    fn deposit(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<u128, VaultError>;

    /// Withdraws `amount` of the caller's credited balance.
    fn withdraw(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError>;

    // -- generation 2 --------------------------------------------------------

    fn pause_deposits(&self, _ctx: &mut CallContext<'_>, _cap: &AdminCap) -> Result<(), VaultError> {
        Err(self.unsupported("pause_deposits"))
    }

    fn resume_deposits(
        &self,
        _ctx: &mut CallContext<'_>,
        _cap: &AdminCap,
    ) -> Result<(), VaultError> {
        Err(self.unsupported("resume_deposits"))
    }

    fn set_yield_rate(
        &self,
        _ctx: &mut CallContext<'_>,
        _cap: &AdminCap,
        _bps: u16,
    ) -> Result<(), VaultError> {
        Err(self.unsupported("set_yield_rate"))
    }

    fn is_deposits_paused(&self, _state: &StateRecord) -> Result<bool, VaultError> {
        Err(self.unsupported("is_deposits_paused"))
    }

    fn yield_rate(&self, _state: &StateRecord) -> Result<u16, VaultError> {
        Err(self.unsupported("yield_rate"))
    }

    fn user_yield(
        &self,
        _state: &StateRecord,
        _user: &Address,
        _now: u64,
    ) -> Result<u128, VaultError> {
        Err(self.unsupported("user_yield"))
    }

    // -- generation 3 --------------------------------------------------------

    fn set_withdrawal_delay(
        &self,
        _ctx: &mut CallContext<'_>,
        _cap: &AdminCap,
        _seconds: u64,
    ) -> Result<(), VaultError> {
        Err(self.unsupported("set_withdrawal_delay"))
    }

    fn set_emergency_penalty(
        &self,
        _ctx: &mut CallContext<'_>,
        _cap: &AdminCap,
        _bps: u16,
    ) -> Result<(), VaultError> {
        Err(self.unsupported("set_emergency_penalty"))
    }

    fn request_withdrawal(
        &self,
        _ctx: &mut CallContext<'_>,
        _amount: u128,
    ) -> Result<(), VaultError> {
        Err(self.unsupported("request_withdrawal"))
    }

    /// Executes the caller's pending request; returns the amount paid out.
    fn execute_withdrawal(&self, _ctx: &mut CallContext<'_>) -> Result<u128, VaultError> {
        Err(self.unsupported("execute_withdrawal"))
    }

    /// Withdraws the caller's full balance immediately; returns the amount
    /// paid out.
    fn emergency_withdraw(&self, _ctx: &mut CallContext<'_>) -> Result<u128, VaultError> {
        Err(self.unsupported("emergency_withdraw"))
    }

    fn withdrawal_delay(&self, _state: &StateRecord) -> Result<u64, VaultError> {
        Err(self.unsupported("withdrawal_delay"))
    }

    fn emergency_penalty(&self, _state: &StateRecord) -> Result<u16, VaultError> {
        Err(self.unsupported("emergency_penalty"))
    }

    fn withdrawal_request(
        &self,
        _state: &StateRecord,
        _user: &Address,
    ) -> Result<WithdrawalRequest, VaultError> {
        Err(self.unsupported("withdrawal_request"))
    }
}
