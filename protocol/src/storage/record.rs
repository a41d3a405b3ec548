//! # Persistent State Record
//!
//! One [`StateRecord`] exists per deployed vault. It is created at genesis,
//! initialized once, and then mutated in place by whichever logic generation
//! is installed. Upgrades never rebuild it: they only append extension
//! fields into reserved space via [`StateRecord::apply_layout`].
//!
//! The record is a composition, one block per generation:
//!
//! ```text
//! StateRecord
//! ├── layout            committed slot schema
//! ├── core              generation 1 (always present)
//! ├── yield_fields      generation 2 (None until a v2+ layout is applied)
//! └── withdrawal_fields generation 3 (None until a v3 layout is applied)
//! ```
//!
//! Fields are private. Reads go through typed accessors; writes go through
//! methods that keep `total_deposits == sum(balances)` and never let a
//! balance go below zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::layout::{LayoutError, StorageLayout};
use crate::config::{WITHDRAWAL_EXTENSION_GENERATION, YIELD_EXTENSION_GENERATION};
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the record's own mutators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The one-shot latch is already set.
    #[error("state record is already initialized")]
    AlreadyInitialized,

    /// The record belongs to a bare logic template and can never be used.
    #[error("state record belongs to a disabled logic template")]
    Disabled,

    /// A debit exceeds the recorded balance.
    #[error("insufficient balance for {user}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Account being debited.
        user: Address,
        /// Recorded balance.
        available: u128,
        /// Requested debit.
        requested: u128,
    },

    /// A credit would overflow a balance or the running total.
    #[error("balance arithmetic overflow")]
    Overflow,

    /// A generation extension was accessed before its layout was applied.
    #[error("storage extension '{0}' is not present in the committed layout")]
    ExtensionMissing(&'static str),

    /// The offered layout is incompatible with the committed one.
    #[error("layout incompatible: {0}")]
    Layout(#[from] LayoutError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle of the initialization latch.
///
/// `Disabled` is a dead end: a record created for a bare logic template
/// starts there and has no transition out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitState {
    /// Live instance, waiting for its one initializer call.
    Uninitialized,
    /// Initialized. Permanent.
    Initialized,
    /// Bare template. Permanent.
    Disabled,
}

/// A pending delayed withdrawal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: u128,
    pub requested_at: u64,
}

impl WithdrawalRequest {
    /// The zero value returned when no request is outstanding.
    pub const NONE: WithdrawalRequest = WithdrawalRequest {
        amount: 0,
        requested_at: 0,
    };

    /// `true` for the zero value.
    pub fn is_none(&self) -> bool {
        self.amount == 0 && self.requested_at == 0
    }
}

/// Generation 1 fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreFields {
    asset_reference: Address,
    administrator: Address,
    deposit_fee_bps: u16,
    total_deposits: u128,
    balances: BTreeMap<Address, u128>,
    version_tag: String,
    init: InitState,
}

/// Generation 2 fields: pause flag and yield accrual basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldFields {
    deposits_paused: bool,
    yield_rate_bps: u16,
    accrual_checkpoints: BTreeMap<Address, u64>,
    /// When the extension was installed; the accrual basis for positions
    /// opened before generation 2.
    accrual_epoch: u64,
}

impl YieldFields {
    fn installed_at(now: u64) -> Self {
        Self {
            deposits_paused: false,
            yield_rate_bps: 0,
            accrual_checkpoints: BTreeMap::new(),
            accrual_epoch: now,
        }
    }

    pub fn deposits_paused(&self) -> bool {
        self.deposits_paused
    }

    pub fn yield_rate_bps(&self) -> u16 {
        self.yield_rate_bps
    }

    pub fn accrual_epoch(&self) -> u64 {
        self.accrual_epoch
    }

    /// The user's accrual checkpoint, if their position was opened under
    /// generation 2 or later.
    pub fn checkpoint(&self, user: &Address) -> Option<u64> {
        self.accrual_checkpoints.get(user).copied()
    }

    /// The timestamp yield for `user` is measured from.
    pub fn accrual_basis(&self, user: &Address) -> u64 {
        self.checkpoint(user).unwrap_or(self.accrual_epoch)
    }

    pub fn set_deposits_paused(&mut self, paused: bool) {
        self.deposits_paused = paused;
    }

    pub fn set_yield_rate_bps(&mut self, bps: u16) {
        self.yield_rate_bps = bps;
    }

    pub fn set_checkpoint(&mut self, user: Address, basis: u64) {
        self.accrual_checkpoints.insert(user, basis);
    }

    pub fn close_checkpoint(&mut self, user: &Address) {
        self.accrual_checkpoints.remove(user);
    }
}

/// Generation 3 fields: withdrawal delay, pending requests, exit penalty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalFields {
    withdrawal_delay_seconds: u64,
    withdrawal_requests: BTreeMap<Address, WithdrawalRequest>,
    emergency_penalty_bps: u16,
}

impl WithdrawalFields {
    pub fn withdrawal_delay_seconds(&self) -> u64 {
        self.withdrawal_delay_seconds
    }

    pub fn emergency_penalty_bps(&self) -> u16 {
        self.emergency_penalty_bps
    }

    pub fn request(&self, user: &Address) -> Option<&WithdrawalRequest> {
        self.withdrawal_requests.get(user)
    }

    pub fn set_withdrawal_delay_seconds(&mut self, seconds: u64) {
        self.withdrawal_delay_seconds = seconds;
    }

    pub fn set_emergency_penalty_bps(&mut self, bps: u16) {
        self.emergency_penalty_bps = bps;
    }

    pub fn insert_request(&mut self, user: Address, request: WithdrawalRequest) {
        self.withdrawal_requests.insert(user, request);
    }

    pub fn take_request(&mut self, user: &Address) -> Option<WithdrawalRequest> {
        self.withdrawal_requests.remove(user)
    }
}

// ---------------------------------------------------------------------------
// StateRecord
// ---------------------------------------------------------------------------

/// The single long-lived state object of a vault instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    layout: StorageLayout,
    core: CoreFields,
    yield_fields: Option<YieldFields>,
    withdrawal_fields: Option<WithdrawalFields>,
}

impl StateRecord {
    /// Genesis record for a live instance, laid out for `layout`.
    pub fn genesis(layout: StorageLayout, now: u64) -> Self {
        Self::with_init_state(layout, InitState::Uninitialized, now)
    }

    /// Record for a bare logic template. Permanently disabled.
    pub fn disabled(layout: StorageLayout, now: u64) -> Self {
        Self::with_init_state(layout, InitState::Disabled, now)
    }

    fn with_init_state(layout: StorageLayout, init: InitState, now: u64) -> Self {
        let mut record = Self {
            layout: StorageLayout::empty(layout.capacity()),
            core: CoreFields {
                asset_reference: Address::ZERO,
                administrator: Address::ZERO,
                deposit_fee_bps: 0,
                total_deposits: 0,
                balances: BTreeMap::new(),
                version_tag: String::new(),
                init,
            },
            yield_fields: None,
            withdrawal_fields: None,
        };
        record.materialize(&layout, now);
        record.layout = layout;
        record
    }

    // -- reads ---------------------------------------------------------------

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn asset_reference(&self) -> Address {
        self.core.asset_reference
    }

    pub fn administrator(&self) -> Address {
        self.core.administrator
    }

    pub fn deposit_fee_bps(&self) -> u16 {
        self.core.deposit_fee_bps
    }

    pub fn total_deposits(&self) -> u128 {
        self.core.total_deposits
    }

    /// Credited balance of `user`; zero when absent.
    pub fn balance_of(&self, user: &Address) -> u128 {
        self.core.balances.get(user).copied().unwrap_or(0)
    }

    /// All non-zero balances in address order.
    pub fn balances(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.core.balances.iter()
    }

    pub fn version_tag(&self) -> &str {
        &self.core.version_tag
    }

    pub fn init_state(&self) -> InitState {
        self.core.init
    }

    pub fn is_initialized(&self) -> bool {
        self.core.init == InitState::Initialized
    }

    /// Placeholder slots left for future generations.
    pub fn reserved_slots(&self) -> u16 {
        self.layout.reserved_slots()
    }

    pub fn yield_fields(&self) -> Option<&YieldFields> {
        self.yield_fields.as_ref()
    }

    pub fn withdrawal_fields(&self) -> Option<&WithdrawalFields> {
        self.withdrawal_fields.as_ref()
    }

    /// Sum of every recorded balance.
    pub fn sum_of_balances(&self) -> Option<u128> {
        self.core
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
    }

    /// `total_deposits == sum(balances)`.
    pub fn conservation_holds(&self) -> bool {
        self.sum_of_balances() == Some(self.core.total_deposits)
    }

    // -- lifecycle -----------------------------------------------------------

    /// Sets the genesis configuration and flips the latch.
    ///
    /// Fails on a disabled template or an already-initialized record; in
    /// both cases nothing is written.
    pub fn initialize(
        &mut self,
        asset_reference: Address,
        administrator: Address,
        deposit_fee_bps: u16,
        version_tag: &str,
    ) -> Result<(), StorageError> {
        match self.core.init {
            InitState::Disabled => return Err(StorageError::Disabled),
            InitState::Initialized => return Err(StorageError::AlreadyInitialized),
            InitState::Uninitialized => {}
        }
        self.core.asset_reference = asset_reference;
        self.core.administrator = administrator;
        self.core.deposit_fee_bps = deposit_fee_bps;
        self.core.total_deposits = 0;
        self.core.version_tag = version_tag.to_string();
        self.core.init = InitState::Initialized;
        Ok(())
    }

    pub fn set_administrator(&mut self, administrator: Address) {
        self.core.administrator = administrator;
    }

    pub fn set_version_tag(&mut self, version_tag: &str) {
        self.core.version_tag = version_tag.to_string();
    }

    /// Commits a newer layout and materializes any extension it introduces.
    ///
    /// Existing fields keep their values; new extension fields start at their
    /// defaults. Fails without change if the layout is incompatible.
    pub fn apply_layout(&mut self, next: &StorageLayout, now: u64) -> Result<(), StorageError> {
        self.layout.check_upgrade(next)?;
        self.materialize(next, now);
        debug!(
            from = self.layout.generation(),
            to = next.generation(),
            reserved = next.reserved_slots(),
            "storage layout applied"
        );
        self.layout = next.clone();
        Ok(())
    }

    fn materialize(&mut self, layout: &StorageLayout, now: u64) {
        if layout.generation() >= YIELD_EXTENSION_GENERATION && self.yield_fields.is_none() {
            self.yield_fields = Some(YieldFields::installed_at(now));
        }
        if layout.generation() >= WITHDRAWAL_EXTENSION_GENERATION
            && self.withdrawal_fields.is_none()
        {
            self.withdrawal_fields = Some(WithdrawalFields::default());
        }
    }

    // -- balances ------------------------------------------------------------

    /// Checks that `credit(user, amount)` would succeed.
    pub fn ensure_creditable(&self, user: &Address, amount: u128) -> Result<(), StorageError> {
        self.balance_of(user)
            .checked_add(amount)
            .ok_or(StorageError::Overflow)?;
        self.core
            .total_deposits
            .checked_add(amount)
            .ok_or(StorageError::Overflow)?;
        Ok(())
    }

    /// Checks that `debit(user, amount)` would succeed.
    pub fn ensure_debitable(&self, user: &Address, amount: u128) -> Result<(), StorageError> {
        let available = self.balance_of(user);
        if amount > available {
            return Err(StorageError::InsufficientBalance {
                user: *user,
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Adds `amount` to the user's balance and to the running total.
    /// Returns the new balance.
    pub fn credit(&mut self, user: Address, amount: u128) -> Result<u128, StorageError> {
        self.ensure_creditable(&user, amount)?;
        let balance = self.balance_of(&user) + amount;
        if balance > 0 {
            self.core.balances.insert(user, balance);
        }
        self.core.total_deposits += amount;
        Ok(balance)
    }

    /// Removes `amount` from the user's balance and the running total.
    /// A balance that reaches zero is removed. Returns the new balance.
    pub fn debit(&mut self, user: Address, amount: u128) -> Result<u128, StorageError> {
        self.ensure_debitable(&user, amount)?;
        let balance = self.balance_of(&user) - amount;
        if balance == 0 {
            self.core.balances.remove(&user);
        } else {
            self.core.balances.insert(user, balance);
        }
        // total_deposits >= balance(user) >= amount while conservation holds
        self.core.total_deposits = self.core.total_deposits.saturating_sub(amount);
        Ok(balance)
    }

    // -- extensions ----------------------------------------------------------

    pub fn yield_fields_mut(&mut self) -> Result<&mut YieldFields, StorageError> {
        self.yield_fields
            .as_mut()
            .ok_or(StorageError::ExtensionMissing("yield"))
    }

    pub fn withdrawal_fields_mut(&mut self) -> Result<&mut WithdrawalFields, StorageError> {
        self.withdrawal_fields
            .as_mut()
            .ok_or(StorageError::ExtensionMissing("withdrawal"))
    }

    /// JSON snapshot for operators.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
