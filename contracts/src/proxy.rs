//! # Vault Wrapper
//!
//! [`Vault`] is the stable runtime object behind a vault address. It owns
//! the state record and the event log, and holds a handle to whichever
//! logic generation is currently installed. Every call is delegated to that
//! module; [`Vault::upgrade_to`] swaps the module and nothing else.
//!
//! ## Call Pipeline
//!
//! 1. Check the instance is live (not a template, initialized).
//! 2. For admin-only calls, mint an [`AdminCap`] for the caller.
//! 3. Read the clock once and build a [`CallContext`].
//! 4. Delegate to the installed logic.
//! 5. On success, append staged events to the log. On failure, drop them.
//!
//! Mutating calls take `&mut self`, so calls against one vault are strictly
//! sequential.

use std::fmt;
use std::sync::Arc;

use tokenvault_protocol::clock::Clock;
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::ledger::AssetLedger;
use tokenvault_protocol::storage::{InitState, StateRecord, WithdrawalRequest};
use tracing::{debug, info, warn};

use crate::access::AdminCap;
use crate::error::VaultError;
use crate::events::{EventRecord, VaultEvent};
use crate::logic::{CallContext, InitParams, VaultLogic};

/// A deployed vault instance.
pub struct Vault {
    address: Address,
    state: StateRecord,
    logic: Arc<dyn VaultLogic>,
    ledger: Arc<dyn AssetLedger>,
    clock: Arc<dyn Clock>,
    events: Vec<EventRecord>,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("address", &self.address)
            .field("logic", &self.logic)
            .field("state", &self.state)
            .field("events", &self.events.len())
            .finish()
    }
}

impl Vault {
    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    /// Deploys a live, uninitialized vault running `logic`.
    pub fn deploy(
        logic: Arc<dyn VaultLogic>,
        ledger: Arc<dyn AssetLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = StateRecord::genesis(logic.layout(), clock.now());
        Self::assemble(state, logic, ledger, clock)
    }

    /// Deploys a vault and runs the initializer in the same step.
    pub fn deploy_and_initialize(
        logic: Arc<dyn VaultLogic>,
        ledger: Arc<dyn AssetLedger>,
        clock: Arc<dyn Clock>,
        deployer: Address,
        params: InitParams,
    ) -> Result<Self, VaultError> {
        let mut vault = Self::deploy(logic, ledger, clock);
        vault.initialize(deployer, params)?;
        Ok(vault)
    }

    /// A bare logic template: the module deployed on its own, not wired to a
    /// live record. It can never be initialized or used.
    pub fn template(
        logic: Arc<dyn VaultLogic>,
        ledger: Arc<dyn AssetLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = StateRecord::disabled(logic.layout(), clock.now());
        Self::assemble(state, logic, ledger, clock)
    }

    fn assemble(
        state: StateRecord,
        logic: Arc<dyn VaultLogic>,
        ledger: Arc<dyn AssetLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let address = Address::random();
        debug!(%address, version = logic.version(), init = ?state.init_state(), "vault deployed");
        Self {
            address,
            state,
            logic,
            ledger,
            clock,
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Runs the one-shot initializer.
    pub fn initialize(&mut self, caller: Address, params: InitParams) -> Result<(), VaultError> {
        if self.state.init_state() == InitState::Disabled {
            warn!(vault = %self.address, %caller, "initializer called on template");
            return Err(VaultError::TemplateDisabled);
        }
        self.execute(caller, "initialize", |logic, ctx| logic.initialize(ctx, params))
    }

    /// Replaces the installed logic module. Administrator only.
    ///
    /// The new module's layout must extend the committed one; new extension
    /// fields are materialized with defaults and every existing field keeps
    /// its value.
    pub fn upgrade_to(
        &mut self,
        caller: Address,
        next: Arc<dyn VaultLogic>,
    ) -> Result<(), VaultError> {
        self.ensure_live()?;
        let _cap = AdminCap::authorize(&self.state, caller, "upgrade")?;

        let now = self.clock.now();
        let layout = next.layout();
        self.state.apply_layout(&layout, now).map_err(|err| {
            warn!(vault = %self.address, to = next.version(), error = %err, "upgrade rejected");
            VaultError::from(err)
        })?;

        let from_version = self.state.version_tag().to_string();
        self.state.set_version_tag(next.version());
        self.logic = next;

        let layout_fingerprint = layout.fingerprint();
        info!(
            vault = %self.address,
            from = %from_version,
            to = self.logic.version(),
            fingerprint = %layout_fingerprint,
            "logic upgraded"
        );
        self.commit(
            now,
            vec![VaultEvent::Upgraded {
                from_version,
                to_version: self.logic.version().to_string(),
                layout_fingerprint,
            }],
        );
        Ok(())
    }

    /// Hands the administrator role to `new_admin`. Administrator only.
    pub fn transfer_administrator(
        &mut self,
        caller: Address,
        new_admin: Address,
    ) -> Result<(), VaultError> {
        self.ensure_live()?;
        let cap = AdminCap::authorize(&self.state, caller, "transfer_administrator")?;
        if new_admin.is_zero() {
            return Err(VaultError::ZeroAddress("administrator"));
        }
        let now = self.clock.now();
        self.state.set_administrator(new_admin);
        info!(vault = %self.address, previous = %cap.holder(), new = %new_admin, "administrator transferred");
        self.commit(
            now,
            vec![VaultEvent::AdministratorTransferred {
                previous: cap.holder(),
                new: new_admin,
            }],
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Deposits `amount`; returns the credited amount.
    pub fn deposit(&mut self, caller: Address, amount: u128) -> Result<u128, VaultError> {
        self.ensure_live()?;
        self.execute(caller, "deposit", |logic, ctx| logic.deposit(ctx, amount))
    }

    pub fn withdraw(&mut self, caller: Address, amount: u128) -> Result<(), VaultError> {
        self.ensure_live()?;
        self.execute(caller, "withdraw", |logic, ctx| logic.withdraw(ctx, amount))
    }

    pub fn pause_deposits(&mut self, caller: Address) -> Result<(), VaultError> {
        self.admin_call(caller, "pause_deposits", |logic, ctx, cap| {
            logic.pause_deposits(ctx, cap)
        })
    }

    pub fn resume_deposits(&mut self, caller: Address) -> Result<(), VaultError> {
        self.admin_call(caller, "resume_deposits", |logic, ctx, cap| {
            logic.resume_deposits(ctx, cap)
        })
    }

    pub fn set_yield_rate(&mut self, caller: Address, bps: u16) -> Result<(), VaultError> {
        self.admin_call(caller, "set_yield_rate", |logic, ctx, cap| {
            logic.set_yield_rate(ctx, cap, bps)
        })
    }

    pub fn set_withdrawal_delay(&mut self, caller: Address, seconds: u64) -> Result<(), VaultError> {
        self.admin_call(caller, "set_withdrawal_delay", |logic, ctx, cap| {
            logic.set_withdrawal_delay(ctx, cap, seconds)
        })
    }

    pub fn set_emergency_penalty(&mut self, caller: Address, bps: u16) -> Result<(), VaultError> {
        self.admin_call(caller, "set_emergency_penalty", |logic, ctx, cap| {
            logic.set_emergency_penalty(ctx, cap, bps)
        })
    }

    pub fn request_withdrawal(&mut self, caller: Address, amount: u128) -> Result<(), VaultError> {
        self.ensure_live()?;
        self.execute(caller, "request_withdrawal", |logic, ctx| {
            logic.request_withdrawal(ctx, amount)
        })
    }

    /// Executes the caller's pending request; returns the amount paid out.
    pub fn execute_withdrawal(&mut self, caller: Address) -> Result<u128, VaultError> {
        self.ensure_live()?;
        self.execute(caller, "execute_withdrawal", |logic, ctx| {
            logic.execute_withdrawal(ctx)
        })
    }

    /// Exits the caller's whole position immediately; returns the amount
    /// paid out.
    pub fn emergency_withdraw(&mut self, caller: Address) -> Result<u128, VaultError> {
        self.ensure_live()?;
        self.execute(caller, "emergency_withdraw", |logic, ctx| {
            logic.emergency_withdraw(ctx)
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn balance_of(&self, user: &Address) -> u128 {
        self.state.balance_of(user)
    }

    pub fn total_deposits(&self) -> u128 {
        self.state.total_deposits()
    }

    /// Version tag recorded in state, e.g. `"V1"`.
    pub fn implementation_version(&self) -> &str {
        self.state.version_tag()
    }

    pub fn deposit_fee(&self) -> u16 {
        self.state.deposit_fee_bps()
    }

    pub fn administrator(&self) -> Address {
        self.state.administrator()
    }

    pub fn asset(&self) -> Address {
        self.state.asset_reference()
    }

    pub fn is_administrator(&self, who: &Address) -> bool {
        self.state.is_initialized() && !who.is_zero() && self.state.administrator() == *who
    }

    pub fn is_deposits_paused(&self) -> Result<bool, VaultError> {
        self.logic.is_deposits_paused(&self.state)
    }

    pub fn yield_rate(&self) -> Result<u16, VaultError> {
        self.logic.yield_rate(&self.state)
    }

    /// Projected yield for `user` as of now.
    pub fn user_yield(&self, user: &Address) -> Result<u128, VaultError> {
        self.logic.user_yield(&self.state, user, self.clock.now())
    }

    pub fn withdrawal_delay(&self) -> Result<u64, VaultError> {
        self.logic.withdrawal_delay(&self.state)
    }

    /// Pending request for `user`, or [`WithdrawalRequest::NONE`].
    pub fn withdrawal_request(&self, user: &Address) -> Result<WithdrawalRequest, VaultError> {
        self.logic.withdrawal_request(&self.state, user)
    }

    pub fn emergency_penalty(&self) -> Result<u16, VaultError> {
        self.logic.emergency_penalty(&self.state)
    }

    /// Committed events, oldest first.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Read-only view of the state record.
    pub fn state(&self) -> &StateRecord {
        &self.state
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_live(&self) -> Result<(), VaultError> {
        match self.state.init_state() {
            InitState::Initialized => Ok(()),
            InitState::Uninitialized => Err(VaultError::NotInitialized),
            InitState::Disabled => Err(VaultError::TemplateDisabled),
        }
    }

    fn admin_call<T>(
        &mut self,
        caller: Address,
        action: &'static str,
        op: impl FnOnce(&dyn VaultLogic, &mut CallContext<'_>, &AdminCap) -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        self.ensure_live()?;
        let cap = AdminCap::authorize(&self.state, caller, action)?;
        self.execute(caller, action, |logic, ctx| op(logic, ctx, &cap))
    }

    fn execute<T>(
        &mut self,
        caller: Address,
        operation: &'static str,
        op: impl FnOnce(&dyn VaultLogic, &mut CallContext<'_>) -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        let now = self.clock.now();
        let logic = Arc::clone(&self.logic);
        debug!(vault = %self.address, %caller, operation, version = logic.version(), "delegating call");

        let mut ctx = CallContext::new(
            caller,
            self.address,
            now,
            &mut self.state,
            self.ledger.as_ref(),
        );
        let outcome = op(logic.as_ref(), &mut ctx);
        let staged = ctx.into_events();

        match outcome {
            Ok(value) => {
                self.commit(now, staged);
                Ok(value)
            }
            Err(err) => {
                warn!(
                    vault = %self.address,
                    %caller,
                    operation,
                    kind = ?err.kind(),
                    error = %err,
                    "call rejected"
                );
                Err(err)
            }
        }
    }

    fn commit(&mut self, now: u64, staged: Vec<VaultEvent>) {
        for event in staged {
            let sequence = self.events.len() as u64;
            debug!(sequence, event = event.name(), "event committed");
            self.events.push(EventRecord {
                sequence,
                emitted_at: now,
                event,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v1::TokenVaultV1;
    use crate::v2::TokenVaultV2;
    use tokenvault_protocol::clock::ManualClock;
    use tokenvault_protocol::ledger::InMemoryToken;

    fn setup() -> (Vault, Arc<InMemoryToken>, Address) {
        let asset = Address::from_label("asset");
        let admin = Address::from_label("admin");
        let token = Arc::new(InMemoryToken::new(asset, "TKN", admin, 1_000));
        let vault = Vault::deploy_and_initialize(
            Arc::new(TokenVaultV1),
            token.clone(),
            Arc::new(ManualClock::new(0)),
            admin,
            InitParams {
                asset,
                administrator: admin,
                deposit_fee_bps: 500,
            },
        )
        .unwrap();
        (vault, token, admin)
    }

    #[test]
    fn failed_call_commits_no_events() {
        let (mut vault, _token, admin) = setup();
        assert_eq!(vault.events().len(), 1);
        assert!(vault.deposit(admin, 100).is_err()); // no allowance
        assert_eq!(vault.events().len(), 1);
        assert_eq!(vault.total_deposits(), 0);
    }

    #[test]
    fn uninitialized_vault_refuses_operations() {
        let token = Arc::new(InMemoryToken::new(
            Address::from_label("asset"),
            "TKN",
            Address::from_label("x"),
            0,
        ));
        let mut vault = Vault::deploy(
            Arc::new(TokenVaultV1),
            token,
            Arc::new(ManualClock::new(0)),
        );
        assert_eq!(
            vault.deposit(Address::from_label("x"), 1),
            Err(VaultError::NotInitialized)
        );
        assert!(!vault.is_administrator(&Address::ZERO));
    }

    #[test]
    fn administrator_transfer_moves_the_role() {
        let (mut vault, _token, admin) = setup();
        let next = Address::from_label("next-admin");
        assert_eq!(
            vault.transfer_administrator(admin, Address::ZERO),
            Err(VaultError::ZeroAddress("administrator"))
        );
        vault.transfer_administrator(admin, next).unwrap();
        assert!(vault.is_administrator(&next));
        assert!(!vault.is_administrator(&admin));
        assert!(matches!(
            vault.upgrade_to(admin, Arc::new(TokenVaultV2)),
            Err(VaultError::Unauthorized { .. })
        ));
        vault.upgrade_to(next, Arc::new(TokenVaultV2)).unwrap();
        assert_eq!(vault.implementation_version(), "V2");
    }
}
