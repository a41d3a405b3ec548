//! # Generation 3: Delayed and Emergency Withdrawal
//!
//! Keeps everything generation 2 does and adds a per-user withdrawal queue:
//!
//! ```text
//!   None ──request──▶ Requested ──execute (now >= requested_at + delay)──▶ None
//!                         │
//!                         └──────────── emergency_withdraw ──────────────▶ None
//! ```
//!
//! A user holds at most one pending request; a second request is refused
//! until the first is executed or cleared by the emergency exit. A plain
//! withdrawal that leaves less than the requested amount cancels the
//! request, so the queue never holds an amount the balance cannot cover.
//! The delay is read at execution time, so changing it affects requests
//! already in the queue.
//!
//! The emergency exit ignores delay and pause state. It debits the caller's
//! whole balance and pays it out minus `emergency_penalty_bps`, which
//! defaults to zero. Any penalty stays in the vault.

use tokenvault_protocol::config::{MAX_EMERGENCY_PENALTY_BPS, VERSION_TAG_V3};
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::storage::{StateRecord, StorageLayout, WithdrawalFields, WithdrawalRequest};
use tracing::{info, warn};

use crate::access::AdminCap;
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::logic::{CallContext, VaultLogic};
use crate::{v1, v2};

fn withdrawals(state: &StateRecord) -> Result<&WithdrawalFields, VaultError> {
    state
        .withdrawal_fields()
        .ok_or(VaultError::ExtensionMissing("withdrawal"))
}

fn request_withdrawal(ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
    if amount == 0 {
        return Err(VaultError::ZeroAmount);
    }
    if withdrawals(ctx.state)?.request(&ctx.caller).is_some() {
        return Err(VaultError::RequestAlreadyPending(ctx.caller));
    }
    ctx.state.ensure_debitable(&ctx.caller, amount)?;

    let request = WithdrawalRequest {
        amount,
        requested_at: ctx.now,
    };
    ctx.state
        .withdrawal_fields_mut()?
        .insert_request(ctx.caller, request);
    ctx.emit(VaultEvent::WithdrawalRequested {
        user: ctx.caller,
        amount,
        requested_at: ctx.now,
    });
    info!(user = %ctx.caller, amount, requested_at = ctx.now, "withdrawal requested");
    Ok(())
}

/// Plain withdrawal; cancels a pending request the remaining balance no
/// longer covers.
fn withdraw(ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
    withdrawals(ctx.state)?;
    v2::withdraw(ctx, amount)?;

    let remaining = ctx.state.balance_of(&ctx.caller);
    let stale = withdrawals(ctx.state)?
        .request(&ctx.caller)
        .is_some_and(|request| request.amount > remaining);
    if stale {
        if let Some(request) = ctx.state.withdrawal_fields_mut()?.take_request(&ctx.caller) {
            ctx.emit(VaultEvent::WithdrawalRequestCancelled {
                user: ctx.caller,
                amount: request.amount,
            });
            info!(
                user = %ctx.caller,
                requested = request.amount,
                remaining,
                "withdrawal request cancelled"
            );
        }
    }
    Ok(())
}

fn execute_withdrawal(ctx: &mut CallContext<'_>) -> Result<u128, VaultError> {
    v2::yields(ctx.state)?;
    let fields = withdrawals(ctx.state)?;
    let request = fields
        .request(&ctx.caller)
        .copied()
        .ok_or(VaultError::NoPendingRequest(ctx.caller))?;
    let ready_at = request
        .requested_at
        .saturating_add(fields.withdrawal_delay_seconds());
    if ctx.now < ready_at {
        return Err(VaultError::DelayNotMet {
            ready_at,
            now: ctx.now,
        });
    }

    let balance = v1::settle(ctx, request.amount, request.amount)?;
    ctx.state.withdrawal_fields_mut()?.take_request(&ctx.caller);
    v2::close_if_empty(ctx)?;
    ctx.emit(VaultEvent::WithdrawalExecuted {
        user: ctx.caller,
        amount: request.amount,
    });
    info!(user = %ctx.caller, amount = request.amount, balance, "withdrawal executed");
    Ok(request.amount)
}

fn emergency_withdraw(ctx: &mut CallContext<'_>) -> Result<u128, VaultError> {
    v2::yields(ctx.state)?;
    let penalty_bps = withdrawals(ctx.state)?.emergency_penalty_bps();
    let balance = ctx.state.balance_of(&ctx.caller);
    if balance == 0 {
        return Err(VaultError::InsufficientBalance {
            available: 0,
            requested: 0,
        });
    }
    let penalty = v1::bps_portion(balance, penalty_bps);
    let payout = balance - penalty;

    v1::settle(ctx, balance, payout)?;
    let cleared = ctx.state.withdrawal_fields_mut()?.take_request(&ctx.caller);
    v2::close_if_empty(ctx)?;
    ctx.emit(VaultEvent::EmergencyWithdrawn {
        user: ctx.caller,
        amount: payout,
        penalty,
    });
    warn!(
        user = %ctx.caller,
        amount = payout,
        penalty,
        cleared_request = cleared.is_some(),
        "emergency withdrawal"
    );
    Ok(payout)
}

fn set_withdrawal_delay(
    ctx: &mut CallContext<'_>,
    cap: &AdminCap,
    seconds: u64,
) -> Result<(), VaultError> {
    let fields = ctx.state.withdrawal_fields_mut()?;
    let previous_seconds = fields.withdrawal_delay_seconds();
    fields.set_withdrawal_delay_seconds(seconds);
    ctx.emit(VaultEvent::WithdrawalDelayUpdated {
        previous_seconds,
        new_seconds: seconds,
    });
    info!(by = %cap.holder(), previous_seconds, new_seconds = seconds, "withdrawal delay updated");
    Ok(())
}

fn set_emergency_penalty(
    ctx: &mut CallContext<'_>,
    cap: &AdminCap,
    bps: u16,
) -> Result<(), VaultError> {
    if bps > MAX_EMERGENCY_PENALTY_BPS {
        return Err(VaultError::BpsOutOfRange {
            parameter: "emergency_penalty_bps",
            value: bps,
            max: MAX_EMERGENCY_PENALTY_BPS,
        });
    }
    let fields = ctx.state.withdrawal_fields_mut()?;
    let previous_bps = fields.emergency_penalty_bps();
    fields.set_emergency_penalty_bps(bps);
    ctx.emit(VaultEvent::EmergencyPenaltyUpdated {
        previous_bps,
        new_bps: bps,
    });
    info!(by = %cap.holder(), previous_bps, new_bps = bps, "emergency penalty updated");
    Ok(())
}

/// Generation 3 logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenVaultV3;

impl VaultLogic for TokenVaultV3 {
    fn version(&self) -> &'static str {
        VERSION_TAG_V3
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::v3()
    }

    fn deposit(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<u128, VaultError> {
        v2::deposit(ctx, amount)
    }

    fn withdraw(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
        withdraw(ctx, amount)
    }

    fn pause_deposits(&self, ctx: &mut CallContext<'_>, cap: &AdminCap) -> Result<(), VaultError> {
        v2::set_paused(ctx, cap, true)
    }

    fn resume_deposits(&self, ctx: &mut CallContext<'_>, cap: &AdminCap) -> Result<(), VaultError> {
        v2::set_paused(ctx, cap, false)
    }

    fn set_yield_rate(
        &self,
        ctx: &mut CallContext<'_>,
        cap: &AdminCap,
        bps: u16,
    ) -> Result<(), VaultError> {
        v2::set_yield_rate(ctx, cap, bps)
    }

    fn is_deposits_paused(&self, state: &StateRecord) -> Result<bool, VaultError> {
        Ok(v2::yields(state)?.deposits_paused())
    }

    fn yield_rate(&self, state: &StateRecord) -> Result<u16, VaultError> {
        Ok(v2::yields(state)?.yield_rate_bps())
    }

    fn user_yield(&self, state: &StateRecord, user: &Address, now: u64) -> Result<u128, VaultError> {
        v2::user_yield(state, user, now)
    }

    fn set_withdrawal_delay(
        &self,
        ctx: &mut CallContext<'_>,
        cap: &AdminCap,
        seconds: u64,
    ) -> Result<(), VaultError> {
        set_withdrawal_delay(ctx, cap, seconds)
    }

    fn set_emergency_penalty(
        &self,
        ctx: &mut CallContext<'_>,
        cap: &AdminCap,
        bps: u16,
    ) -> Result<(), VaultError> {
        set_emergency_penalty(ctx, cap, bps)
    }

    fn request_withdrawal(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
        request_withdrawal(ctx, amount)
    }

    fn execute_withdrawal(&self, ctx: &mut CallContext<'_>) -> Result<u128, VaultError> {
        execute_withdrawal(ctx)
    }

    fn emergency_withdraw(&self, ctx: &mut CallContext<'_>) -> Result<u128, VaultError> {
        emergency_withdraw(ctx)
    }

    fn withdrawal_delay(&self, state: &StateRecord) -> Result<u64, VaultError> {
        Ok(withdrawals(state)?.withdrawal_delay_seconds())
    }

    fn emergency_penalty(&self, state: &StateRecord) -> Result<u16, VaultError> {
        Ok(withdrawals(state)?.emergency_penalty_bps())
    }

    fn withdrawal_request(
        &self,
        state: &StateRecord,
        user: &Address,
    ) -> Result<WithdrawalRequest, VaultError> {
        Ok(withdrawals(state)?
            .request(user)
            .copied()
            .unwrap_or(WithdrawalRequest::NONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenvault_protocol::ledger::{AssetLedger, InMemoryToken};

    struct Fixture {
        token: InMemoryToken,
        state: StateRecord,
        vault: Address,
        alice: Address,
    }

    fn fixture() -> Fixture {
        let asset = Address::from_label("asset");
        let alice = Address::from_label("alice");
        let vault = Address::from_label("vault");
        let token = InMemoryToken::new(asset, "TKN", alice, 1_000);
        let mut state = StateRecord::genesis(StorageLayout::v3(), 0);
        state
            .initialize(asset, Address::from_label("admin"), 0, "V3")
            .unwrap();
        token.approve(alice, vault, 1_000);
        Fixture {
            token,
            state,
            vault,
            alice,
        }
    }

    #[test]
    fn request_is_recorded_without_moving_funds() {
        let mut f = fixture();
        let mut ctx = CallContext::new(f.alice, f.vault, 10, &mut f.state, &f.token);
        v2::deposit(&mut ctx, 100).unwrap();
        request_withdrawal(&mut ctx, 60).unwrap();
        let events = ctx.into_events();
        assert_eq!(events.len(), 2);

        assert_eq!(f.state.balance_of(&f.alice), 100);
        assert_eq!(f.token.balance_of(&f.alice), 900);
        let logic = TokenVaultV3;
        assert_eq!(
            logic.withdrawal_request(&f.state, &f.alice).unwrap(),
            WithdrawalRequest {
                amount: 60,
                requested_at: 10
            }
        );
    }

    #[test]
    fn second_request_is_refused() {
        let mut f = fixture();
        let mut ctx = CallContext::new(f.alice, f.vault, 0, &mut f.state, &f.token);
        v2::deposit(&mut ctx, 100).unwrap();
        request_withdrawal(&mut ctx, 10).unwrap();
        assert_eq!(
            request_withdrawal(&mut ctx, 20),
            Err(VaultError::RequestAlreadyPending(f.alice))
        );
    }

    #[test]
    fn request_above_balance_is_refused() {
        let mut f = fixture();
        let mut ctx = CallContext::new(f.alice, f.vault, 0, &mut f.state, &f.token);
        v2::deposit(&mut ctx, 100).unwrap();
        assert_eq!(
            request_withdrawal(&mut ctx, 101),
            Err(VaultError::InsufficientBalance {
                available: 100,
                requested: 101
            })
        );
        assert_eq!(request_withdrawal(&mut ctx, 0), Err(VaultError::ZeroAmount));
    }

    #[test]
    fn withdrawal_within_request_keeps_it_queued() {
        let mut f = fixture();
        let mut ctx = CallContext::new(f.alice, f.vault, 0, &mut f.state, &f.token);
        v2::deposit(&mut ctx, 100).unwrap();
        request_withdrawal(&mut ctx, 50).unwrap();
        withdraw(&mut ctx, 50).unwrap();
        assert_eq!(
            withdrawals(ctx.state).unwrap().request(&f.alice).map(|r| r.amount),
            Some(50)
        );

        withdraw(&mut ctx, 1).unwrap();
        assert!(withdrawals(ctx.state).unwrap().request(&f.alice).is_none());
        let events = ctx.into_events();
        assert!(matches!(
            events.last(),
            Some(VaultEvent::WithdrawalRequestCancelled { amount: 50, .. })
        ));
    }

    #[test]
    fn full_penalty_keeps_everything_in_vault() {
        let mut f = fixture();
        let mut ctx = CallContext::new(f.alice, f.vault, 0, &mut f.state, &f.token);
        v2::deposit(&mut ctx, 100).unwrap();
        ctx.state
            .withdrawal_fields_mut()
            .unwrap()
            .set_emergency_penalty_bps(10_000);
        assert_eq!(emergency_withdraw(&mut ctx).unwrap(), 0);
        assert_eq!(f.state.balance_of(&f.alice), 0);
        assert_eq!(f.state.total_deposits(), 0);
        assert_eq!(f.token.balance_of(&f.vault), 100);
    }
}
