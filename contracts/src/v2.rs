//! # Generation 2: Pausable Deposits and Yield Projection
//!
//! Adds an administrator pause switch for deposits and a linear yield
//! projection over each user's balance. Yield is a read-only estimate; it is
//! never folded into balances.
//!
//! Each position carries an accrual checkpoint, moved on every credit to a
//! balance-weighted basis so new funds never earn for time before they
//! arrived. The checkpoint is cleared when the position is fully withdrawn.
//! Positions that predate this generation have no checkpoint and accrue from
//! the moment the extension was installed.

use tokenvault_protocol::config::{
    BPS_DENOMINATOR, MAX_YIELD_RATE_BPS, VERSION_TAG_V2, YIELD_ACCRUAL_PERIOD_SECS,
};
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::storage::{StateRecord, StorageLayout, YieldFields};
use tracing::{debug, info, warn};

use crate::access::AdminCap;
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::logic::{CallContext, VaultLogic};
use crate::v1;

/// Linear yield: `balance * rate_bps * elapsed / (10000 * YEAR)`, rounded
/// down. Saturates instead of overflowing.
pub fn projected_yield(balance: u128, rate_bps: u16, elapsed: u64) -> u128 {
    if balance == 0 || rate_bps == 0 || elapsed == 0 {
        return 0;
    }
    let denominator = u128::from(BPS_DENOMINATOR) * u128::from(YIELD_ACCRUAL_PERIOD_SECS);
    let factor = u128::from(rate_bps) * u128::from(elapsed);
    match balance.checked_mul(factor) {
        Some(numerator) => numerator / denominator,
        None => {
            let whole = (balance / denominator).saturating_mul(factor);
            let part = (balance % denominator) * factor / denominator;
            whole.saturating_add(part)
        }
    }
}

/// Accrual basis after `credited` joins `held` units measured from `basis`.
///
/// Weighted by balance: the held units keep the time they have accrued,
/// the new units start at `now`. An empty position restarts at `now`.
pub fn blended_basis(held: u128, basis: u64, credited: u128, now: u64) -> u64 {
    let elapsed = now.saturating_sub(basis);
    if held == 0 || elapsed == 0 {
        return now;
    }
    let mut weight = held;
    let mut total = held.saturating_add(credited);
    let carried = loop {
        match weight.checked_mul(u128::from(elapsed)) {
            Some(weighted) => break weighted / total,
            None => {
                weight >>= 1;
                total >>= 1;
            }
        }
    };
    now - u64::try_from(carried).unwrap_or(elapsed).min(elapsed)
}

pub(crate) fn yields(state: &StateRecord) -> Result<&YieldFields, VaultError> {
    state
        .yield_fields()
        .ok_or(VaultError::ExtensionMissing("yield"))
}

/// Deposit with the pause check and checkpoint bookkeeping.
pub(crate) fn deposit(ctx: &mut CallContext<'_>, amount: u128) -> Result<u128, VaultError> {
    if yields(ctx.state)?.deposits_paused() {
        warn!(user = %ctx.caller, amount, "deposit while paused");
        return Err(VaultError::DepositsPaused);
    }
    let held = ctx.state.balance_of(&ctx.caller);
    let basis = yields(ctx.state)?.accrual_basis(&ctx.caller);
    let credited = v1::deposit(ctx, amount)?;
    if credited > 0 {
        let moved = blended_basis(held, basis, credited, ctx.now);
        ctx.state
            .yield_fields_mut()?
            .set_checkpoint(ctx.caller, moved);
        debug!(
            user = %ctx.caller,
            held,
            credited,
            basis,
            moved,
            "accrual checkpoint moved"
        );
    }
    Ok(credited)
}

pub(crate) fn withdraw(ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
    yields(ctx.state)?;
    v1::withdraw(ctx, amount)?;
    close_if_empty(ctx)
}

/// Clears the caller's checkpoint once their position is empty.
pub(crate) fn close_if_empty(ctx: &mut CallContext<'_>) -> Result<(), VaultError> {
    if ctx.state.balance_of(&ctx.caller) == 0 {
        ctx.state.yield_fields_mut()?.close_checkpoint(&ctx.caller);
    }
    Ok(())
}

pub(crate) fn set_paused(
    ctx: &mut CallContext<'_>,
    cap: &AdminCap,
    paused: bool,
) -> Result<(), VaultError> {
    ctx.state.yield_fields_mut()?.set_deposits_paused(paused);
    let by = cap.holder();
    if paused {
        ctx.emit(VaultEvent::DepositsPaused { by });
        info!(%by, "deposits paused");
    } else {
        ctx.emit(VaultEvent::DepositsResumed { by });
        info!(%by, "deposits resumed");
    }
    Ok(())
}

pub(crate) fn set_yield_rate(
    ctx: &mut CallContext<'_>,
    cap: &AdminCap,
    bps: u16,
) -> Result<(), VaultError> {
    if bps > MAX_YIELD_RATE_BPS {
        return Err(VaultError::BpsOutOfRange {
            parameter: "yield_rate_bps",
            value: bps,
            max: MAX_YIELD_RATE_BPS,
        });
    }
    let fields = ctx.state.yield_fields_mut()?;
    let previous_bps = fields.yield_rate_bps();
    fields.set_yield_rate_bps(bps);
    ctx.emit(VaultEvent::YieldRateUpdated {
        previous_bps,
        new_bps: bps,
    });
    info!(by = %cap.holder(), previous_bps, new_bps = bps, "yield rate updated");
    Ok(())
}

pub(crate) fn user_yield(state: &StateRecord, user: &Address, now: u64) -> Result<u128, VaultError> {
    let fields = yields(state)?;
    let basis = fields.accrual_basis(user);
    let elapsed = now.saturating_sub(basis);
    let balance = state.balance_of(user);
    let projected = projected_yield(balance, fields.yield_rate_bps(), elapsed);
    debug!(%user, balance, elapsed, projected, "yield projected");
    Ok(projected)
}

/// Generation 2 logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenVaultV2;

impl VaultLogic for TokenVaultV2 {
    fn version(&self) -> &'static str {
        VERSION_TAG_V2
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::v2()
    }

    fn deposit(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<u128, VaultError> {
        deposit(ctx, amount)
    }

    fn withdraw(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
        withdraw(ctx, amount)
    }

    fn pause_deposits(&self, ctx: &mut CallContext<'_>, cap: &AdminCap) -> Result<(), VaultError> {
        set_paused(ctx, cap, true)
    }

    fn resume_deposits(&self, ctx: &mut CallContext<'_>, cap: &AdminCap) -> Result<(), VaultError> {
        set_paused(ctx, cap, false)
    }

    fn set_yield_rate(
        &self,
        ctx: &mut CallContext<'_>,
        cap: &AdminCap,
        bps: u16,
    ) -> Result<(), VaultError> {
        set_yield_rate(ctx, cap, bps)
    }

    fn is_deposits_paused(&self, state: &StateRecord) -> Result<bool, VaultError> {
        Ok(yields(state)?.deposits_paused())
    }

    fn yield_rate(&self, state: &StateRecord) -> Result<u16, VaultError> {
        Ok(yields(state)?.yield_rate_bps())
    }

    fn user_yield(&self, state: &StateRecord, user: &Address, now: u64) -> Result<u128, VaultError> {
        user_yield(state, user, now)
    }
}
