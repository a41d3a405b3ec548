//! # Generation 1: Fee-Bearing Deposits
//!
//! The accounting engine every later generation builds on. A deposit pulls
//! the full amount from the caller, keeps a basis-point fee inside the vault
//! and credits the remainder; a withdrawal debits the credited balance and
//! pushes the same amount back out.
//!
//! ## Atomicity
//!
//! Every operation follows the same three steps:
//!
//! 1. validate against the record (`ensure_creditable` / `ensure_debitable`),
//! 2. move the asset on the external ledger,
//! 3. commit to the record.
//!
//! Step 3 cannot fail once step 1 passed, and nothing is written before the
//! ledger accepts the transfer. A refused transfer therefore leaves both the
//! record and the ledger untouched.

use tokenvault_protocol::config::{BPS_DENOMINATOR, MAX_DEPOSIT_FEE_BPS, VERSION_TAG_V1};
use tokenvault_protocol::storage::{InitState, StorageLayout};
use tracing::{info, warn};

use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::logic::{CallContext, InitParams, VaultLogic};

/// `floor(amount * bps / 10000)`, without overflowing for any `amount`.
///
/// `bps` must not exceed 10000.
pub fn bps_portion(amount: u128, bps: u16) -> u128 {
    let bps = u128::from(bps);
    let denominator = u128::from(BPS_DENOMINATOR);
    (amount / denominator) * bps + (amount % denominator) * bps / denominator
}

/// Fee withheld from a deposit of `amount` at `fee_bps`.
pub fn deposit_fee(amount: u128, fee_bps: u16) -> u128 {
    bps_portion(amount, fee_bps)
}

/// The one-shot initializer shared by every generation.
pub(crate) fn initialize(
    ctx: &mut CallContext<'_>,
    params: InitParams,
    version: &'static str,
) -> Result<(), VaultError> {
    match ctx.state.init_state() {
        InitState::Disabled => return Err(VaultError::TemplateDisabled),
        InitState::Initialized => return Err(VaultError::AlreadyInitialized),
        InitState::Uninitialized => {}
    }
    if params.deposit_fee_bps > MAX_DEPOSIT_FEE_BPS {
        return Err(VaultError::BpsOutOfRange {
            parameter: "deposit_fee_bps",
            value: params.deposit_fee_bps,
            max: MAX_DEPOSIT_FEE_BPS,
        });
    }
    if params.asset.is_zero() {
        return Err(VaultError::ZeroAddress("asset"));
    }
    if params.administrator.is_zero() {
        return Err(VaultError::ZeroAddress("administrator"));
    }
    let expected = ctx.ledger.asset_id();
    if params.asset != expected {
        return Err(VaultError::AssetMismatch {
            given: params.asset,
            expected,
        });
    }

    ctx.state.initialize(
        params.asset,
        params.administrator,
        params.deposit_fee_bps,
        version,
    )?;
    ctx.emit(VaultEvent::Initialized {
        asset: params.asset,
        administrator: params.administrator,
        deposit_fee_bps: params.deposit_fee_bps,
    });
    info!(
        asset = %params.asset,
        administrator = %params.administrator,
        fee_bps = params.deposit_fee_bps,
        version,
        "vault initialized"
    );
    Ok(())
}

/// Pulls `amount` from the caller and credits it net of the deposit fee.
/// Returns the credited amount.
pub(crate) fn deposit(ctx: &mut CallContext<'_>, amount: u128) -> Result<u128, VaultError> {
    if amount == 0 {
        return Err(VaultError::ZeroAmount);
    }
    let fee = deposit_fee(amount, ctx.state.deposit_fee_bps());
    let credited = amount - fee;
    ctx.state.ensure_creditable(&ctx.caller, credited)?;

    ctx.ledger
        .transfer_from(ctx.vault, ctx.caller, ctx.vault, amount)
        .map_err(|err| {
            warn!(user = %ctx.caller, amount, error = %err, "deposit pull refused");
            err
        })?;

    let balance = ctx.state.credit(ctx.caller, credited)?;
    ctx.emit(VaultEvent::Deposited {
        user: ctx.caller,
        amount,
        fee,
        credited,
    });
    info!(user = %ctx.caller, amount, fee, credited, balance, "deposit");
    Ok(credited)
}

/// Debits `debit` from the caller's balance and pushes `payout` to them.
/// Returns the remaining balance.
///
/// `payout` may be less than `debit`; the difference stays in the vault.
pub(crate) fn settle(
    ctx: &mut CallContext<'_>,
    debit: u128,
    payout: u128,
) -> Result<u128, VaultError> {
    ctx.state.ensure_debitable(&ctx.caller, debit)?;
    if payout > 0 {
        ctx.ledger
            .transfer(ctx.vault, ctx.caller, payout)
            .map_err(|err| {
                warn!(user = %ctx.caller, payout, error = %err, "payout refused");
                err
            })?;
    }
    Ok(ctx.state.debit(ctx.caller, debit)?)
}

/// Withdraws `amount` of the caller's credited balance.
pub(crate) fn withdraw(ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
    if amount == 0 {
        return Err(VaultError::ZeroAmount);
    }
    let balance = settle(ctx, amount, amount)?;
    ctx.emit(VaultEvent::Withdrawn {
        user: ctx.caller,
        amount,
    });
    info!(user = %ctx.caller, amount, balance, "withdrawal");
    Ok(())
}

/// Generation 1 logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenVaultV1;

impl VaultLogic for TokenVaultV1 {
    fn version(&self) -> &'static str {
        VERSION_TAG_V1
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::v1()
    }

    fn deposit(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<u128, VaultError> {
        deposit(ctx, amount)
    }

    fn withdraw(&self, ctx: &mut CallContext<'_>, amount: u128) -> Result<(), VaultError> {
        withdraw(ctx, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_percent_of_one_hundred() {
        assert_eq!(deposit_fee(100, 500), 5);
    }

    #[test]
    fn zero_fee_deducts_nothing() {
        assert_eq!(deposit_fee(123_456, 0), 0);
    }

    #[test]
    fn small_amounts_round_fee_down_to_zero() {
        assert_eq!(deposit_fee(19, 500), 0);
        assert_eq!(deposit_fee(20, 500), 1);
        assert_eq!(deposit_fee(1, 9_999), 0);
    }

    #[test]
    fn full_fee_takes_everything() {
        assert_eq!(deposit_fee(777, 10_000), 777);
    }

    #[test]
    fn fee_matches_naive_formula() {
        for amount in [0u128, 1, 99, 10_001, 123_456_789, 1 << 64] {
            for bps in [0u16, 1, 33, 500, 9_999, 10_000] {
                let naive = amount * u128::from(bps) / 10_000;
                assert_eq!(deposit_fee(amount, bps), naive, "{amount} @ {bps}");
            }
        }
    }

    #[test]
    fn fee_on_max_amount_does_not_overflow() {
        let fee = deposit_fee(u128::MAX, 10_000);
        assert_eq!(fee, u128::MAX);
        assert!(deposit_fee(u128::MAX, 500) < u128::MAX);
    }

    #[test]
    fn v1_lacks_later_operations() {
        let logic = TokenVaultV1;
        assert_eq!(logic.version(), "V1");
        assert_eq!(logic.layout().generation(), 1);
        let state = tokenvault_protocol::storage::StateRecord::genesis(logic.layout(), 0);
        assert_eq!(
            logic.is_deposits_paused(&state).unwrap_err(),
            VaultError::Unsupported {
                operation: "is_deposits_paused",
                version: "V1"
            }
        );
    }
}
