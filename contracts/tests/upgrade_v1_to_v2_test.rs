//! Integration tests for the V1 -> V2 upgrade.
//!
//! The same state record is carried across the upgrade; these tests check
//! that nothing committed under V1 changes, and that the V2 pause switch and
//! yield projection behave on top of it.

use std::sync::Arc;

use tokenvault_contracts::{
    ErrorKind, InitParams, TokenVaultV1, TokenVaultV2, Vault, VaultError, VaultEvent,
};
use tokenvault_protocol::clock::ManualClock;
use tokenvault_protocol::config::YIELD_ACCRUAL_PERIOD_SECS;
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::ledger::{AssetLedger, InMemoryToken};
use tokenvault_protocol::storage::StorageLayout;

const START: u64 = 1_700_000_000;

struct Harness {
    vault: Vault,
    token: Arc<InMemoryToken>,
    clock: Arc<ManualClock>,
    admin: Address,
    user1: Address,
}

/// Helper: V1 vault at 5% fee where user1 has already deposited 100.
fn deployed_with_deposit() -> Harness {
    let admin = Address::from_label("admin");
    let user1 = Address::from_label("user1");
    let asset = Address::from_label("token");
    let token = Arc::new(InMemoryToken::new(asset, "MOCK", admin, 1_000));
    let clock = Arc::new(ManualClock::new(START));

    let mut vault = Vault::deploy_and_initialize(
        Arc::new(TokenVaultV1),
        token.clone(),
        clock.clone(),
        admin,
        InitParams {
            asset,
            administrator: admin,
            deposit_fee_bps: 500,
        },
    )
    .unwrap();

    token.transfer(admin, user1, 100).unwrap();
    token.approve(user1, vault.address(), 100);
    vault.deposit(user1, 100).unwrap();

    Harness {
        vault,
        token,
        clock,
        admin,
        user1,
    }
}

fn upgraded() -> Harness {
    let mut h = deployed_with_deposit();
    h.vault.upgrade_to(h.admin, Arc::new(TokenVaultV2)).unwrap();
    h
}

// ---------------------------------------------------------------------------
// State Preservation
// ---------------------------------------------------------------------------

#[test]
fn upgrade_preserves_balances_and_totals() {
    let mut h = deployed_with_deposit();
    let balance_before = h.vault.balance_of(&h.user1);
    let total_before = h.vault.total_deposits();
    assert_eq!(balance_before, 95);

    h.vault.upgrade_to(h.admin, Arc::new(TokenVaultV2)).unwrap();

    assert_eq!(h.vault.balance_of(&h.user1), balance_before);
    assert_eq!(h.vault.total_deposits(), total_before);
    assert_eq!(h.vault.is_deposits_paused(), Ok(false));
    assert_eq!(h.vault.implementation_version(), "V2");
}

#[test]
fn upgrade_preserves_every_v1_field() {
    let mut h = deployed_with_deposit();
    let before = h.vault.state().clone();

    h.vault.upgrade_to(h.admin, Arc::new(TokenVaultV2)).unwrap();
    let after = h.vault.state();

    assert_eq!(after.asset_reference(), before.asset_reference());
    assert_eq!(after.administrator(), before.administrator());
    assert_eq!(after.deposit_fee_bps(), before.deposit_fee_bps());
    assert_eq!(after.total_deposits(), before.total_deposits());
    assert!(after.balances().eq(before.balances()));
    assert_eq!(after.init_state(), before.init_state());

    for field in StorageLayout::v1().fields() {
        assert_eq!(after.layout().field(&field.name), Some(field));
    }
    assert!(after.reserved_slots() < before.reserved_slots());
}

#[test]
fn upgrade_emits_event_with_layout_fingerprint() {
    let h = upgraded();
    let last = h.vault.events().last().unwrap();
    assert_eq!(
        last.event,
        VaultEvent::Upgraded {
            from_version: "V1".into(),
            to_version: "V2".into(),
            layout_fingerprint: StorageLayout::v2().fingerprint(),
        }
    );
}

#[test]
fn admin_keeps_access_after_upgrade() {
    let mut h = upgraded();
    assert!(h.vault.is_administrator(&h.admin));
    h.vault.set_yield_rate(h.admin, 500).unwrap();
    assert_eq!(h.vault.yield_rate(), Ok(500));
}

// ---------------------------------------------------------------------------
// Yield
// ---------------------------------------------------------------------------

#[test]
fn yield_is_zero_until_rate_and_time_are_set() {
    let mut h = upgraded();
    assert_eq!(h.vault.user_yield(&h.user1), Ok(0));

    h.vault.set_yield_rate(h.admin, 500).unwrap();
    assert_eq!(h.vault.user_yield(&h.user1), Ok(0));

    h.clock.advance(YIELD_ACCRUAL_PERIOD_SECS);
    // 95 * 5% over one year, rounded down
    assert_eq!(h.vault.user_yield(&h.user1), Ok(4));
}

#[test]
fn yield_is_read_only() {
    let mut h = upgraded();
    h.vault.set_yield_rate(h.admin, 10_000).unwrap();
    h.clock.advance(YIELD_ACCRUAL_PERIOD_SECS);

    assert_eq!(h.vault.user_yield(&h.user1), Ok(95));
    assert_eq!(h.vault.balance_of(&h.user1), 95);
    assert_eq!(h.vault.total_deposits(), 95);
}

#[test]
fn new_positions_accrue_from_their_first_deposit() {
    let mut h = upgraded();
    let user2 = Address::from_label("user2");
    h.vault.set_yield_rate(h.admin, 10_000).unwrap();

    h.clock.advance(YIELD_ACCRUAL_PERIOD_SECS / 2);
    h.token.transfer(h.admin, user2, 200).unwrap();
    h.token.approve(user2, h.vault.address(), 200);
    h.vault.deposit(user2, 200).unwrap();
    assert_eq!(h.vault.user_yield(&user2), Ok(0));

    h.clock.advance(YIELD_ACCRUAL_PERIOD_SECS / 2);
    assert_eq!(h.vault.user_yield(&user2), Ok(95));
    assert_eq!(h.vault.user_yield(&h.user1), Ok(95));

    // A full exit closes the position; a later deposit starts fresh.
    h.vault.withdraw(user2, 190).unwrap();
    assert_eq!(h.vault.user_yield(&user2), Ok(0));
    assert_eq!(h.vault.state().yield_fields().unwrap().checkpoint(&user2), None);
}

#[test]
fn top_up_does_not_earn_for_time_before_it_arrived() {
    let mut h = upgraded();
    h.vault.set_yield_rate(h.admin, 1_000).unwrap();
    h.clock.advance(YIELD_ACCRUAL_PERIOD_SECS);
    // 95 at 10% over one year, rounded down
    assert_eq!(h.vault.user_yield(&h.user1), Ok(9));

    h.token.mint(h.user1, 1_000_000).unwrap();
    h.token.approve(h.user1, h.vault.address(), 1_000_000);
    assert_eq!(h.vault.deposit(h.user1, 1_000_000), Ok(950_000));

    // The held 95 keep their year; the 950_000 start now.
    assert_eq!(h.vault.user_yield(&h.user1), Ok(9));

    h.clock.advance(YIELD_ACCRUAL_PERIOD_SECS);
    let after_a_year = h.vault.user_yield(&h.user1).unwrap();
    assert!((95_009..=95_019).contains(&after_a_year));
}

#[test]
fn equal_top_up_halves_the_accrued_time() {
    let mut h = upgraded();
    h.vault.set_yield_rate(h.admin, 10_000).unwrap();
    h.clock.advance(YIELD_ACCRUAL_PERIOD_SECS);
    assert_eq!(h.vault.user_yield(&h.user1), Ok(95));

    h.token.transfer(h.admin, h.user1, 100).unwrap();
    h.token.approve(h.user1, h.vault.address(), 100);
    h.vault.deposit(h.user1, 100).unwrap();

    assert_eq!(h.vault.balance_of(&h.user1), 190);
    assert_eq!(h.vault.user_yield(&h.user1), Ok(95));
}

#[test]
fn yield_rate_is_bounded() {
    let mut h = upgraded();
    let err = h.vault.set_yield_rate(h.admin, 10_001).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.vault.yield_rate(), Ok(0));
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

#[test]
fn pausing_blocks_deposits_but_not_withdrawals() {
    let mut h = upgraded();
    h.vault.pause_deposits(h.admin).unwrap();
    assert_eq!(h.vault.is_deposits_paused(), Ok(true));

    h.token.transfer(h.admin, h.user1, 10).unwrap();
    h.token.approve(h.user1, h.vault.address(), 10);
    let err = h.vault.deposit(h.user1, 10).unwrap_err();
    assert_eq!(err, VaultError::DepositsPaused);
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(h.token.balance_of(&h.user1), 10);

    h.vault.withdraw(h.user1, 45).unwrap();
    assert_eq!(h.vault.balance_of(&h.user1), 50);

    h.vault.resume_deposits(h.admin).unwrap();
    assert_eq!(h.vault.is_deposits_paused(), Ok(false));
    assert_eq!(h.vault.deposit(h.user1, 10), Ok(10));
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[test]
fn non_admin_cannot_configure_v2() {
    let mut h = upgraded();

    let err = h.vault.set_yield_rate(h.user1, 500).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(h.vault.yield_rate(), Ok(0));

    assert!(matches!(
        h.vault.pause_deposits(h.user1),
        Err(VaultError::Unauthorized { .. })
    ));
    assert_eq!(h.vault.is_deposits_paused(), Ok(false));
}
