//! Integration tests for the generation 1 vault.
//!
//! Deposit and withdraw against an in-memory token, fee arithmetic across
//! the valid range, and the one-shot initializer.

use std::sync::Arc;

use tokenvault_contracts::{ErrorKind, InitParams, TokenVaultV1, Vault, VaultError, VaultEvent};
use tokenvault_protocol::clock::ManualClock;
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::ledger::{AssetLedger, InMemoryToken};

struct Harness {
    vault: Vault,
    token: Arc<InMemoryToken>,
    admin: Address,
    user1: Address,
    user2: Address,
}

/// Helper: token with 1000 units minted to the admin, 100 handed to each
/// user, and a V1 vault charging `fee_bps`.
fn harness(fee_bps: u16) -> Harness {
    let admin = Address::from_label("admin");
    let user1 = Address::from_label("user1");
    let user2 = Address::from_label("user2");
    let asset = Address::from_label("token");

    let token = Arc::new(InMemoryToken::new(asset, "MOCK", admin, 1_000));
    token.transfer(admin, user1, 100).unwrap();
    token.transfer(admin, user2, 100).unwrap();

    let vault = Vault::deploy_and_initialize(
        Arc::new(TokenVaultV1),
        token.clone(),
        Arc::new(ManualClock::new(1_700_000_000)),
        admin,
        InitParams {
            asset,
            administrator: admin,
            deposit_fee_bps: fee_bps,
        },
    )
    .unwrap();

    Harness {
        vault,
        token,
        admin,
        user1,
        user2,
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[test]
fn initializes_with_correct_parameters() {
    let h = harness(500);
    assert_eq!(h.vault.deposit_fee(), 500);
    assert_eq!(h.vault.implementation_version(), "V1");
    assert_eq!(h.vault.administrator(), h.admin);
    assert_eq!(h.vault.asset(), h.token.asset_id());
    assert_eq!(h.vault.total_deposits(), 0);
    assert!(h.vault.is_administrator(&h.admin));
}

#[test]
fn reinitialization_fails_and_changes_nothing() {
    let mut h = harness(500);
    let before = h.vault.state().clone();

    let err = h
        .vault
        .initialize(
            h.user1,
            InitParams {
                asset: h.token.asset_id(),
                administrator: h.user1,
                deposit_fee_bps: 0,
            },
        )
        .unwrap_err();
    assert_eq!(err, VaultError::AlreadyInitialized);
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(h.vault.state(), &before);
    assert_eq!(h.vault.administrator(), h.admin);
}

#[test]
fn initializer_validates_its_arguments() {
    let asset = Address::from_label("token");
    let admin = Address::from_label("admin");
    let token = Arc::new(InMemoryToken::new(asset, "MOCK", admin, 0));
    let clock = Arc::new(ManualClock::new(0));
    let mut vault = Vault::deploy(Arc::new(TokenVaultV1), token, clock);

    let fee_too_high = InitParams {
        asset,
        administrator: admin,
        deposit_fee_bps: 10_001,
    };
    let err = vault.initialize(admin, fee_too_high).unwrap_err();
    assert!(matches!(err, VaultError::BpsOutOfRange { value: 10_001, .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let zero_admin = InitParams {
        asset,
        administrator: Address::ZERO,
        deposit_fee_bps: 0,
    };
    assert_eq!(
        vault.initialize(admin, zero_admin),
        Err(VaultError::ZeroAddress("administrator"))
    );

    let wrong_asset = InitParams {
        asset: Address::from_label("other-token"),
        administrator: admin,
        deposit_fee_bps: 0,
    };
    assert!(matches!(
        vault.initialize(admin, wrong_asset),
        Err(VaultError::AssetMismatch { .. })
    ));

    // None of the failures tripped the latch.
    assert!(!vault.state().is_initialized());
    let full_fee = InitParams {
        asset,
        administrator: admin,
        deposit_fee_bps: 10_000,
    };
    vault.initialize(admin, full_fee).unwrap();
    assert_eq!(vault.deposit_fee(), 10_000);
}

// ---------------------------------------------------------------------------
// Deposits and Withdrawals
// ---------------------------------------------------------------------------

#[test]
fn deposit_credits_amount_minus_fee() {
    let mut h = harness(500);
    h.token.approve(h.user1, h.vault.address(), 100);

    let credited = h.vault.deposit(h.user1, 100).unwrap();

    assert_eq!(credited, 95);
    assert_eq!(h.vault.balance_of(&h.user1), 95);
    assert_eq!(h.vault.total_deposits(), 95);
    // The full amount moved; the fee stays in the vault uncredited.
    assert_eq!(h.token.balance_of(&h.user1), 0);
    assert_eq!(h.token.balance_of(&h.vault.address()), 100);

    let last = h.vault.events().last().unwrap();
    assert_eq!(
        last.event,
        VaultEvent::Deposited {
            user: h.user1,
            amount: 100,
            fee: 5,
            credited: 95
        }
    );
}

#[test]
fn full_withdrawal_empties_position() {
    let mut h = harness(500);
    h.token.approve(h.user1, h.vault.address(), 100);
    h.vault.deposit(h.user1, 100).unwrap();

    let balance = h.vault.balance_of(&h.user1);
    h.vault.withdraw(h.user1, balance).unwrap();

    assert_eq!(h.vault.balance_of(&h.user1), 0);
    assert_eq!(h.vault.total_deposits(), 0);
    assert_eq!(h.token.balance_of(&h.user1), 95);
    assert_eq!(h.token.balance_of(&h.vault.address()), 5);
    assert_eq!(h.vault.state().balances().count(), 0);
}

#[test]
fn withdrawing_more_than_balance_fails() {
    let mut h = harness(500);
    let err = h.vault.withdraw(h.user1, 100).unwrap_err();
    assert_eq!(
        err,
        VaultError::InsufficientBalance {
            available: 0,
            requested: 100
        }
    );
    assert!(err.to_string().contains("insufficient balance"));

    h.token.approve(h.user1, h.vault.address(), 100);
    h.vault.deposit(h.user1, 100).unwrap();
    h.vault.withdraw(h.user1, 95).unwrap();
    assert_eq!(
        h.vault.withdraw(h.user1, 1).unwrap_err().kind(),
        ErrorKind::InsufficientBalance
    );
}

#[test]
fn zero_amounts_are_rejected() {
    let mut h = harness(500);
    assert_eq!(h.vault.deposit(h.user1, 0), Err(VaultError::ZeroAmount));
    assert_eq!(h.vault.withdraw(h.user1, 0), Err(VaultError::ZeroAmount));
}

#[test]
fn deposit_without_allowance_fails_atomically() {
    let mut h = harness(500);
    h.token.approve(h.user1, h.vault.address(), 50);
    let events_before = h.vault.events().len();

    let err = h.vault.deposit(h.user1, 100).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalTransfer);
    assert_eq!(h.vault.balance_of(&h.user1), 0);
    assert_eq!(h.vault.total_deposits(), 0);
    assert_eq!(h.token.balance_of(&h.user1), 100);
    assert_eq!(h.vault.events().len(), events_before);
}

#[test]
fn balances_are_tracked_per_user() {
    let mut h = harness(500);
    h.token.approve(h.user1, h.vault.address(), 100);
    h.token.approve(h.user2, h.vault.address(), 100);

    h.vault.deposit(h.user1, 100).unwrap();
    h.vault.deposit(h.user2, 40).unwrap();
    h.vault.withdraw(h.user1, 10).unwrap();

    assert_eq!(h.vault.balance_of(&h.user1), 85);
    assert_eq!(h.vault.balance_of(&h.user2), 38);
    assert_eq!(h.vault.total_deposits(), 123);
    assert!(h.vault.state().conservation_holds());
}

#[test]
fn v1_does_not_offer_later_operations() {
    let mut h = harness(500);
    let err = h.vault.pause_deposits(h.admin).unwrap_err();
    assert_eq!(
        err,
        VaultError::Unsupported {
            operation: "pause_deposits",
            version: "V1"
        }
    );
    assert!(h.vault.request_withdrawal(h.user1, 1).is_err());
    assert!(h.vault.withdrawal_delay().is_err());
}

// ---------------------------------------------------------------------------
// Fee Arithmetic
// ---------------------------------------------------------------------------

#[test]
fn credited_amount_is_exact_for_edge_fees() {
    for (fee_bps, amount, expected) in [
        (0u16, 100u128, 100u128),
        (500, 19, 19),
        (500, 20, 19),
        (1, 100, 100),
        (9_999, 100, 1),
        (10_000, 100, 0),
    ] {
        let mut h = harness(fee_bps);
        h.token.approve(h.user1, h.vault.address(), amount);
        let credited = h.vault.deposit(h.user1, amount).unwrap();
        assert_eq!(credited, expected, "fee {fee_bps} on {amount}");
        assert_eq!(h.vault.balance_of(&h.user1), expected);
        assert_eq!(h.vault.total_deposits(), expected);
    }
}
