// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Vault Operator Tool
//!
//! Entry point for the `tokenvault` binary. Parses CLI arguments,
//! initializes logging, and plays the deployment collaborator: it deploys
//! a vault, initializes it once, and upgrades it generation by generation
//! against the same state record.
//!
//! The binary supports three subcommands:
//!
//! - `scenario`: full V1 to V3 walkthrough with a JSON report on stdout
//! - `layout`: golden storage layouts and the upgrade compatibility chain
//! - `version`: print build version information

mod cli;
mod logging;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use tokenvault_contracts::{
    logic_for_generation, EventRecord, InitParams, TokenVaultV1, TokenVaultV2, TokenVaultV3,
    Vault, VaultError, VaultLogic,
};
use tokenvault_protocol::clock::{Clock, ManualClock, SystemClock};
use tokenvault_protocol::config::{DEFAULT_TOKEN_SUPPLY, VERSION_TAG_V3};
use tokenvault_protocol::identity::Address;
use tokenvault_protocol::ledger::{AssetLedger, InMemoryToken};
use tokenvault_protocol::storage::StorageLayout;

use cli::{Commands, LayoutArgs, ScenarioArgs, TokenVaultCli};
use logging::LogFormat;

const SECONDS_PER_DAY: u64 = 86_400;

fn main() -> Result<()> {
    let cli = TokenVaultCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Scenario(args) => run_scenario(args),
        Commands::Layout(args) => print_layouts(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct StepReport {
    step: &'static str,
    version: String,
    outcome: String,
}

#[derive(Debug, Serialize)]
struct LayoutReport {
    generation: u8,
    fields: usize,
    reserved_slots: u16,
    fingerprint: String,
}

#[derive(Debug, Serialize)]
struct ScenarioReport {
    vault: Address,
    asset: Address,
    asset_symbol: String,
    administrator: Address,
    final_version: String,
    deposit_fee_bps: u16,
    balances: BTreeMap<String, u128>,
    total_deposits: u128,
    custody: u128,
    conservation_holds: bool,
    steps: Vec<StepReport>,
    layouts: Vec<LayoutReport>,
    events: Vec<EventRecord>,
}

/// Records the outcome of each step for the report.
struct Journal {
    steps: Vec<StepReport>,
}

impl Journal {
    fn ok(&mut self, vault: &Vault, step: &'static str, outcome: impl Into<String>) {
        let outcome = outcome.into();
        tracing::info!(step, %outcome, "scenario step");
        self.steps.push(StepReport {
            step,
            version: vault.implementation_version().to_string(),
            outcome,
        });
    }

    /// Expects `result` to be a rejection and records it.
    fn rejected<T>(
        &mut self,
        vault: &Vault,
        step: &'static str,
        result: Result<T, VaultError>,
    ) -> Result<()> {
        match result {
            Ok(_) => bail!("step '{step}' was expected to be rejected but succeeded"),
            Err(err) => {
                self.ok(vault, step, format!("rejected ({:?}): {err}", err.kind()));
                Ok(())
            }
        }
    }
}

fn run_scenario(args: ScenarioArgs) -> Result<()> {
    let admin = Address::from_label("admin");
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");
    let asset = Address::from_label("tokenvault-asset");

    let token = Arc::new(InMemoryToken::new(asset, "TVT", admin, DEFAULT_TOKEN_SUPPLY));
    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let mut journal = Journal { steps: Vec::new() };

    tracing::info!(
        token = token.symbol(),
        fee_bps = args.fee_bps,
        yield_rate_bps = args.yield_rate_bps,
        withdrawal_delay = args.withdrawal_delay,
        "starting scenario"
    );

    // --- A bare template must refuse initialization ---
    let mut template = Vault::template(Arc::new(TokenVaultV1), token.clone(), clock.clone());
    let params = InitParams {
        asset,
        administrator: admin,
        deposit_fee_bps: args.fee_bps,
    };
    let template_result = template.initialize(admin, params);
    journal.rejected(&template, "initialize_template", template_result)?;

    // --- Generation 1 ---
    let mut vault = Vault::deploy_and_initialize(
        Arc::new(TokenVaultV1),
        token.clone(),
        clock.clone(),
        admin,
        params,
    )
    .context("failed to deploy and initialize vault")?;
    journal.ok(&vault, "deploy", format!("vault {} initialized", vault.address()));

    for user in [alice, bob] {
        token
            .transfer(admin, user, args.deposit)
            .with_context(|| format!("failed to fund {user}"))?;
        token.approve(user, vault.address(), args.deposit);
        let credited = vault
            .deposit(user, args.deposit)
            .with_context(|| format!("deposit by {user} failed"))?;
        journal.ok(
            &vault,
            "deposit",
            format!("{user} deposited {} and was credited {credited}", args.deposit),
        );
    }
    let reinit = vault.initialize(admin, params);
    journal.rejected(&vault, "reinitialize", reinit)?;

    // --- Generation 2 ---
    let intruder = Address::from_label("intruder");
    let hijack = vault.upgrade_to(intruder, Arc::new(TokenVaultV2));
    journal.rejected(&vault, "unauthorized_upgrade", hijack)?;

    vault
        .upgrade_to(admin, Arc::new(TokenVaultV2))
        .context("upgrade to V2 failed")?;
    let carried = vault.balance_of(&alice);
    journal.ok(&vault, "upgrade", format!("balance of alice still {carried}"));

    vault
        .set_yield_rate(admin, args.yield_rate_bps)
        .context("failed to set yield rate")?;
    clock.advance(args.accrual_days.saturating_mul(SECONDS_PER_DAY));
    let projected = vault.user_yield(&alice).context("yield query failed")?;
    journal.ok(
        &vault,
        "user_yield",
        format!("alice projected {projected} after {} days", args.accrual_days),
    );

    vault.pause_deposits(admin).context("failed to pause deposits")?;
    let paused_deposit = vault.deposit(alice, 1);
    journal.rejected(&vault, "deposit_while_paused", paused_deposit)?;
    vault.resume_deposits(admin).context("failed to resume deposits")?;

    // --- Generation 3 ---
    vault
        .upgrade_to(admin, Arc::new(TokenVaultV3))
        .context("upgrade to V3 failed")?;
    vault
        .set_withdrawal_delay(admin, args.withdrawal_delay)
        .context("failed to set withdrawal delay")?;
    journal.ok(&vault, "upgrade", format!("withdrawal delay {}s", args.withdrawal_delay));

    // A 100% fee leaves nothing credited; there is nothing to withdraw then.
    let requested = vault.balance_of(&alice);
    if requested > 0 {
        vault
            .request_withdrawal(alice, requested)
            .context("withdrawal request failed")?;
        journal.ok(&vault, "request_withdrawal", format!("alice requested {requested}"));

        if args.withdrawal_delay > 0 {
            let early = vault.execute_withdrawal(alice);
            journal.rejected(&vault, "execute_early", early)?;
            clock.advance(args.withdrawal_delay);
        }
        let paid = vault
            .execute_withdrawal(alice)
            .context("withdrawal execution failed")?;
        journal.ok(&vault, "execute_withdrawal", format!("alice received {paid}"));
    }

    if vault.balance_of(&bob) > 0 {
        let rescued = vault
            .emergency_withdraw(bob)
            .context("emergency withdrawal failed")?;
        journal.ok(&vault, "emergency_withdraw", format!("bob received {rescued}"));
    }

    if vault.implementation_version() != VERSION_TAG_V3 {
        bail!("scenario ended on {}", vault.implementation_version());
    }

    let report = ScenarioReport {
        vault: vault.address(),
        asset: vault.asset(),
        asset_symbol: token.symbol().to_string(),
        administrator: vault.administrator(),
        final_version: vault.implementation_version().to_string(),
        deposit_fee_bps: vault.deposit_fee(),
        balances: vault
            .state()
            .balances()
            .map(|(user, amount)| (user.to_hex(), *amount))
            .collect(),
        total_deposits: vault.total_deposits(),
        custody: token.balance_of(&vault.address()),
        conservation_holds: vault.state().conservation_holds(),
        steps: journal.steps,
        layouts: (1..=3)
            .filter_map(StorageLayout::for_generation)
            .map(|layout| LayoutReport {
                generation: layout.generation(),
                fields: layout.fields().len(),
                reserved_slots: layout.reserved_slots(),
                fingerprint: layout.fingerprint(),
            })
            .collect(),
        events: vault.events().to_vec(),
    };

    let rendered = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("failed to serialize scenario report")?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

fn print_layouts(args: LayoutArgs) -> Result<()> {
    let generations: Vec<u8> = match args.generation {
        Some(generation) => vec![generation],
        None => vec![1, 2, 3],
    };

    for generation in &generations {
        let layout = StorageLayout::for_generation(*generation)
            .with_context(|| format!("no layout for generation {generation}"))?;
        let version = logic_for_generation(*generation)
            .map(|logic| logic.version())
            .unwrap_or("?");
        println!(
            "generation {} ({version})  capacity {}  reserved {}",
            layout.generation(),
            layout.capacity(),
            layout.reserved_slots()
        );
        for field in layout.fields() {
            println!("  slot {:>2}  {:<26} {}", field.slot, field.name, field.kind);
        }
        println!("  fingerprint {}", layout.fingerprint());
    }

    if args.generation.is_none() {
        let chain: Vec<StorageLayout> = generations
            .iter()
            .filter_map(|g| StorageLayout::for_generation(*g))
            .collect();
        for pair in chain.windows(2) {
            pair[0].check_upgrade(&pair[1]).with_context(|| {
                format!(
                    "generation {} -> {} is not append-only",
                    pair[0].generation(),
                    pair[1].generation()
                )
            })?;
            println!(
                "upgrade {} -> {}: compatible",
                pair[0].generation(),
                pair[1].generation()
            );
        }
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tokenvault {}", env!("CARGO_PKG_VERSION"));
    let generations: Vec<&str> = (1..=3)
        .filter_map(logic_for_generation)
        .map(|logic| logic.version())
        .collect();
    println!("logic      {}", generations.join(", "));
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
