//! # CLI Interface
//!
//! Defines the command-line argument structure for `tokenvault` using
//! `clap` derive. Supports three subcommands: `scenario`, `layout`, and
//! `version`.

use clap::{Parser, Subcommand};
use tokenvault_protocol::config::{
    DEFAULT_DEPOSIT_FEE_BPS, DEFAULT_WITHDRAWAL_DELAY_SECS, DEFAULT_YIELD_RATE_BPS,
};

/// Token vault operator tool.
///
/// Deploys a vault against an in-memory asset ledger, walks it through every
/// logic generation on the same state record, and inspects the storage
/// layouts the generations share.
#[derive(Parser, Debug)]
#[command(
    name = "tokenvault",
    about = "Upgradeable token vault operator tool",
    version,
    propagate_version = true
)]
pub struct TokenVaultCli {
    /// Log output format: "pretty" or "json".
    #[arg(long, global = true, env = "TOKENVAULT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy V1, upgrade through V2 and V3 on the same record, and print a
    /// JSON report of every step.
    Scenario(ScenarioArgs),
    /// Print the golden storage layouts and check the upgrade chain.
    Layout(LayoutArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `scenario` subcommand.
#[derive(Parser, Debug)]
pub struct ScenarioArgs {
    /// Deposit fee in basis points, 0 to 10000.
    #[arg(
        long,
        env = "TOKENVAULT_FEE_BPS",
        default_value_t = DEFAULT_DEPOSIT_FEE_BPS,
        value_parser = clap::value_parser!(u16).range(0..=10_000)
    )]
    pub fee_bps: u16,

    /// Yield rate set after the V2 upgrade, in basis points per year.
    #[arg(
        long,
        env = "TOKENVAULT_YIELD_RATE_BPS",
        default_value_t = DEFAULT_YIELD_RATE_BPS,
        value_parser = clap::value_parser!(u16).range(0..=10_000)
    )]
    pub yield_rate_bps: u16,

    /// Withdrawal delay set after the V3 upgrade, in seconds.
    #[arg(long, env = "TOKENVAULT_WITHDRAWAL_DELAY", default_value_t = DEFAULT_WITHDRAWAL_DELAY_SECS)]
    pub withdrawal_delay: u64,

    /// Amount each simulated user deposits.
    #[arg(long, default_value_t = 100)]
    pub deposit: u128,

    /// Days of simulated time between the V2 upgrade and the yield reading.
    #[arg(long, default_value_t = 30)]
    pub accrual_days: u64,

    /// Print the report on a single line.
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for the `layout` subcommand.
#[derive(Parser, Debug)]
pub struct LayoutArgs {
    /// Only print this generation (1 to 3). Prints all when omitted.
    #[arg(long, short = 'g', value_parser = clap::value_parser!(u8).range(1..=3))]
    pub generation: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        TokenVaultCli::command().debug_assert();
    }

    #[test]
    fn scenario_defaults_come_from_config() {
        let cli = TokenVaultCli::try_parse_from(["tokenvault", "scenario"]).unwrap();
        match cli.command {
            Commands::Scenario(args) => {
                assert_eq!(args.fee_bps, DEFAULT_DEPOSIT_FEE_BPS);
                assert_eq!(args.withdrawal_delay, DEFAULT_WITHDRAWAL_DELAY_SECS);
                assert_eq!(args.deposit, 100);
                assert!(!args.compact);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_fee_is_rejected() {
        let parsed = TokenVaultCli::try_parse_from(["tokenvault", "scenario", "--fee-bps", "10001"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn layout_generation_is_bounded() {
        assert!(TokenVaultCli::try_parse_from(["tokenvault", "layout", "-g", "4"]).is_err());
        let cli = TokenVaultCli::try_parse_from(["tokenvault", "layout", "-g", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Layout(LayoutArgs {
                generation: Some(2)
            })
        ));
    }
}
