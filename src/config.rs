use anyhow::{anyhow, Result};
use clap::Parser;
use lottery_engine::{amount::ether_to_wei, round::LotteryConfig};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

/// Trait for reading configuration parameters
pub trait Config {
    fn input_path(&self) -> &Path;
    fn accounts(&self) -> &[String];
    fn seed(&self) -> Option<u64>;
    fn lottery_config(&self) -> Result<LotteryConfig>;
}

/// CLI configuration
#[derive(Parser, Debug)]
#[command(
    name = "guess-lottery",
    about = "Replays a number-guessing lottery session from a CSV command script",
    version
)]
pub struct CliConfig {
    /// Path to the input CSV file containing commands
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Participant address; repeat for every known account
    #[arg(long = "account", value_name = "ADDRESS", required = true)]
    accounts: Vec<String>,

    /// Entry fee in ether, added to the pool
    #[arg(long, default_value = "0.5")]
    entry_fee: Decimal,

    /// Gas fee in ether, charged per guess and burned
    #[arg(long, default_value = "0.0000000014")]
    gas_fee: Decimal,

    /// Starting balance in ether for every account
    #[arg(long, default_value = "5.0")]
    starting_balance: Decimal,

    /// Highest number a participant may guess
    #[arg(long, default_value_t = 1000)]
    max_guess: u32,

    /// Seed for the target draw; drawn from OS entropy when absent
    #[arg(long)]
    seed: Option<u64>,
}

fn to_wei(name: &str, ether: Decimal) -> Result<u128> {
    ether_to_wei(ether)
        .ok_or_else(|| anyhow!("{name} must be a non-negative whole number of wei, got {ether}"))
}

impl Config for CliConfig {
    fn input_path(&self) -> &Path {
        &self.input_file
    }

    fn accounts(&self) -> &[String] {
        &self.accounts
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn lottery_config(&self) -> Result<LotteryConfig> {
        if self.max_guess == 0 {
            anyhow::bail!("max-guess must be at least 1");
        }

        Ok(LotteryConfig {
            entry_fee: to_wei("entry-fee", self.entry_fee)?,
            gas_fee: to_wei("gas-fee", self.gas_fee)?,
            max_guess: self.max_guess,
            starting_balance: to_wei("starting-balance", self.starting_balance)?,
        })
    }
}
