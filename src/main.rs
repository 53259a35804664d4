mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliConfig, Config};
use lottery_engine::{
    amount::{wei_to_ether, Amount},
    command::{Command, CommandRecord, Outcome},
    draw::RandomTarget,
    round::RoundEngine,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use tracing::{info, warn};

/// Balance row written to stdout
#[derive(Debug, Serialize)]
struct BalanceOutput<'a> {
    address: &'a str,
    balance: Option<Decimal>,
    balance_wei: Amount,
}

impl<'a> BalanceOutput<'a> {
    fn new(address: &'a str, balance_wei: Amount) -> Self {
        let balance = wei_to_ether(balance_wei);
        if balance.is_none() {
            warn!(
                "Balance of {address} ({balance_wei} wei) does not fit an ether value, \
                 column left empty"
            );
        }

        Self {
            address,
            balance,
            balance_wei,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CliConfig::parse();

    run_session(&config)?;

    info!("Session completed successfully");

    Ok(())
}

fn run_session<C: Config>(config: &C) -> Result<()> {
    let lottery_config = config
        .lottery_config()
        .context("Invalid lottery configuration")?;
    let source = config
        .seed()
        .map_or_else(RandomTarget::from_entropy, RandomTarget::from_seed);
    let mut engine = RoundEngine::new(lottery_config, config.accounts().iter().cloned(), source);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(config.input_path())
        .context("Failed to open input file")?;

    let mut applied = 0;
    let mut rejected = 0;

    for result in reader.deserialize() {
        let record: CommandRecord = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to parse command: {e}");
                rejected += 1;

                continue;
            }
        };

        let outcome = Command::from_record(record, lottery_config.max_guess)
            .map_err(anyhow::Error::from)
            .and_then(|command| engine.apply(command).map_err(anyhow::Error::from));

        match outcome {
            Ok(Outcome::Drawn(draw)) => {
                info!(
                    "Round {} drawn: target {}, winner {}, pool {} wei",
                    draw.round - 1,
                    draw.target,
                    draw.winner.as_deref().unwrap_or("none"),
                    draw.pool_paid_out
                );
                applied += 1;
            }
            Ok(Outcome::Advanced(eligible)) => {
                info!("Round {} eligible: {eligible:?}", engine.current_round());
                applied += 1;
            }
            Ok(_) => applied += 1,
            Err(e) => {
                warn!("Command rejected: {e}");
                rejected += 1;
            }
        }
    }

    info!("Applied {applied} commands, rejected {rejected} commands");

    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::WriterBuilder::new().from_writer(handle);

    for (address, balance) in engine.balances() {
        let output = BalanceOutput::new(&address, balance);
        writer
            .serialize(&output)
            .context("Failed to serialize balance")?;
    }

    writer.flush().context("Failed to flush stdout")?;

    Ok(())
}
