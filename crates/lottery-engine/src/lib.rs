pub mod amount;
pub mod command;
pub mod draw;
pub mod error;
pub mod ledger;
pub mod round;
pub mod shared;

use command::{Command, Outcome};
use draw::TargetSource;
use error::LotteryError;
use round::RoundEngine;

/// Replay a sequence of commands on `engine`, returning each outcome in order
pub fn run_batch<S: TargetSource>(
    engine: &mut RoundEngine<S>,
    commands: impl Iterator<Item = Command>,
) -> Vec<Result<Outcome, LotteryError>> {
    commands.map(|command| engine.apply(command)).collect()
}
