use crate::draw::TargetSource;
use crate::error::LotteryError;
use crate::round::{DrawResult, RoundEngine};
use serde::Deserialize;
use thiserror::Error;

/// Command type as it appears in an input record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Guess,
    Close,
    NewRound,
    Reset,
}

/// Loosely-typed command record, e.g. a CSV row
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRecord {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub guess: Option<String>,
}

/// Validated command accepted by [`RoundEngine::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Guess { address: String, guess: i64 },
    Close,
    NewRound,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{0} command requires `{1}`")]
    MissingField(&'static str, &'static str),
    #[error(transparent)]
    Rejected(#[from] LotteryError),
}

/// Result of applying a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Drawn(DrawResult),
    Advanced(Vec<String>),
    Reset,
}

impl Command {
    /// Converts a raw record, rejecting guesses that are not integers.
    pub fn from_record(record: CommandRecord, max_guess: u32) -> Result<Self, CommandError> {
        match record.kind {
            CommandKind::Guess => {
                let address = record
                    .address
                    .filter(|a| !a.is_empty())
                    .ok_or(CommandError::MissingField("guess", "address"))?;
                let raw = record
                    .guess
                    .filter(|g| !g.is_empty())
                    .ok_or(CommandError::MissingField("guess", "guess"))?;
                let guess = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| LotteryError::InvalidGuessRange {
                        guess: raw.clone(),
                        max_guess,
                    })?;

                Ok(Self::Guess { address, guess })
            }
            CommandKind::Close => Ok(Self::Close),
            CommandKind::NewRound => Ok(Self::NewRound),
            CommandKind::Reset => Ok(Self::Reset),
        }
    }
}

impl<S: TargetSource> RoundEngine<S> {
    pub fn apply(&mut self, command: Command) -> Result<Outcome, LotteryError> {
        match command {
            Command::Guess { address, guess } => {
                self.submit_guess(&address, guess)?;
                Ok(Outcome::Accepted)
            }
            Command::Close => self.close().map(Outcome::Drawn),
            Command::NewRound => Ok(Outcome::Advanced(self.advance_round())),
            Command::Reset => {
                self.reset();
                Ok(Outcome::Reset)
            }
        }
    }
}
