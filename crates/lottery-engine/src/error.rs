use crate::amount::Amount;
use thiserror::Error;

/// Rejection kinds surfaced by the ledger and the round engine.
///
/// Every variant is a recoverable validation failure; an operation that
/// returns one has not mutated any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LotteryError {
    #[error("unknown address {0}")]
    UnknownAddress(String),
    #[error("address {0} is not eligible this round")]
    NotEligible(String),
    #[error("lottery is closed")]
    LotteryClosed,
    #[error("round is already closed")]
    AlreadyClosed,
    #[error("guess `{guess}` must be an integer in 1..={max_guess}")]
    InvalidGuessRange { guess: String, max_guess: u32 },
    #[error("address {0} has already guessed this round")]
    AlreadyGuessed(String),
    #[error("number {0} has already been guessed")]
    GuessTaken(u32),
    #[error("insufficient funds for {address}: required {required}, available {available}")]
    InsufficientFunds {
        address: String,
        required: Amount,
        available: Amount,
    },
}
