use crate::amount::Amount;
use crate::command::{Command, Outcome};
use crate::draw::TargetSource;
use crate::error::LotteryError;
use crate::round::{DrawResult, GuessEntry, RoundEngine, RoundSnapshot};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to one engine shared between request handlers.
///
/// Each mutating call holds the write lock from its first check to its last
/// write. Reads take the read lock and return owned copies.
pub struct SharedLottery<S> {
    inner: Arc<RwLock<RoundEngine<S>>>,
}

impl<S> Clone for SharedLottery<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TargetSource> SharedLottery<S> {
    pub fn new(engine: RoundEngine<S>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    // Engine state only changes after every check has passed, so a poisoned
    // lock still guards a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, RoundEngine<S>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RoundEngine<S>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn submit_guess(&self, address: &str, guess: i64) -> Result<(), LotteryError> {
        self.write().submit_guess(address, guess)
    }

    pub fn close(&self) -> Result<DrawResult, LotteryError> {
        self.write().close()
    }

    pub fn advance_round(&self) -> Vec<String> {
        self.write().advance_round()
    }

    pub fn reset_all<I, A>(&self, addresses: I, starting_balance: Amount)
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.write().reset_all(addresses, starting_balance);
    }

    pub fn reset(&self) {
        self.write().reset();
    }

    pub fn apply(&self, command: Command) -> Result<Outcome, LotteryError> {
        self.write().apply(command)
    }

    pub fn list_accounts(&self) -> Vec<String> {
        self.read().list_accounts().to_vec()
    }

    pub fn list_eligible(&self) -> Vec<String> {
        self.read().list_eligible().to_vec()
    }

    pub fn list_guesses(&self) -> Vec<GuessEntry> {
        self.read().list_guesses().to_vec()
    }

    pub fn current_round(&self) -> u64 {
        self.read().current_round()
    }

    pub fn balance_of(&self, address: &str) -> Result<Amount, LotteryError> {
        self.read().balance_of(address)
    }

    pub fn balances(&self) -> Vec<(String, Amount)> {
        self.read().balances()
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        self.read().snapshot()
    }
}
