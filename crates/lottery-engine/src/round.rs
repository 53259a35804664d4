use crate::amount::Amount;
use crate::draw::{RandomTarget, TargetSource};
use crate::error::LotteryError;
use crate::ledger::Ledger;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Fees and bounds of the game, all amounts in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotteryConfig {
    /// Added to the pool on every accepted guess.
    pub entry_fee: Amount,
    /// Charged alongside the entry fee and burned.
    pub gas_fee: Amount,
    pub max_guess: u32,
    pub starting_balance: Amount,
}

impl LotteryConfig {
    /// Total debited from a participant per accepted guess.
    pub const fn entry_cost(&self) -> Amount {
        self.entry_fee.saturating_add(self.gas_fee)
    }
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            entry_fee: 500_000_000_000_000_000,
            gas_fee: 1_400_000_000,
            max_guess: 1000,
            starting_balance: 5_000_000_000_000_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessEntry {
    pub address: String,
    pub guess: u32,
}

/// Outcome of closing a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawResult {
    pub target: u32,
    pub winner: Option<String>,
    pub winning_guess: Option<u32>,
    /// Pool as it stood at close time, credited to the winner.
    pub pool_paid_out: Amount,
    /// Round number after the close.
    pub round: u64,
}

/// Consistent copy of the round state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSnapshot {
    pub round: u64,
    pub closed: bool,
    pub pool: Amount,
    pub eligible: Vec<String>,
    pub guesses: Vec<GuessEntry>,
}

/// Round lifecycle state machine on top of a [`Ledger`].
///
/// A round is OPEN until [`close`](Self::close) draws a target and pays the
/// pool out; [`advance_round`](Self::advance_round) reopens it for the
/// addresses that played, and [`reset_all`](Self::reset_all) starts over from
/// round 1.
pub struct RoundEngine<S = RandomTarget> {
    config: LotteryConfig,
    ledger: Ledger,
    source: S,
    known: Vec<String>,
    eligible: Vec<String>,
    guesses: Vec<GuessEntry>,
    pool: Amount,
    round: u64,
    closed: bool,
}

fn dedup_ordered<I, A>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = A>,
    A: Into<String>,
{
    let mut out: Vec<String> = Vec::new();

    for address in addresses {
        let address = address.into();
        if !out.contains(&address) {
            out.push(address);
        }
    }

    out
}

impl<S: TargetSource> RoundEngine<S> {
    pub fn new<I, A>(config: LotteryConfig, accounts: I, source: S) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let known = dedup_ordered(accounts);
        let mut ledger = Ledger::new();
        ledger.initialize_all(known.iter().cloned(), config.starting_balance);

        Self {
            config,
            ledger,
            source,
            eligible: known.clone(),
            known,
            guesses: Vec::new(),
            pool: 0,
            round: 1,
            closed: false,
        }
    }

    /// Records a guess for `address`, charging the entry fee and gas.
    ///
    /// Checks run in a fixed order and all of them complete before the
    /// ledger or the entry list is touched.
    pub fn submit_guess(&mut self, address: &str, guess: i64) -> Result<(), LotteryError> {
        if self.closed {
            return Err(LotteryError::LotteryClosed);
        }

        if !self.eligible.iter().any(|a| a == address) {
            return Err(LotteryError::NotEligible(address.to_owned()));
        }

        let available = self.ledger.balance_of(address)?;

        let guess = u32::try_from(guess)
            .ok()
            .filter(|g| (1..=self.config.max_guess).contains(g))
            .ok_or_else(|| LotteryError::InvalidGuessRange {
                guess: guess.to_string(),
                max_guess: self.config.max_guess,
            })?;

        if self.guesses.iter().any(|g| g.address == address) {
            return Err(LotteryError::AlreadyGuessed(address.to_owned()));
        }

        if self.guesses.iter().any(|g| g.guess == guess) {
            return Err(LotteryError::GuessTaken(guess));
        }

        let cost = self.config.entry_cost();
        if available < cost {
            return Err(LotteryError::InsufficientFunds {
                address: address.to_owned(),
                required: cost,
                available,
            });
        }

        self.ledger.debit(address, cost)?;
        // The pool never exceeds the wei debited this round.
        self.pool = self.pool.saturating_add(self.config.entry_fee);
        self.guesses.push(GuessEntry {
            address: address.to_owned(),
            guess,
        });

        debug!(address, guess, pool = %self.pool, "Guess accepted");

        Ok(())
    }

    /// Draws the target and pays the pool to the closest guess.
    ///
    /// Ties go to the earliest entry. With no entries there is no winner and
    /// the pool is left as is.
    pub fn close(&mut self) -> Result<DrawResult, LotteryError> {
        if self.closed {
            return Err(LotteryError::AlreadyClosed);
        }
        self.closed = true;

        let max_guess = self.config.max_guess;
        let target = self.source.draw_target(max_guess).min(max_guess);

        let mut best: Option<(&GuessEntry, u32)> = None;
        for entry in &self.guesses {
            let diff = entry.guess.abs_diff(target);
            if best.map_or(true, |(_, best_diff)| diff < best_diff) {
                best = Some((entry, diff));
            }
        }
        let best = best.map(|(entry, _)| entry.clone());

        let mut pool_paid_out = 0;
        if let Some(entry) = &best {
            pool_paid_out = self.pool;
            self.ledger.credit(&entry.address, pool_paid_out);
            self.pool = 0;
        }

        self.round += 1;

        let result = DrawResult {
            target,
            winner: best.as_ref().map(|e| e.address.clone()),
            winning_guess: best.as_ref().map(|e| e.guess),
            pool_paid_out,
            round: self.round,
        };

        info!(
            drawn = target,
            winner = ?result.winner,
            pool = %pool_paid_out,
            round = self.round,
            "Round closed"
        );

        Ok(result)
    }

    /// Reopens the game for the addresses that guessed in the last round.
    ///
    /// Returns the new eligible list, which is empty if nobody played; in that
    /// case nobody can guess until a reset.
    pub fn advance_round(&mut self) -> Vec<String> {
        self.eligible = dedup_ordered(self.guesses.drain(..).map(|g| g.address));
        self.pool = 0;
        self.closed = false;

        if self.eligible.is_empty() {
            warn!(round = self.round, "No eligible addresses left, reset required");
        } else {
            info!(round = self.round, eligible = self.eligible.len(), "Round opened");
        }

        self.eligible.clone()
    }

    /// Restarts at round 1 with `addresses` as the known set, each funded
    /// with `starting_balance`. Balances of addresses outside the new set are
    /// dropped.
    pub fn reset_all<I, A>(&mut self, addresses: I, starting_balance: Amount)
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.known = dedup_ordered(addresses);
        self.ledger = Ledger::new();
        self.ledger
            .initialize_all(self.known.iter().cloned(), starting_balance);
        self.eligible = self.known.clone();
        self.guesses.clear();
        self.pool = 0;
        self.round = 1;
        self.closed = false;

        info!(accounts = self.known.len(), "Lottery reset");
    }

    /// [`reset_all`](Self::reset_all) with the configured accounts and balance.
    pub fn reset(&mut self) {
        let known = std::mem::take(&mut self.known);
        let starting_balance = self.config.starting_balance;
        self.reset_all(known, starting_balance);
    }
}

impl<S> RoundEngine<S> {
    pub fn list_accounts(&self) -> &[String] {
        &self.known
    }

    pub fn list_eligible(&self) -> &[String] {
        &self.eligible
    }

    pub fn list_guesses(&self) -> &[GuessEntry] {
        &self.guesses
    }

    pub const fn current_round(&self) -> u64 {
        self.round
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    pub const fn pool(&self) -> Amount {
        self.pool
    }

    pub fn balance_of(&self, address: &str) -> Result<Amount, LotteryError> {
        self.ledger.balance_of(address)
    }

    /// Balances of all known addresses, in configured order.
    pub fn balances(&self) -> Vec<(String, Amount)> {
        self.known
            .iter()
            .filter_map(|a| {
                self.ledger
                    .balance_of(a)
                    .ok()
                    .map(|balance| (a.clone(), balance))
            })
            .collect()
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round: self.round,
            closed: self.closed,
            pool: self.pool,
            eligible: self.eligible.clone(),
            guesses: self.guesses.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHER: Amount = 1_000_000_000_000_000_000;

    fn test_config() -> LotteryConfig {
        LotteryConfig {
            entry_fee: 10,
            gas_fee: 1,
            max_guess: 1000,
            starting_balance: 100,
        }
    }

    fn fixed(target: u32) -> impl FnMut(u32) -> u32 + Send {
        move |_max| target
    }

    #[test]
    fn test_initial_state() {
        let engine = RoundEngine::new(test_config(), ["a", "b", "a"], fixed(0));

        assert_eq!(engine.current_round(), 1);
        assert!(!engine.is_closed());
        assert_eq!(engine.pool(), 0);
        assert_eq!(engine.list_accounts(), ["a", "b"]);
        assert_eq!(engine.list_eligible(), ["a", "b"]);
        assert!(engine.list_guesses().is_empty());
        assert_eq!(
            engine.balances(),
            vec![("a".to_owned(), 100), ("b".to_owned(), 100)]
        );
    }

    #[test]
    fn test_submit_guess_charges_fees() {
        let mut engine = RoundEngine::new(test_config(), ["a"], fixed(0));

        engine.submit_guess("a", 500).unwrap();

        assert_eq!(engine.balance_of("a").unwrap(), 89);
        assert_eq!(engine.pool(), 10);
        assert_eq!(
            engine.list_guesses(),
            [GuessEntry {
                address: "a".to_owned(),
                guess: 500
            }]
        );
    }

    #[test]
    fn test_not_eligible_regardless_of_guess() {
        let mut engine = RoundEngine::new(test_config(), ["a"], fixed(0));

        for guess in [-5, 0, 1, 500, 1000, 1001] {
            assert_eq!(
                engine.submit_guess("stranger", guess),
                Err(LotteryError::NotEligible("stranger".to_owned()))
            );
        }
    }

    #[test]
    fn test_guess_out_of_range() {
        let mut engine = RoundEngine::new(test_config(), ["a"], fixed(0));

        for guess in [i64::MIN, -1, 0, 1001, i64::from(u32::MAX) + 1] {
            assert_eq!(
                engine.submit_guess("a", guess),
                Err(LotteryError::InvalidGuessRange {
                    guess: guess.to_string(),
                    max_guess: 1000,
                })
            );
        }

        engine.submit_guess("a", 1000).unwrap();
        assert_eq!(engine.balance_of("a").unwrap(), 89);
    }

    #[test]
    fn test_duplicate_address_and_guess() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b"], fixed(0));

        engine.submit_guess("a", 1).unwrap();

        assert_eq!(
            engine.submit_guess("a", 2),
            Err(LotteryError::AlreadyGuessed("a".to_owned()))
        );
        assert_eq!(
            engine.submit_guess("b", 1),
            Err(LotteryError::GuessTaken(1))
        );
        assert_eq!(engine.balance_of("b").unwrap(), 100);
        assert_eq!(engine.pool(), 10);
        assert_eq!(engine.list_guesses().len(), 1);
    }

    #[test]
    fn test_insufficient_funds_rejected_without_mutation() {
        let config = LotteryConfig {
            starting_balance: 10,
            ..test_config()
        };
        let mut engine = RoundEngine::new(config, ["a"], fixed(0));

        assert_eq!(
            engine.submit_guess("a", 5),
            Err(LotteryError::InsufficientFunds {
                address: "a".to_owned(),
                required: 11,
                available: 10,
            })
        );
        assert_eq!(engine.balance_of("a").unwrap(), 10);
        assert_eq!(engine.pool(), 0);
        assert!(engine.list_guesses().is_empty());
    }

    #[test]
    fn test_reset_all_replaces_known_set() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b"], fixed(0));
        engine.reset_all(["a"], 100);

        assert_eq!(
            engine.submit_guess("b", 1),
            Err(LotteryError::NotEligible("b".to_owned()))
        );
        assert_eq!(engine.list_accounts(), ["a"]);
        assert_eq!(
            engine.balance_of("b"),
            Err(LotteryError::UnknownAddress("b".to_owned()))
        );
    }

    #[test]
    fn test_closest_guess_wins_pool() {
        let config = LotteryConfig {
            entry_fee: ETHER / 2,
            gas_fee: 1_400_000_000,
            max_guess: 1000,
            starting_balance: 5 * ETHER,
        };
        let mut engine = RoundEngine::new(config, ["a", "b"], fixed(520));

        engine.submit_guess("a", 500).unwrap();
        engine.submit_guess("b", 600).unwrap();
        let result = engine.close().unwrap();

        assert_eq!(
            result,
            DrawResult {
                target: 520,
                winner: Some("a".to_owned()),
                winning_guess: Some(500),
                pool_paid_out: ETHER,
                round: 2,
            }
        );
        assert_eq!(
            engine.balance_of("a").unwrap(),
            5 * ETHER + ETHER / 2 - 1_400_000_000
        );
        assert_eq!(
            engine.balance_of("b").unwrap(),
            5 * ETHER - ETHER / 2 - 1_400_000_000
        );
        assert_eq!(engine.pool(), 0);
    }

    #[test]
    fn test_tie_goes_to_first_entry() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b", "c"], fixed(500));

        engine.submit_guess("b", 510).unwrap();
        engine.submit_guess("a", 490).unwrap();
        engine.submit_guess("c", 700).unwrap();
        let result = engine.close().unwrap();

        assert_eq!(result.winner.as_deref(), Some("b"));
        assert_eq!(result.winning_guess, Some(510));
        assert_eq!(result.pool_paid_out, 30);
        assert_eq!(engine.balance_of("b").unwrap(), 119);
    }

    #[test]
    fn test_target_clamped_to_max_guess() {
        let mut engine = RoundEngine::new(test_config(), ["a"], fixed(5000));

        assert_eq!(engine.close().unwrap().target, 1000);
    }

    #[test]
    fn test_close_without_entries() {
        let mut engine = RoundEngine::new(test_config(), ["a"], fixed(3));

        let result = engine.close().unwrap();

        assert_eq!(result.winner, None);
        assert_eq!(result.winning_guess, None);
        assert_eq!(result.pool_paid_out, 0);
        assert_eq!(result.round, 2);
        assert_eq!(engine.pool(), 0);
        assert_eq!(engine.close(), Err(LotteryError::AlreadyClosed));
        assert_eq!(engine.current_round(), 2);
    }

    #[test]
    fn test_closed_round_rejects_guesses() {
        let mut engine = RoundEngine::new(test_config(), ["a"], fixed(3));
        engine.close().unwrap();

        assert_eq!(
            engine.submit_guess("a", 3),
            Err(LotteryError::LotteryClosed)
        );
    }

    #[test]
    fn test_advance_keeps_only_participants() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b", "c"], fixed(3));

        engine.submit_guess("c", 1).unwrap();
        engine.submit_guess("a", 2).unwrap();
        engine.close().unwrap();
        let eligible = engine.advance_round();

        assert_eq!(eligible, ["c", "a"]);
        assert_eq!(engine.list_eligible(), ["c", "a"]);
        assert!(engine.list_guesses().is_empty());
        assert!(!engine.is_closed());
        assert_eq!(engine.pool(), 0);
        assert_eq!(engine.current_round(), 2);
        assert_eq!(
            engine.submit_guess("b", 5),
            Err(LotteryError::NotEligible("b".to_owned()))
        );
        engine.submit_guess("a", 5).unwrap();
    }

    #[test]
    fn test_advance_with_no_participants_locks_everyone_out() {
        let mut engine = RoundEngine::new(test_config(), ["a"], fixed(3));

        engine.close().unwrap();
        assert!(engine.advance_round().is_empty());
        assert_eq!(
            engine.submit_guess("a", 1),
            Err(LotteryError::NotEligible("a".to_owned()))
        );

        engine.reset();
        engine.submit_guess("a", 1).unwrap();
    }

    #[test]
    fn test_advance_from_open_keeps_round_number() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b"], fixed(1));

        engine.submit_guess("a", 7).unwrap();
        let eligible = engine.advance_round();

        assert_eq!(eligible, ["a"]);
        assert_eq!(engine.list_eligible(), ["a"]);
        assert!(engine.list_guesses().is_empty());
        assert!(!engine.is_closed());
        assert_eq!(engine.pool(), 0);
        assert_eq!(engine.current_round(), 1);
        assert_eq!(engine.balance_of("a").unwrap(), 89);
        assert_eq!(engine.balance_of("b").unwrap(), 100);
    }

    #[test]
    fn test_reset_from_closed() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b"], fixed(1));

        engine.submit_guess("a", 1).unwrap();
        engine.submit_guess("b", 2).unwrap();
        engine.close().unwrap();
        assert!(engine.is_closed());

        engine.reset();

        assert!(!engine.is_closed());
        assert_eq!(engine.current_round(), 1);
        assert_eq!(engine.pool(), 0);
        assert!(engine.list_guesses().is_empty());
        assert_eq!(engine.list_eligible(), ["a", "b"]);
        assert_eq!(
            engine.balances(),
            vec![("a".to_owned(), 100), ("b".to_owned(), 100)]
        );
        engine.submit_guess("b", 2).unwrap();
    }

    #[test]
    fn test_reset_all_is_idempotent() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b"], fixed(1));

        engine.submit_guess("a", 1).unwrap();
        engine.close().unwrap();
        engine.advance_round();
        engine.submit_guess("a", 2).unwrap();

        for _ in 0..2 {
            engine.reset();

            assert_eq!(
                engine.snapshot(),
                RoundSnapshot {
                    round: 1,
                    closed: false,
                    pool: 0,
                    eligible: vec!["a".to_owned(), "b".to_owned()],
                    guesses: Vec::new(),
                }
            );
            assert_eq!(
                engine.balances(),
                vec![("a".to_owned(), 100), ("b".to_owned(), 100)]
            );
        }
    }

    #[test]
    fn test_balances_never_negative_over_rounds() {
        let mut engine = RoundEngine::new(test_config(), ["a", "b"], fixed(1000));

        for round in 0..20u32 {
            let _ = engine.submit_guess("a", i64::from(round + 1));
            let _ = engine.submit_guess("b", i64::from(round + 500));
            engine.close().unwrap();
            engine.advance_round();
        }

        // a loses 11 a round until it cannot pay, then drops out; b nets +9
        // while a plays and -1 (the gas) once alone.
        assert_eq!(engine.balance_of("a").unwrap(), 1);
        assert_eq!(engine.balance_of("b").unwrap(), 170);
        assert_eq!(engine.list_eligible(), ["b"]);
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let play = || {
            let mut engine = RoundEngine::new(test_config(), ["a", "b"], RandomTarget::from_seed(9));
            engine.submit_guess("a", 250).unwrap();
            engine.submit_guess("b", 750).unwrap();
            engine.close().unwrap()
        };

        let first = play();
        assert_eq!(first, play());
        assert!(first.target <= 1000);
    }
}
