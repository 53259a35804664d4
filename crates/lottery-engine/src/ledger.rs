use crate::amount::Amount;
use crate::error::LotteryError;
use std::collections::HashMap;

/// In-memory account balances in minor units.
///
/// Balances never go negative: the only way to reduce one is [`Ledger::debit`],
/// which refuses to overdraw.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: HashMap<String, Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets every listed address to `starting_amount`, overwriting prior values.
    pub fn initialize_all<I, A>(&mut self, addresses: I, starting_amount: Amount)
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        for address in addresses {
            self.balances.insert(address.into(), starting_amount);
        }
    }

    /// Credits never fail. The balance saturates at `u128::MAX` wei, which
    /// is far beyond any supply the game can hold.
    pub fn credit(&mut self, address: &str, amount: Amount) {
        let balance = self.balances.entry(address.to_owned()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn debit(&mut self, address: &str, amount: Amount) -> Result<(), LotteryError> {
        let balance = self
            .balances
            .get_mut(address)
            .ok_or_else(|| LotteryError::UnknownAddress(address.to_owned()))?;

        if *balance < amount {
            return Err(LotteryError::InsufficientFunds {
                address: address.to_owned(),
                required: amount,
                available: *balance,
            });
        }

        *balance -= amount;

        Ok(())
    }

    pub fn balance_of(&self, address: &str) -> Result<Amount, LotteryError> {
        self.balances
            .get(address)
            .copied()
            .ok_or_else(|| LotteryError::UnknownAddress(address.to_owned()))
    }
}
