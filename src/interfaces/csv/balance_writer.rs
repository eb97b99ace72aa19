use crate::domain::balance::Balance;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct BalanceRecord<'a> {
    user_id: Uuid,
    balance: Decimal,
    currency: &'a str,
}

/// Writes balances as CSV (`user_id,balance,currency`).
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(destination),
        }
    }

    /// Writes stored balances, which are always in `currency`.
    pub fn write_balances<I>(&mut self, balances: I, currency: &str) -> Result<()>
    where
        I: IntoIterator<Item = Balance>,
    {
        for balance in balances {
            self.write_converted(balance.user_id, balance.amount.to_decimal(), currency)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a single, already converted display amount.
    pub fn write_converted(&mut self, user_id: Uuid, balance: Decimal, currency: &str) -> Result<()> {
        self.writer.serialize(BalanceRecord {
            user_id,
            balance,
            currency,
        })?;
        self.writer.flush()?;
        Ok(())
    }
}
