use crate::domain::transaction::{Transaction, TransactionType};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct TransactionRecord<'a> {
    id: Uuid,
    payee_id: Uuid,
    payer_id: Option<Uuid>,
    r#type: TransactionType,
    amount: Decimal,
    comment: &'a str,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Transaction> for TransactionRecord<'a> {
    fn from(entry: &'a Transaction) -> Self {
        Self {
            id: entry.id,
            payee_id: entry.payee_id,
            payer_id: entry.payer_id,
            r#type: entry.r#type,
            amount: entry.amount.to_decimal(),
            comment: &entry.comment,
            created_at: entry.created_at,
        }
    }
}

/// Writes ledger entries as CSV, amounts in major units.
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(destination),
        }
    }

    pub fn write_transactions(&mut self, entries: &[Transaction]) -> Result<()> {
        if entries.is_empty() {
            self.writer.write_record([
                "id",
                "payee_id",
                "payer_id",
                "type",
                "amount",
                "comment",
                "created_at",
            ])?;
        }
        for entry in entries {
            self.writer.serialize(TransactionRecord::from(entry))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
