use crate::application::operation::Operation;
use crate::domain::money::Amount;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum OperationType {
    Debit,
    Credit,
    Transfer,
}

/// One CSV row: `type, user, counterparty, amount, comment`.
///
/// For transfers `user` pays and `counterparty` receives.
#[derive(Debug, Deserialize)]
struct OperationRecord {
    r#type: OperationType,
    user: Uuid,
    counterparty: Option<Uuid>,
    amount: Decimal,
    #[serde(default)]
    comment: Option<String>,
}

impl TryFrom<OperationRecord> for Operation {
    type Error = LedgerError;

    fn try_from(record: OperationRecord) -> Result<Self> {
        let amount = Amount::from_decimal(record.amount)?;
        let comment = record.comment.unwrap_or_default();

        match record.r#type {
            OperationType::Debit => Ok(Operation::Debit {
                user_id: record.user,
                amount,
                comment,
            }),
            OperationType::Credit => Ok(Operation::Credit {
                user_id: record.user,
                amount,
                comment,
            }),
            OperationType::Transfer => {
                let payee_id = record.counterparty.ok_or_else(|| {
                    LedgerError::InvalidRequest("transfer requires a counterparty".to_string())
                })?;
                Ok(Operation::Transfer {
                    payer_id: record.user,
                    payee_id,
                    amount,
                    comment,
                })
            }
        }
    }
}

/// Reads ledger operations from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Operation>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a new `OperationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads, deserializes and validates operations.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize::<OperationRecord>()
            .map(|result| result.map_err(LedgerError::from).and_then(Operation::try_from))
    }
}
