use super::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Transfer,
    Debit,
    Credit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Transfer => "transfer",
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
        };
        f.write_str(name)
    }
}

/// An immutable ledger entry.
///
/// `amount` is signed: positive entries increased the payee's balance,
/// negative ones decreased it. `payer_id` is only set on transfers, where it
/// names the other side of the pair.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub payee_id: Uuid,
    pub payer_id: Option<Uuid>,
    pub r#type: TransactionType,
    pub amount: Amount,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        r#type: TransactionType,
        payee_id: Uuid,
        payer_id: Option<Uuid>,
        amount: Amount,
        comment: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            payee_id,
            payer_id,
            r#type,
            amount,
            comment: comment.into(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Amount,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Unknown names fall back to the default ordering rather than failing.
    pub fn parse_or_default(name: &str) -> Self {
        match name {
            "amount" => SortField::Amount,
            "created_at" => SortField::CreatedAt,
            _ => SortField::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse_or_default(name: &str) -> Self {
        match name {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => SortOrder::default(),
        }
    }
}

/// Ordering and pagination for a history read.
///
/// A `limit` of zero means "no limit"; `offset` is always applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionQuery {
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}

impl TransactionQuery {
    pub fn new(sort: SortField, order: SortOrder) -> Self {
        Self {
            sort,
            order,
            ..Self::default()
        }
    }

    pub fn page(self, limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            ..self
        }
    }

    fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        // Ties are broken by timestamp and then id so that pages never overlap.
        let ordering = match self.sort {
            SortField::Amount => a.amount.cmp(&b.amount),
            SortField::CreatedAt => Ordering::Equal,
        }
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id));

        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Sorts and paginates an unordered set of entries belonging to one payee.
    pub fn apply(&self, mut entries: Vec<Transaction>) -> Vec<Transaction> {
        entries.sort_by(|a, b| self.compare(a, b));

        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let entries = entries.into_iter().skip(offset);
        if self.limit == 0 {
            entries.collect()
        } else {
            let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
            entries.take(limit).collect()
        }
    }
}
