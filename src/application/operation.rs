use super::engine::LedgerEngine;
use crate::domain::balance::Balance;
use crate::domain::money::Amount;
use crate::error::Result;
use uuid::Uuid;

/// A validated mutating request, as produced by the front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Debit {
        user_id: Uuid,
        amount: Amount,
        comment: String,
    },
    Credit {
        user_id: Uuid,
        amount: Amount,
        comment: String,
    },
    Transfer {
        payer_id: Uuid,
        payee_id: Uuid,
        amount: Amount,
        comment: String,
    },
}

impl Operation {
    /// Users whose balance the operation may change.
    pub fn users(&self) -> Vec<Uuid> {
        match self {
            Operation::Debit { user_id, .. } | Operation::Credit { user_id, .. } => vec![*user_id],
            Operation::Transfer {
                payer_id, payee_id, ..
            } => vec![*payer_id, *payee_id],
        }
    }

    /// Executes the operation. Debit and credit return the resulting
    /// balance, a transfer returns `None`.
    pub async fn execute(self, engine: &LedgerEngine) -> Result<Option<Balance>> {
        match self {
            Operation::Debit {
                user_id,
                amount,
                comment,
            } => engine.debit(user_id, amount, comment).await.map(Some),
            Operation::Credit {
                user_id,
                amount,
                comment,
            } => engine.credit(user_id, amount, comment).await.map(Some),
            Operation::Transfer {
                payer_id,
                payee_id,
                amount,
                comment,
            } => engine
                .transfer(payer_id, payee_id, amount, comment)
                .await
                .map(|()| None),
        }
    }
}
