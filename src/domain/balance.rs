use super::money::Amount;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current funds of a single user.
///
/// Rows are created with a zero amount and afterwards only updated. The
/// ledger never commits a negative `amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: Uuid,
    #[serde(rename = "balance")]
    pub amount: Amount,
}

impl Balance {
    pub fn new(user_id: Uuid, amount: Amount) -> Self {
        Self { user_id, amount }
    }

    pub fn zero(user_id: Uuid) -> Self {
        Self::new(user_id, Amount::ZERO)
    }

    pub fn with_amount(self, amount: Amount) -> Self {
        Self { amount, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_serializes_with_column_names() {
        let user_id = Uuid::nil();
        let balance = Balance::new(user_id, Amount::from_minor(1_250));
        let json = serde_json::to_value(balance).unwrap();

        assert_eq!(json["user_id"], user_id.to_string());
        assert_eq!(json["balance"], 1_250);

        let back: Balance = serde_json::from_value(json).unwrap();
        assert_eq!(back, balance);
    }
}
