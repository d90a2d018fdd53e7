//! Records of committed account mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use teller_core::{CustomerId, Money};

/// What a committed operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxKind {
    Deposit {
        customer: CustomerId,
        amount: Money,
        balance_after: Money,
    },
    Withdrawal {
        customer: CustomerId,
        amount: Money,
        balance_after: Money,
    },
    Transfer {
        from: CustomerId,
        to: CustomerId,
        amount: Money,
        from_balance_after: Money,
        to_balance_after: Money,
    },
}

/// Proof of a successful deposit, withdrawal or transfer.
///
/// Only produced after the balance change is committed; failed operations
/// never yield one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TxKind,
}

impl Receipt {
    pub(crate) fn new(kind: TxKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            occurred_at: Utc::now(),
            kind,
        }
    }

    pub fn amount(&self) -> Money {
        match &self.kind {
            TxKind::Deposit { amount, .. }
            | TxKind::Withdrawal { amount, .. }
            | TxKind::Transfer { amount, .. } => *amount,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self.kind {
            TxKind::Deposit { .. } => "banking.account.deposited",
            TxKind::Withdrawal { .. } => "banking.account.withdrawn",
            TxKind::Transfer { .. } => "banking.account.transferred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_with_type_tag() {
        let receipt = Receipt::new(TxKind::Deposit {
            customer: CustomerId::new("Alice").unwrap(),
            amount: Money::from_minor(500),
            balance_after: Money::from_minor(1500),
        });

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["customer"], "Alice");
        assert_eq!(json["amount"], 500);
        assert_eq!(json["balance_after"], 1500);

        let back: Receipt = serde_json::from_value(json).unwrap();
        assert_eq!(back, receipt);
        assert_eq!(back.amount(), Money::from_minor(500));
        assert_eq!(back.event_type(), "banking.account.deposited");
    }
}
