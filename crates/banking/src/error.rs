//! Account and ledger error model.

use thiserror::Error;

use teller_core::{CustomerId, DomainError, Money};

/// Result type used across the banking layer.
pub type BankResult<T> = Result<T, BankError>;

/// Banking failure.
///
/// Every variant is detected locally and surfaced unchanged; nothing here is
/// retried automatically. A failure never leaves a lock held or a balance
/// partially updated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    /// Amount was zero or negative (or a negative initial balance).
    #[error("invalid amount: {0}")]
    InvalidAmount(Money),

    /// Balance too low at mutation time.
    #[error("insufficient funds for {customer}: requested {requested}, available {available}")]
    InsufficientFunds {
        customer: CustomerId,
        requested: Money,
        available: Money,
    },

    /// Lock not acquired within the configured timeout.
    #[error("account {0} is currently locked")]
    AccountLocked(CustomerId),

    /// Operation not permitted (e.g. self-transfer).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("customer {0} already exists")]
    DuplicateCustomer(CustomerId),

    /// No account is registered under this identifier (which may not even be
    /// a valid `CustomerId`).
    #[error("customer {0} not found")]
    CustomerNotFound(String),

    /// Crediting would overflow the balance representation.
    #[error("balance overflow for {customer} when crediting {amount}")]
    BalanceOverflow { customer: CustomerId, amount: Money },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl BankError {
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Short, stable name of the error kind (used for reporting).
    pub fn kind(&self) -> &'static str {
        match self {
            BankError::InvalidAmount(_) => "invalid_amount",
            BankError::InsufficientFunds { .. } => "insufficient_funds",
            BankError::AccountLocked(_) => "account_locked",
            BankError::InvalidOperation(_) => "invalid_operation",
            BankError::DuplicateCustomer(_) => "duplicate_customer",
            BankError::CustomerNotFound(_) => "customer_not_found",
            BankError::BalanceOverflow { .. } => "balance_overflow",
            BankError::Domain(_) => "domain",
        }
    }
}
