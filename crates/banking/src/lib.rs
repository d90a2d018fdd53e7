//! Banking module (per-account bounded-wait locking, deadlock-free transfers).
//!
//! In-memory only: no IO, no persistence concerns.

pub mod account;
pub mod config;
pub mod error;
pub mod ledger;
pub mod receipt;

pub use account::{Account, AccountGuard};
pub use config::{ConfigError, LockPolicy};
pub use error::{BankError, BankResult};
pub use ledger::Ledger;
pub use receipt::{Receipt, TxKind};

pub use teller_core::{CustomerId, Money, MoneyTotal};
