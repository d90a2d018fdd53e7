//! Ledger: registry of accounts keyed by customer identifier.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use teller_core::{CustomerId, Money, MoneyTotal};

use crate::account::Account;
use crate::config::LockPolicy;
use crate::error::{BankError, BankResult};
use crate::receipt::Receipt;

/// In-memory account registry.
///
/// Accounts are only ever added. The map lock is released before any account
/// lock is taken, so the registry never participates in account lock ordering.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: RwLock<HashMap<CustomerId, Arc<Account>>>,
    policy: LockPolicy,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose accounts all use `policy`.
    pub fn with_policy(policy: LockPolicy) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Opens an account for `id` with `initial_balance`.
    ///
    /// # Errors
    /// - Empty or whitespace-only identifier, `BankError::Domain`
    /// - Negative `initial_balance`, `BankError::InvalidAmount`
    /// - Identifier already registered, `BankError::DuplicateCustomer`
    pub fn register(&self, id: &str, initial_balance: Money) -> BankResult<Arc<Account>> {
        let id = CustomerId::new(id)?;

        let mut accounts = self.accounts.write();
        match accounts.entry(id) {
            Entry::Occupied(entry) => Err(BankError::DuplicateCustomer(entry.key().clone())),
            Entry::Vacant(entry) => {
                let account = Arc::new(Account::new(
                    entry.key().clone(),
                    initial_balance,
                    self.policy,
                )?);
                entry.insert(Arc::clone(&account));
                info!(customer = %account.id(), %initial_balance, "customer registered");
                Ok(account)
            }
        }
    }

    /// Returns the account for `id`.
    ///
    /// The account is shared; exclusivity comes only from the account's own lock.
    ///
    /// # Errors
    /// - Unknown identifier, `BankError::CustomerNotFound`. An identifier that
    ///   could never be registered (e.g. empty) is simply unknown.
    pub fn lookup(&self, id: &str) -> BankResult<Arc<Account>> {
        CustomerId::new(id)
            .ok()
            .and_then(|key| self.accounts.read().get(&key).cloned())
            .ok_or_else(|| BankError::CustomerNotFound(id.to_string()))
    }

    /// Sum of every account's committed balance.
    ///
    /// Not a point-in-time snapshot: accounts are read one by one without any
    /// global lock, so the total may mix before/after states of operations that
    /// run concurrently. Once all operations have completed it is exact; the
    /// `i128` total cannot overflow.
    pub fn total_balance(&self) -> MoneyTotal {
        self.accounts.read().values().map(|a| a.balance()).sum()
    }

    /// Moves `amount` from `from_id` to `to_id`.
    ///
    /// # Errors
    /// - Either customer is unknown, `BankError::CustomerNotFound` (sender checked first)
    /// - Anything [`Account::transfer`] returns, unchanged
    pub fn transfer_funds(&self, from_id: &str, to_id: &str, amount: Money) -> BankResult<Receipt> {
        let from = self.lookup(from_id)?;
        let to = self.lookup(to_id)?;
        from.transfer(amount, &to)
    }

    /// Looks up `id` and deposits into it.
    pub fn deposit(&self, id: &str, amount: Money) -> BankResult<Receipt> {
        self.lookup(id)?.deposit(amount)
    }

    /// Looks up `id` and withdraws from it.
    pub fn withdraw(&self, id: &str, amount: Money) -> BankResult<Receipt> {
        self.lookup(id)?.withdraw(amount)
    }

    /// Registered identifiers in ascending order.
    pub fn customers(&self) -> Vec<CustomerId> {
        let mut ids: Vec<CustomerId> = self.accounts.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}
