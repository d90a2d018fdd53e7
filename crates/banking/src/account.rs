//! Account: a balance guarded by a bounded-wait lock.
//!
//! Lock state machine: **Free → Held → Free**. Holding an [`AccountGuard`] is the
//! only way to be in the Held state; dropping it (or calling
//! [`AccountGuard::unlock`]) is the only way out, so every exit path of a
//! critical section releases the lock.
//!
//! Two-account operations acquire both locks in ascending [`CustomerId`] order,
//! independent of transfer direction. Opposite-direction transfers between the
//! same pair therefore contend on the same first lock instead of each holding
//! the lock the other needs.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use teller_core::{CustomerId, Entity, Money};

use crate::config::LockPolicy;
use crate::error::{BankError, BankResult};
use crate::receipt::{Receipt, TxKind};

/// A customer account.
///
/// `Account` is `Sync`; share it behind an `Arc` (the [`Ledger`](crate::Ledger)
/// does) and call its operations from any thread.
#[derive(Debug)]
pub struct Account {
    id: CustomerId,
    balance: Mutex<Money>,
    /// Last committed balance, written only while `balance` is locked.
    committed: AtomicI64,
    policy: LockPolicy,
}

/// Exclusive access to an account's balance.
///
/// Released when dropped.
#[derive(Debug)]
pub struct AccountGuard<'a> {
    account: &'a Account,
    balance: MutexGuard<'a, Money>,
}

impl AccountGuard<'_> {
    pub fn customer(&self) -> &CustomerId {
        &self.account.id
    }

    pub fn balance(&self) -> Money {
        *self.balance
    }

    /// Release the lock.
    pub fn unlock(self) {
        drop(self);
    }

    fn commit(&mut self, value: Money) {
        *self.balance = value;
        self.account.committed.store(value.minor(), Ordering::Release);
    }
}

impl Account {
    /// Open an account with a non-negative initial balance.
    ///
    /// # Errors
    /// - Negative `initial_balance`, `BankError::InvalidAmount`
    pub fn new(id: CustomerId, initial_balance: Money, policy: LockPolicy) -> BankResult<Self> {
        if initial_balance.is_negative() {
            return Err(BankError::InvalidAmount(initial_balance));
        }
        Ok(Self {
            id,
            balance: Mutex::new(initial_balance),
            committed: AtomicI64::new(initial_balance.minor()),
            policy,
        })
    }

    pub fn id(&self) -> &CustomerId {
        &self.id
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Last committed balance.
    ///
    /// Does not take the lock: while another operation is inside its critical
    /// section this returns the value from before that operation.
    pub fn balance(&self) -> Money {
        Money::from_minor(self.committed.load(Ordering::Acquire))
    }

    /// Whether some operation currently holds this account's lock.
    pub fn is_locked(&self) -> bool {
        self.balance.is_locked()
    }

    /// Acquire the lock, waiting at most `timeout`.
    ///
    /// No fairness among waiters: whichever waiter is woken first after a
    /// release wins.
    ///
    /// # Errors
    /// - Not acquired within `timeout`, `BankError::AccountLocked`
    pub fn lock(&self, timeout: Duration) -> BankResult<AccountGuard<'_>> {
        self.lock_until(deadline_after(timeout))
    }

    /// `None` waits without bound (a timeout too large to represent).
    fn lock_until(&self, deadline: Option<Instant>) -> BankResult<AccountGuard<'_>> {
        let acquired = match deadline {
            Some(deadline) => self.balance.try_lock_until(deadline),
            None => Some(self.balance.lock()),
        };
        match acquired {
            Some(balance) => Ok(AccountGuard {
                account: self,
                balance,
            }),
            None => {
                warn!(customer = %self.id, "lock acquisition timed out");
                Err(BankError::AccountLocked(self.id.clone()))
            }
        }
    }

    /// Deposits `amount` into this account.
    ///
    /// # Errors
    /// - Non-positive amount, `BankError::InvalidAmount` (checked before locking)
    /// - Lock timeout, `BankError::AccountLocked`
    /// - Credit would overflow, `BankError::BalanceOverflow`
    pub fn deposit(&self, amount: Money) -> BankResult<Receipt> {
        ensure_positive(amount)?;

        let mut guard = self.lock(self.policy.lock_timeout)?;
        self.policy.simulate_latency();

        let balance_after = guard
            .balance()
            .checked_add(amount)
            .ok_or_else(|| BankError::BalanceOverflow {
                customer: self.id.clone(),
                amount,
            })?;
        guard.commit(balance_after);
        guard.unlock();

        debug!(customer = %self.id, %amount, %balance_after, "deposit committed");
        Ok(Receipt::new(TxKind::Deposit {
            customer: self.id.clone(),
            amount,
            balance_after,
        }))
    }

    /// Withdraws `amount` from this account.
    ///
    /// # Errors
    /// - Non-positive amount, `BankError::InvalidAmount` (checked before locking)
    /// - Lock timeout, `BankError::AccountLocked`
    /// - Balance below `amount`, `BankError::InsufficientFunds` (balance unchanged)
    pub fn withdraw(&self, amount: Money) -> BankResult<Receipt> {
        ensure_positive(amount)?;

        let mut guard = self.lock(self.policy.lock_timeout)?;
        self.policy.simulate_latency();

        let available = guard.balance();
        let balance_after = debit(&self.id, available, amount)?;
        guard.commit(balance_after);
        guard.unlock();

        debug!(customer = %self.id, %amount, %balance_after, "withdrawal committed");
        Ok(Receipt::new(TxKind::Withdrawal {
            customer: self.id.clone(),
            amount,
            balance_after,
        }))
    }

    /// Moves `amount` from this account to `recipient`.
    ///
    /// Both locks are held before the balance check; they are taken in ascending
    /// identifier order and share a single `lock_timeout` deadline. If either
    /// acquisition times out, any lock already held is released.
    ///
    /// # Errors
    /// - `recipient` is this account, `BankError::InvalidOperation` (checked first)
    /// - Non-positive amount, `BankError::InvalidAmount`
    /// - Either lock times out, `BankError::AccountLocked`
    /// - Sender balance below `amount`, `BankError::InsufficientFunds`
    /// - Recipient credit would overflow, `BankError::BalanceOverflow`
    pub fn transfer(&self, amount: Money, recipient: &Account) -> BankResult<Receipt> {
        if core::ptr::eq(self, recipient) || self.id == recipient.id {
            return Err(BankError::invalid_operation(format!(
                "cannot transfer from {} to itself",
                self.id
            )));
        }
        ensure_positive(amount)?;

        let deadline = deadline_after(self.policy.lock_timeout);
        let sender_first = self.id < recipient.id;
        let (first, second) = if sender_first {
            (self, recipient)
        } else {
            (recipient, self)
        };

        let first_guard = first.lock_until(deadline)?;
        let second_guard = second.lock_until(deadline)?;
        let (mut from, mut to) = if sender_first {
            (first_guard, second_guard)
        } else {
            (second_guard, first_guard)
        };

        self.policy.simulate_latency();

        let from_balance_after = debit(&self.id, from.balance(), amount)?;
        let to_balance_after =
            to.balance()
                .checked_add(amount)
                .ok_or_else(|| BankError::BalanceOverflow {
                    customer: recipient.id.clone(),
                    amount,
                })?;
        from.commit(from_balance_after);
        to.commit(to_balance_after);
        drop(from);
        drop(to);

        debug!(
            from = %self.id,
            to = %recipient.id,
            %amount,
            %from_balance_after,
            %to_balance_after,
            "transfer committed"
        );
        Ok(Receipt::new(TxKind::Transfer {
            from: self.id.clone(),
            to: recipient.id.clone(),
            amount,
            from_balance_after,
            to_balance_after,
        }))
    }
}

impl Entity for Account {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn ensure_positive(amount: Money) -> BankResult<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(BankError::InvalidAmount(amount))
    }
}

fn debit(customer: &CustomerId, available: Money, amount: Money) -> BankResult<Money> {
    if available < amount {
        return Err(BankError::InsufficientFunds {
            customer: customer.clone(),
            requested: amount,
            available,
        });
    }
    available
        .checked_sub(amount)
        .ok_or_else(|| BankError::InsufficientFunds {
            customer: customer.clone(),
            requested: amount,
            available,
        })
}

fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}
