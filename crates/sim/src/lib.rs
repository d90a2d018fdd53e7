//! Contention harness: hammer a ledger from many threads and report.

use std::collections::BTreeMap;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use anyhow::{Context, bail};
use serde::Serialize;
use tracing::info;

use teller_banking::{BankResult, Ledger, Money, MoneyTotal, Receipt, TxKind};

pub const WORKERS_ENV: &str = "TELLER_SIM_WORKERS";
pub const ROUNDS_ENV: &str = "TELLER_SIM_ROUNDS";

/// Customers opened by [`seed_ledger`], with balances in whole units.
pub const SEED_CUSTOMERS: [(&str, i64); 3] = [("Alice", 1_000), ("Bob", 500), ("Carol", 750)];

const TRANSFER_AMOUNT: Money = Money::from_minor(2_500);
const DEPOSIT_AMOUNT: Money = Money::from_minor(500);
const WITHDRAW_AMOUNT: Money = Money::from_minor(500);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub workers: usize,
    /// Operations per worker.
    pub rounds: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            rounds: 25,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(v) = std::env::var(WORKERS_ENV) {
            config.workers = v.trim().parse().with_context(|| format!("{WORKERS_ENV}={v:?}"))?;
        }
        if let Ok(v) = std::env::var(ROUNDS_ENV) {
            config.rounds = v.trim().parse().with_context(|| format!("{ROUNDS_ENV}={v:?}"))?;
        }
        Ok(config)
    }
}

/// Open the [`SEED_CUSTOMERS`] accounts.
pub fn seed_ledger(ledger: &Ledger) -> anyhow::Result<()> {
    for (id, major) in SEED_CUSTOMERS {
        ledger
            .register(id, Money::from_major(major))
            .with_context(|| format!("registering {id}"))?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimReport {
    pub balances: BTreeMap<String, Money>,
    pub total_before: MoneyTotal,
    pub total_after: MoneyTotal,
    /// `total_before` plus successful deposits minus successful withdrawals.
    pub expected_total: MoneyTotal,
    pub succeeded: usize,
    /// Success counts by receipt event type.
    pub committed: BTreeMap<&'static str, usize>,
    /// Failure counts by error kind.
    pub failures: BTreeMap<&'static str, usize>,
    pub elapsed_ms: u128,
}

impl SimReport {
    pub fn conserved(&self) -> bool {
        self.total_after == self.expected_total
    }
}

/// Outcome counts and the total the ledger should hold afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Tally {
    expected_total: MoneyTotal,
    committed: BTreeMap<&'static str, usize>,
    failures: BTreeMap<&'static str, usize>,
}

/// Run `config.workers` threads against every customer in `ledger`.
///
/// Worker `w` cycles through: transfer to the next customer, transfer back
/// from it, deposit, withdraw. Neighbouring workers start at different steps
/// so opposite-direction transfers on the same pair overlap.
///
/// # Errors
/// - A worker thread panicked (its results would be missing from the report)
/// - The expected total cannot be represented
pub fn run(ledger: &Ledger, config: &SimConfig) -> anyhow::Result<SimReport> {
    let customers: Vec<String> = ledger.customers().into_iter().map(String::from).collect();
    let total_before = ledger.total_balance();
    let started = Instant::now();

    let results: Vec<BankResult<Receipt>> = if customers.is_empty() {
        Vec::new()
    } else {
        thread::scope(|s| {
            let handles: Vec<_> = (0..config.workers)
                .map(|w| {
                    let customers = &customers;
                    s.spawn(move || worker(ledger, customers, w, config.rounds))
                })
                .collect();
            join_workers(handles)
        })?
    };

    let elapsed_ms = started.elapsed().as_millis();
    let tally = tally(total_before, &results)?;

    let balances = ledger
        .customers()
        .into_iter()
        .filter_map(|id| {
            let balance = ledger.lookup(id.as_str()).ok()?.balance();
            Some((String::from(id), balance))
        })
        .collect();

    let succeeded = tally.committed.values().sum();
    let report = SimReport {
        balances,
        total_before,
        total_after: ledger.total_balance(),
        expected_total: tally.expected_total,
        succeeded,
        committed: tally.committed,
        failures: tally.failures,
        elapsed_ms,
    };
    info!(
        succeeded = report.succeeded,
        failed = results.len() - report.succeeded,
        elapsed_ms = report.elapsed_ms,
        "simulation finished"
    );
    Ok(report)
}

/// Join every worker, failing if any of them panicked.
///
/// All handles are joined before reporting, so a panic is never left for the
/// enclosing scope to re-raise.
fn join_workers<T>(handles: Vec<ScopedJoinHandle<'_, Vec<T>>>) -> anyhow::Result<Vec<T>> {
    let mut results = Vec::new();
    let mut panicked = Vec::new();
    for (w, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(batch) => results.extend(batch),
            Err(_) => panicked.push(w),
        }
    }
    if !panicked.is_empty() {
        bail!("worker(s) {panicked:?} panicked");
    }
    Ok(results)
}

fn tally(total_before: MoneyTotal, results: &[BankResult<Receipt>]) -> anyhow::Result<Tally> {
    let mut tally = Tally {
        expected_total: total_before,
        ..Tally::default()
    };
    for result in results {
        match result {
            Ok(receipt) => {
                *tally.committed.entry(receipt.event_type()).or_insert(0) += 1;
                let expected = match receipt.kind {
                    TxKind::Deposit { .. } => tally.expected_total.checked_add(receipt.amount()),
                    TxKind::Withdrawal { .. } => tally.expected_total.checked_sub(receipt.amount()),
                    TxKind::Transfer { .. } => Some(tally.expected_total),
                };
                let Some(expected) = expected else {
                    bail!(
                        "expected total overflowed applying {} of {}",
                        receipt.event_type(),
                        receipt.amount()
                    );
                };
                tally.expected_total = expected;
            }
            Err(err) => *tally.failures.entry(err.kind()).or_insert(0) += 1,
        }
    }
    Ok(tally)
}

fn worker(ledger: &Ledger, customers: &[String], w: usize, rounds: usize) -> Vec<BankResult<Receipt>> {
    let n = customers.len();
    let home = &customers[w % n];
    let neighbour = &customers[(w + 1) % n];

    (0..rounds)
        .map(|i| match (w + i) % 4 {
            0 => ledger.transfer_funds(home, neighbour, TRANSFER_AMOUNT),
            1 => ledger.transfer_funds(neighbour, home, TRANSFER_AMOUNT),
            2 => ledger.deposit(home, DEPOSIT_AMOUNT),
            _ => ledger.withdraw(neighbour, WITHDRAW_AMOUNT),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use teller_banking::LockPolicy;

    fn quick_ledger() -> Ledger {
        let ledger = Ledger::with_policy(LockPolicy::new(Duration::from_secs(1), Duration::ZERO));
        seed_ledger(&ledger).unwrap();
        ledger
    }

    #[test]
    fn seeds_three_customers() {
        let ledger = quick_ledger();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.total_balance(), Money::from_major(2_250));
        assert!(seed_ledger(&ledger).is_err());
    }

    #[test]
    fn run_conserves_funds() {
        let ledger = quick_ledger();

        let report = run(&ledger, &SimConfig { workers: 6, rounds: 20 }).unwrap();

        assert!(report.conserved(), "{report:?}");
        assert_eq!(report.balances.len(), 3);
        assert_eq!(
            report.succeeded + report.failures.values().sum::<usize>(),
            6 * 20
        );
        assert!(!report.failures.contains_key("account_locked"));
        assert_eq!(report.committed.values().sum::<usize>(), report.succeeded);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_before"], 225_000);
    }

    #[test]
    fn run_on_empty_ledger_is_a_no_op() {
        let ledger = Ledger::new();
        let report = run(&ledger, &SimConfig::default()).unwrap();
        assert_eq!(report.succeeded, 0);
        assert!(report.conserved());
    }

    #[test]
    fn panicking_worker_fails_the_run() {
        let result = thread::scope(|s| {
            let handles = vec![
                s.spawn(|| -> Vec<i32> { panic!("worker blew up") }),
                s.spawn(|| vec![1, 2]),
                s.spawn(|| -> Vec<i32> { panic!("worker blew up") }),
            ];
            join_workers(handles)
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("[0, 2] panicked"), "{err}");
    }

    #[test]
    fn tally_counts_by_event_and_kind() {
        let ledger = quick_ledger();
        let results = vec![
            ledger.deposit("Alice", Money::from_minor(100)),
            ledger.withdraw("Bob", Money::from_minor(40)),
            ledger.transfer_funds("Alice", "Carol", Money::from_minor(10)),
            ledger.withdraw("Bob", Money::from_major(1_000_000)),
        ];

        let tally = tally(MoneyTotal::from_minor(1_000), &results).unwrap();

        assert_eq!(tally.expected_total, MoneyTotal::from_minor(1_060));
        assert_eq!(tally.committed["banking.account.deposited"], 1);
        assert_eq!(tally.committed["banking.account.withdrawn"], 1);
        assert_eq!(tally.committed["banking.account.transferred"], 1);
        assert_eq!(tally.failures["insufficient_funds"], 1);
    }

    #[test]
    fn tally_reports_overflowing_expected_total() {
        let ledger = quick_ledger();
        let results = vec![ledger.deposit("Alice", Money::from_minor(1))];

        let err = tally(MoneyTotal::from_minor(i128::MAX), &results).unwrap_err();

        assert!(err.to_string().contains("overflowed"), "{err}");
    }
}
