use anyhow::{Context, bail};

use teller_banking::{Ledger, LockPolicy};
use teller_sim::{SimConfig, seed_ledger};

fn main() -> anyhow::Result<()> {
    teller_observability::init();

    let policy = LockPolicy::from_env().context("reading lock policy")?;
    let config = SimConfig::from_env().context("reading simulation config")?;
    tracing::info!(?policy, ?config, "starting simulation");

    let ledger = Ledger::with_policy(policy);
    seed_ledger(&ledger)?;

    let report = teller_sim::run(&ledger, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.conserved() {
        bail!(
            "funds not conserved: expected {}, found {}",
            report.expected_total,
            report.total_after
        );
    }
    Ok(())
}
