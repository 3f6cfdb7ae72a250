#![forbid(unsafe_code)]

//! `portal-shell` binary entry point.

use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use portal_core::logging::init_subscriber;
use portal_runtime::{FileStorage, Store, StoreTier, SystemClock};
use portal_shell::command::run_script;
use portal_shell::config::ShellConfig;
use portal_shell::PortalShell;

fn main() -> anyhow::Result<()> {
    let config = ShellConfig::parse();
    init_subscriber(config.log_format(), Some(&config.log));

    let durable_path = config.durable_path();
    let session_path = config.session_path();
    let durable = Store::open(StoreTier::Durable, Box::new(FileStorage::new(&durable_path)));
    let session = Store::open(StoreTier::Session, Box::new(FileStorage::new(&session_path)));
    tracing::debug!(
        backend = durable.backend_name(),
        durable = %durable_path.display(),
        session = %session_path.display(),
        durable_stats = ?durable.stats(),
        session_stats = ?session.stats(),
        "opened stores"
    );

    let mut shell = PortalShell::new(durable.shared(), session.shared(), Arc::new(SystemClock));
    let outcome = shell.bootstrap();
    tracing::debug!(?outcome, "startup reconciliation");

    let stdout = io::stdout();
    let summary = match &config.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening script {}", path.display()))?;
            run_script(&mut shell, BufReader::new(file), stdout.lock())?
        }
        None => run_script(&mut shell, io::stdin().lock(), stdout.lock())?,
    };

    tracing::info!(
        applied = summary.applied,
        rejected = summary.rejected,
        "script finished"
    );
    Ok(())
}
