mod ai;
mod auth;
mod config;
mod db;
mod error;
mod insights;
mod ledger;
mod models;
mod reports;
mod run;
mod savings;
mod statements;

use anyhow::Result;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = config::Config::load()?;
    init_tracing(&config.log_level);

    let db_path = config.database_path()?;
    tracing::debug!(path = %db_path.display(), policy = config.income_policy.as_str(), "opening ledger");
    let mut db = db::Database::open(&db_path)?;

    run::as_cli(&args, &mut db, &config)
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
}
