use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::ai::OpenAiClient;
use crate::auth::Session;
use crate::config::Config;
use crate::db::Database;
use crate::insights;
use crate::ledger::{month_or_current, BudgetEffect, BudgetOutcome, Ledger};
use crate::models::*;
use crate::reports;
use crate::savings::{self, NewGoal};
use crate::statements::{self, StatementExtractor};

pub(crate) fn as_cli(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };
    let rest = &args[2..];

    match command.as_str() {
        "register" => return cli_register(rest, db),
        "--help" | "-h" | "help" => {
            print_usage();
            return Ok(());
        }
        "--version" | "-V" | "version" => {
            println!("budgetledger {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let session = Session::resolve(db, config.user.as_deref())?;
    match command.as_str() {
        "add" => cli_add(rest, db, config, &session),
        "delete" => cli_delete(rest, db, config, &session),
        "budget" => cli_budget(rest, db, config, &session),
        "status" | "s" => cli_status(rest, db, &session),
        "list" | "ls" => cli_list(rest, db, &session),
        "spending" => cli_spending(rest, db, &session),
        "trends" => cli_trends(rest, db, &session),
        "upload" => cli_upload(rest, db, &session).map(|_| ()),
        "import" => {
            cli_upload(rest, db, &session)?;
            cli_run_jobs(db, config)
        }
        "jobs" => match rest.first().map(String::as_str) {
            Some("run") => cli_run_jobs(db, config),
            _ => anyhow::bail!("Usage: budgetledger jobs run"),
        },
        "job" => cli_job(rest, db, &session),
        "statements" => cli_statements(db, &session),
        "goals" => cli_goals(rest, db, &session),
        "insights" => cli_insights(rest, db, config, &session),
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("budgetledger - monthly budgets kept in step with your transactions");
    println!();
    println!("Usage: budgetledger <command>");
    println!();
    println!("Commands:");
    println!("  register <name>                       Register a user (set BUDGETLEDGER_USER to use it)");
    println!("  add <expense|income> <amount> <category> <YYYY-MM-DD> <description...>");
    println!("    --recurring                         Mark as recurring");
    println!("  delete <id>                           Delete a transaction");
    println!("  budget set <category> <limit>         Create or change a budget (limit 0 deletes)");
    println!("    --month <YYYY-MM>                   Budget month (default: current)");
    println!("  budget rm <id>                        Delete a budget");
    println!("  status [YYYY-MM]                      Budget status for a month");
    println!("  list [YYYY-MM]                        List transactions");
    println!("    --limit <n>                         Show at most n");
    println!("    --from <YYYY-MM-DD> --to <YYYY-MM-DD>  Date range instead of a month");
    println!("  spending [YYYY-MM]                    Expenses by category");
    println!("  trends [n]                            Income and expenses for the last n months");
    println!("  upload <file>                         Store a statement and queue its extraction");
    println!("  import <file>                         Upload a statement and run the queue");
    println!("  jobs run                              Run all pending extraction jobs");
    println!("  job <id>                              Show a job");
    println!("  job cancel <id>                       Cancel a pending job");
    println!("  statements                            Recently imported statements");
    println!("  goals                                 List savings goals");
    println!("  goals add <name> <target> <YYYY-MM-DD> [category]");
    println!("  goals save <id> <amount>              Add (or withdraw, if negative) savings");
    println!("  goals rm <id>                         Delete a goal");
    println!("  insights                              Latest insights");
    println!("  insights generate                     Ask the model for new insights");
    println!("  insights read <id> | read-all         Mark insights read");
    println!("  --help, -h                            Show this help");
    println!("  --version, -V                         Show version");
}

// ── Argument helpers ─────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
        } else if arg == "--recurring" {
            continue;
        } else if arg.starts_with("--") {
            skip = true;
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim_start_matches('$')).with_context(|| format!("Invalid amount: {raw}"))
}

fn parse_id(raw: Option<&str>, usage: &str) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow::anyhow!("Usage: {usage}"))?;
    raw.parse().with_context(|| format!("Invalid id: {raw}"))
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("Invalid date: {raw}"))
}

fn ledger<'db>(db: &'db mut Database, config: &Config) -> Ledger<'db> {
    Ledger::new(db, config.income_policy)
}

fn describe_effect(effect: &BudgetEffect) -> String {
    match effect {
        BudgetEffect::Adjusted { budget_id, spent } => {
            format!("budget #{budget_id} spent is now ${spent:.2}")
        }
        BudgetEffect::NoBudget => "no budget to reconcile".into(),
    }
}

fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

// ── Commands ─────────────────────────────────────────────────

fn cli_register(args: &[String], db: &mut Database) -> Result<()> {
    let name = args
        .first()
        .ok_or_else(|| anyhow::anyhow!("Usage: budgetledger register <name>"))?;
    let id = db.register_user(name)?;
    println!("Registered {name} ({id})");
    Ok(())
}

fn cli_add(args: &[String], db: &mut Database, config: &Config, session: &Session) -> Result<()> {
    let pos = positional(args);
    if pos.len() < 4 {
        anyhow::bail!(
            "Usage: budgetledger add <expense|income> <amount> <category> <YYYY-MM-DD> <description...>"
        );
    }
    let new = NewTransaction {
        kind: TransactionKind::parse(pos[0]),
        amount: parse_amount(pos[1])?,
        category: pos[2].to_string(),
        date: pos[3].to_string(),
        description: pos[4..].join(" "),
        is_recurring: args.iter().any(|a| a == "--recurring"),
    };
    let added = ledger(db, config).add_transaction(session, new)?;
    println!(
        "Added transaction #{}: {}",
        added.transaction_id,
        describe_effect(&added.budget)
    );
    Ok(())
}

fn cli_delete(args: &[String], db: &mut Database, config: &Config, session: &Session) -> Result<()> {
    let id = parse_id(args.first().map(String::as_str), "budgetledger delete <id>")?;
    let deleted = ledger(db, config).delete_transaction(session, id)?;
    println!(
        "Deleted transaction #{}: {}",
        deleted.transaction_id,
        describe_effect(&deleted.budget)
    );
    Ok(())
}

fn cli_budget(args: &[String], db: &mut Database, config: &Config, session: &Session) -> Result<()> {
    let pos = positional(args);
    match pos.first().copied() {
        Some("set") if pos.len() >= 3 => {
            let month = month_or_current(flag(args, "--month"))?;
            let limit = parse_amount(pos[2])?;
            let outcome = ledger(db, config).set_budget(session, pos[1], limit, &month)?;
            match outcome {
                BudgetOutcome::Created { budget_id, spent } => println!(
                    "Budget #{budget_id} created for {} in {month} with spent ${spent:.2}",
                    pos[1]
                ),
                BudgetOutcome::Updated { budget_id } => {
                    println!("Budget #{budget_id} limit set to ${limit:.2}")
                }
                BudgetOutcome::Deleted { budget_id } => println!("Budget #{budget_id} deleted"),
            }
            Ok(())
        }
        Some("rm") => {
            let id = parse_id(pos.get(1).copied(), "budgetledger budget rm <id>")?;
            ledger(db, config).delete_budget(session, id)?;
            println!("Budget #{id} deleted");
            Ok(())
        }
        _ => anyhow::bail!(
            "Usage: budgetledger budget set <category> <limit> [--month YYYY-MM] | budget rm <id>"
        ),
    }
}

fn cli_status(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    let month = month_or_current(positional(args).first().copied())?;
    let status = reports::budget_status(db, session, &month)?;

    println!("Budgets - {month}");
    println!("{}", "─".repeat(64));
    if status.categories.is_empty() {
        println!("  No budgets for {month}");
        return Ok(());
    }
    println!(
        "  {:<24} {:>10} {:>10} {:>10} {:>6}",
        "Category", "Limit", "Spent", "Remaining", "%"
    );
    for c in &status.categories {
        println!(
            "  {:<24} {:>10.2} {:>10.2} {:>10.2} {:>6}",
            c.category, c.limit, c.spent, c.remaining, c.percentage
        );
    }
    println!("{}", "─".repeat(64));
    println!(
        "  {:<24} {:>10.2} {:>10.2} {:>10.2}",
        "Total", status.total_budget, status.total_spent, status.total_remaining
    );
    Ok(())
}

fn cli_list(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    let limit = flag(args, "--limit")
        .map(|l| l.parse::<u32>().with_context(|| format!("Invalid limit: {l}")))
        .transpose()?;
    let txns = match (flag(args, "--from"), flag(args, "--to")) {
        (Some(from), Some(to)) => {
            reports::transactions_between(db, session, parse_day(from)?, parse_day(to)?, limit)?
        }
        (None, None) => {
            let month = month_or_current(positional(args).first().copied())?;
            reports::transactions_for_month(db, session, &month, limit)?
        }
        _ => anyhow::bail!("--from and --to must be given together"),
    };

    if txns.is_empty() {
        println!("No transactions");
        return Ok(());
    }
    println!(
        "{:<6} {:<10} {:<8} {:>10} {:<20} Description",
        "ID", "Date", "Kind", "Amount", "Category"
    );
    println!("{}", "─".repeat(72));
    for t in &txns {
        println!(
            "{:<6} {:<10} {:<8} {:>10.2} {:<20} {}",
            t.id.unwrap_or(0),
            t.date.to_string(),
            t.kind.as_str(),
            t.amount,
            t.category,
            t.description
        );
    }
    Ok(())
}

fn cli_spending(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    let month = month_or_current(positional(args).first().copied())?;
    let spending = reports::spending_by_category(db, session, &month)?;
    if spending.is_empty() {
        println!("No expenses in {month}");
        return Ok(());
    }
    println!("Spending by Category - {month}:");
    for (name, amount) in &spending {
        println!("  {name:<24} ${amount:.2}");
    }
    Ok(())
}

fn cli_trends(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    let months = match positional(args).first() {
        Some(n) => n.parse().with_context(|| format!("Invalid month count: {n}"))?,
        None => 6,
    };
    let trends = reports::monthly_trends(db, session, months)?;
    println!("{:<8} {:>12} {:>12} {:>12}", "Month", "Income", "Expenses", "Net");
    for t in &trends {
        println!(
            "{:<8} {:>12.2} {:>12.2} {:>12.2}",
            t.month, t.income, t.expenses, t.net
        );
    }
    Ok(())
}

fn cli_upload(args: &[String], db: &mut Database, session: &Session) -> Result<i64> {
    let file_path = args
        .first()
        .map(|a| shellexpand(a))
        .ok_or_else(|| anyhow::anyhow!("Usage: budgetledger upload <file>"))?;
    let path = Path::new(&file_path);
    if !path.exists() {
        anyhow::bail!("File not found: {file_path}");
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read statement: {file_path}"))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.clone());

    let file_id = statements::upload_statement(db, session, &file_name, &content)?;
    let job_id = statements::schedule_statement(db, session, file_id)?;
    println!("Uploaded {file_name}; job #{job_id} is pending");
    Ok(job_id)
}

fn cli_run_jobs(db: &mut Database, config: &Config) -> Result<()> {
    let client = OpenAiClient::from_config(&config.ai)?;
    let extractor = StatementExtractor::new(&client);
    let runs = statements::run_pending(db, &extractor, config.income_policy)?;
    if runs.is_empty() {
        println!("No pending jobs");
    }
    for run in &runs {
        match &run.error {
            None => println!(
                "Job #{}: {} ({} transactions imported)",
                run.job_id, run.status, run.inserted
            ),
            Some(error) => println!("Job #{}: {} - {error}", run.job_id, run.status),
        }
    }
    Ok(())
}

fn cli_job(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    if args.first().map(String::as_str) == Some("cancel") {
        let id = parse_id(args.get(1).map(String::as_str), "budgetledger job cancel <id>")?;
        statements::cancel_job(db, session, id)?;
        println!("Job #{id} canceled");
        return Ok(());
    }
    let id = parse_id(args.first().map(String::as_str), "budgetledger job <id>")?;
    let job = statements::job_status(db, session, id)?;
    println!("Job #{}: {}", job.id, job.status);
    println!("  Statement file: #{}", job.statement_file_id);
    println!("  Created:        {}", job.created_at);
    if let Some(finished) = &job.finished_at {
        println!("  Finished:       {finished}");
    }
    if let Some(error) = &job.error {
        println!("  Error:          {error}");
    }
    Ok(())
}

fn cli_statements(db: &mut Database, session: &Session) -> Result<()> {
    let processed = reports::processed_statements(db, session)?;
    if processed.is_empty() {
        println!("No statements imported");
        return Ok(());
    }
    for p in &processed {
        println!(
            "#{:<4} {:<32} {:>4} transactions  {}",
            p.id, p.file_name, p.transaction_count, p.created_at
        );
    }
    Ok(())
}

fn cli_goals(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    match args.first().map(String::as_str) {
        None => {
            let goals = savings::list_goals(db, session)?;
            if goals.is_empty() {
                println!("No savings goals");
            }
            for g in &goals {
                println!(
                    "#{:<4} {:<24} ${:.2} of ${:.2} ({}%) by {}",
                    g.id.unwrap_or(0),
                    g.name,
                    g.current_amount,
                    g.target_amount,
                    g.progress().round_dp(1),
                    g.target_date
                );
            }
            Ok(())
        }
        Some("add") if args.len() >= 4 => {
            let id = savings::create_goal(
                db,
                session,
                NewGoal {
                    name: args[1].clone(),
                    target_amount: parse_amount(&args[2])?,
                    target_date: args[3].clone(),
                    category: args.get(4).cloned().unwrap_or_default(),
                },
            )?;
            println!("Savings goal #{id} created");
            Ok(())
        }
        Some("save") if args.len() >= 3 => {
            let id = parse_id(Some(args[1].as_str()), "budgetledger goals save <id> <amount>")?;
            let current = savings::update_progress(db, session, id, parse_amount(&args[2])?)?;
            println!("Savings goal #{id} now at ${current:.2}");
            Ok(())
        }
        Some("rm") => {
            let id = parse_id(args.get(1).map(String::as_str), "budgetledger goals rm <id>")?;
            savings::delete_goal(db, session, id)?;
            println!("Savings goal #{id} deleted");
            Ok(())
        }
        _ => anyhow::bail!(
            "Usage: budgetledger goals [add <name> <target> <YYYY-MM-DD> [category] | save <id> <amount> | rm <id>]"
        ),
    }
}

fn cli_insights(args: &[String], db: &mut Database, config: &Config, session: &Session) -> Result<()> {
    match args.first().map(String::as_str) {
        None => {
            let latest = insights::latest_insights(db, session)?;
            if latest.is_empty() {
                println!("No insights yet");
            }
            for i in &latest {
                let marker = if i.is_read { " " } else { "*" };
                println!(
                    "{marker} #{:<4} [{}] {} ({})",
                    i.id.unwrap_or(0),
                    i.priority.as_str(),
                    i.title,
                    i.kind.as_str()
                );
                println!("         {}", i.description);
            }
            Ok(())
        }
        Some("generate") => {
            let client = OpenAiClient::from_config(&config.ai)?;
            let ids = insights::generate_insights(db, session, &client, &Month::current())?;
            println!("Generated {} insights", ids.len());
            Ok(())
        }
        Some("read") => {
            let id = parse_id(args.get(1).map(String::as_str), "budgetledger insights read <id>")?;
            insights::mark_read(db, session, id)?;
            println!("Insight #{id} marked read");
            Ok(())
        }
        Some("read-all") => {
            let count = insights::mark_all_read(db, session)?;
            println!("Marked {count} insights read");
            Ok(())
        }
        Some(other) => anyhow::bail!("Unknown insights command: {other}"),
    }
}
