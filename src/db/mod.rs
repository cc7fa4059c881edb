mod rows;
mod schema;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

pub(crate) use rows::*;

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            // Fresh database - apply full schema
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn schema_version(&self) -> Result<i32> {
        Ok(self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })?)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a write unit of work. `BEGIN IMMEDIATE` takes the write lock up
    /// front so a budget read and the `spent` patch that follows it cannot
    /// interleave with another writer.
    pub(crate) fn write(&mut self) -> rusqlite::Result<rusqlite::Transaction<'_>> {
        self.conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
    }

    // ── Users ─────────────────────────────────────────────────

    pub(crate) fn register_user(&self, name: &str) -> LedgerResult<UserId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::invalid("user name is required"));
        }
        if find_user_by_name(&self.conn, name)?.is_some() {
            return Err(LedgerError::invalid(format!("user '{name}' already exists")));
        }
        let id = insert_user(&self.conn, name, &chrono::Utc::now().to_rfc3339())?;
        Ok(UserId(id))
    }

    pub(crate) fn find_user(&self, name: &str) -> LedgerResult<Option<User>> {
        Ok(find_user_by_name(&self.conn, name.trim())?)
    }
}

// ── Column helpers ────────────────────────────────────────────

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, format!("bad decimal '{raw}': {e}")))
}

pub(crate) fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    parse_transaction_date(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

pub(crate) fn month_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Month> {
    let raw: String = row.get(idx)?;
    Month::parse(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

fn enum_at<T>(
    row: &Row<'_>,
    idx: usize,
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown {what} '{raw}'")))
}

// ── Row mappers ───────────────────────────────────────────────

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, user_id, amount, description, category, date, kind, is_recurring, source, created_at";

pub(crate) fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: Some(row.get(0)?),
        user_id: UserId(row.get(1)?),
        amount: decimal_at(row, 2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        date: date_at(row, 5)?,
        kind: enum_at(row, 6, "transaction kind", TransactionKind::parse)?,
        is_recurring: row.get(7)?,
        source: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub(crate) const BUDGET_COLUMNS: &str =
    "id, user_id, category, month, monthly_limit, spent, updated_at";

pub(crate) fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: Some(row.get(0)?),
        user_id: UserId(row.get(1)?),
        category: row.get(2)?,
        month: month_at(row, 3)?,
        monthly_limit: decimal_at(row, 4)?,
        spent: decimal_at(row, 5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) const GOAL_COLUMNS: &str =
    "id, user_id, name, target_amount, current_amount, target_date, category, created_at";

pub(crate) fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<SavingsGoal> {
    Ok(SavingsGoal {
        id: Some(row.get(0)?),
        user_id: UserId(row.get(1)?),
        name: row.get(2)?,
        target_amount: decimal_at(row, 3)?,
        current_amount: decimal_at(row, 4)?,
        target_date: row.get(5)?,
        category: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) const INSIGHT_COLUMNS: &str =
    "id, user_id, kind, title, description, priority, is_read, created_at";

pub(crate) fn insight_from_row(row: &Row<'_>) -> rusqlite::Result<Insight> {
    Ok(Insight {
        id: Some(row.get(0)?),
        user_id: UserId(row.get(1)?),
        kind: enum_at(row, 2, "insight kind", InsightKind::parse)?,
        title: row.get(3)?,
        description: row.get(4)?,
        priority: enum_at(row, 5, "priority", Priority::parse)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) const JOB_COLUMNS: &str =
    "id, user_id, kind, status, statement_file_id, error, created_at, finished_at";

pub(crate) fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        kind: enum_at(row, 2, "job kind", JobKind::parse)?,
        status: enum_at(row, 3, "job status", JobStatus::parse)?,
        statement_file_id: row.get(4)?,
        error: row.get(5)?,
        created_at: row.get(6)?,
        finished_at: row.get(7)?,
    })
}
