//! Row-level reads and writes. Every function takes a plain `&Connection`
//! so it can run either directly or inside a write transaction (which
//! derefs to `Connection`). Every query that reads user data is scoped by
//! `user_id` in its predicate.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use super::{
    budget_from_row, goal_from_row, insight_from_row, job_from_row, transaction_from_row,
    BUDGET_COLUMNS, GOAL_COLUMNS, INSIGHT_COLUMNS, JOB_COLUMNS, TRANSACTION_COLUMNS,
};
use crate::models::*;

// ── Users ─────────────────────────────────────────────────────

pub(crate) fn insert_user(conn: &Connection, name: &str, created_at: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, created_at) VALUES (?1, ?2)",
        params![name, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn find_user_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, created_at FROM users WHERE name = ?1",
        params![name],
        |row| {
            Ok(User {
                id: UserId(row.get(0)?),
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
}

// ── Transactions ──────────────────────────────────────────────

pub(crate) fn insert_transaction(conn: &Connection, txn: &Transaction) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO transactions (user_id, amount, description, category, date, kind, is_recurring, source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            txn.user_id.0,
            txn.amount.to_string(),
            txn.description,
            txn.category,
            date_to_instant(txn.date),
            txn.kind.as_str(),
            txn.is_recurring,
            txn.source,
            txn.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch by identity alone; ownership is checked by the caller so that a
/// missing row and a foreign row can be told apart.
pub(crate) fn get_transaction(conn: &Connection, id: i64) -> rusqlite::Result<Option<Transaction>> {
    conn.query_row(
        &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"),
        params![id],
        transaction_from_row,
    )
    .optional()
}

pub(crate) fn delete_transaction(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
    Ok(())
}

/// Transactions for one user with `start <= date < end`, newest first.
pub(crate) fn transactions_between(
    conn: &Connection,
    user: UserId,
    start: NaiveDate,
    end_exclusive: NaiveDate,
    limit: Option<u32>,
) -> rusqlite::Result<Vec<Transaction>> {
    let mut sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions
         WHERE user_id = ?1 AND date >= ?2 AND date < ?3
         ORDER BY date DESC, id DESC"
    );
    if let Some(l) = limit {
        sql.push_str(&format!(" LIMIT {l}"));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![user.0, date_to_instant(start), date_to_instant(end_exclusive)],
        transaction_from_row,
    )?;
    rows.collect()
}

pub(crate) fn transactions_for_category(
    conn: &Connection,
    user: UserId,
    category: &str,
    month: &Month,
) -> rusqlite::Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions
         WHERE user_id = ?1 AND category = ?2 AND date >= ?3 AND date < ?4
         ORDER BY date, id"
    ))?;
    let rows = stmt.query_map(
        params![
            user.0,
            category,
            date_to_instant(month.first_day()),
            date_to_instant(month.next_first_day()),
        ],
        transaction_from_row,
    )?;
    rows.collect()
}

pub(crate) fn all_transactions(conn: &Connection, user: UserId) -> rusqlite::Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?1 ORDER BY date DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![user.0], transaction_from_row)?;
    rows.collect()
}

pub(crate) fn count_transactions(conn: &Connection, user: UserId) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
        params![user.0],
        |row| row.get(0),
    )
}

// ── Budgets ───────────────────────────────────────────────────

pub(crate) fn get_budget(conn: &Connection, id: i64) -> rusqlite::Result<Option<Budget>> {
    conn.query_row(
        &format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?1"),
        params![id],
        budget_from_row,
    )
    .optional()
}

pub(crate) fn budgets_for_month(
    conn: &Connection,
    user: UserId,
    month: &Month,
) -> rusqlite::Result<Vec<Budget>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BUDGET_COLUMNS} FROM budgets WHERE user_id = ?1 AND month = ?2 ORDER BY category"
    ))?;
    let rows = stmt.query_map(params![user.0, month.as_str()], budget_from_row)?;
    rows.collect()
}

pub(crate) fn insert_budget(conn: &Connection, budget: &Budget) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO budgets (user_id, category, month, monthly_limit, spent, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            budget.user_id.0,
            budget.category,
            budget.month.as_str(),
            budget.monthly_limit.to_string(),
            budget.spent.to_string(),
            budget.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn update_budget_limit(
    conn: &Connection,
    id: i64,
    limit: Decimal,
    updated_at: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE budgets SET monthly_limit = ?1, updated_at = ?2 WHERE id = ?3",
        params![limit.to_string(), updated_at, id],
    )?;
    Ok(())
}

pub(crate) fn update_budget_spent(
    conn: &Connection,
    id: i64,
    spent: Decimal,
    updated_at: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE budgets SET spent = ?1, updated_at = ?2 WHERE id = ?3",
        params![spent.to_string(), updated_at, id],
    )?;
    Ok(())
}

pub(crate) fn delete_budget(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM budgets WHERE id = ?1", params![id])?;
    Ok(())
}

// ── Savings goals ─────────────────────────────────────────────

pub(crate) fn insert_goal(conn: &Connection, goal: &SavingsGoal) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO savings_goals (user_id, name, target_amount, current_amount, target_date, category, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            goal.user_id.0,
            goal.name,
            goal.target_amount.to_string(),
            goal.current_amount.to_string(),
            goal.target_date,
            goal.category,
            goal.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn get_goal(conn: &Connection, id: i64) -> rusqlite::Result<Option<SavingsGoal>> {
    conn.query_row(
        &format!("SELECT {GOAL_COLUMNS} FROM savings_goals WHERE id = ?1"),
        params![id],
        goal_from_row,
    )
    .optional()
}

pub(crate) fn goals_for_user(conn: &Connection, user: UserId) -> rusqlite::Result<Vec<SavingsGoal>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GOAL_COLUMNS} FROM savings_goals WHERE user_id = ?1 ORDER BY target_date, id"
    ))?;
    let rows = stmt.query_map(params![user.0], goal_from_row)?;
    rows.collect()
}

pub(crate) fn update_goal_current(conn: &Connection, id: i64, current: Decimal) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE savings_goals SET current_amount = ?1 WHERE id = ?2",
        params![current.to_string(), id],
    )?;
    Ok(())
}

pub(crate) fn delete_goal(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM savings_goals WHERE id = ?1", params![id])?;
    Ok(())
}

// ── Insights ──────────────────────────────────────────────────

pub(crate) fn insert_insight(conn: &Connection, insight: &Insight) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO insights (user_id, kind, title, description, priority, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            insight.user_id.0,
            insight.kind.as_str(),
            insight.title,
            insight.description,
            insight.priority.as_str(),
            insight.is_read,
            insight.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn get_insight(conn: &Connection, id: i64) -> rusqlite::Result<Option<Insight>> {
    conn.query_row(
        &format!("SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = ?1"),
        params![id],
        insight_from_row,
    )
    .optional()
}

pub(crate) fn latest_insights(conn: &Connection, user: UserId, limit: u32) -> rusqlite::Result<Vec<Insight>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INSIGHT_COLUMNS} FROM insights WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![user.0, limit], insight_from_row)?;
    rows.collect()
}

pub(crate) fn mark_insight_read(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("UPDATE insights SET is_read = 1 WHERE id = ?1", params![id])?;
    Ok(())
}

pub(crate) fn mark_all_insights_read(conn: &Connection, user: UserId) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE insights SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user.0],
    )
}

// ── Statements ────────────────────────────────────────────────

pub(crate) fn insert_statement_file(
    conn: &Connection,
    user: UserId,
    file_name: &str,
    content: &str,
    created_at: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO statement_files (user_id, file_name, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user.0, file_name, content, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn get_statement_file(conn: &Connection, id: i64) -> rusqlite::Result<Option<StatementFile>> {
    conn.query_row(
        "SELECT id, user_id, file_name, content, created_at FROM statement_files WHERE id = ?1",
        params![id],
        |row| {
            Ok(StatementFile {
                id: row.get(0)?,
                user_id: UserId(row.get(1)?),
                file_name: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub(crate) fn insert_processed_statement(
    conn: &Connection,
    user: UserId,
    file_name: &str,
    statement_file_id: Option<i64>,
    transaction_count: i64,
    created_at: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO processed_statements (user_id, file_name, statement_file_id, transaction_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.0, file_name, statement_file_id, transaction_count, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn latest_processed_statements(
    conn: &Connection,
    user: UserId,
    limit: u32,
) -> rusqlite::Result<Vec<ProcessedStatement>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, file_name, statement_file_id, transaction_count, created_at
         FROM processed_statements WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user.0, limit], |row| {
        Ok(ProcessedStatement {
            id: row.get(0)?,
            user_id: UserId(row.get(1)?),
            file_name: row.get(2)?,
            statement_file_id: row.get(3)?,
            transaction_count: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;
    rows.collect()
}

// ── Jobs ──────────────────────────────────────────────────────

pub(crate) fn insert_job(
    conn: &Connection,
    user: UserId,
    kind: JobKind,
    statement_file_id: i64,
    created_at: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO jobs (user_id, kind, status, statement_file_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.0,
            kind.as_str(),
            JobStatus::Pending.as_str(),
            statement_file_id,
            created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn get_job(conn: &Connection, id: i64) -> rusqlite::Result<Option<Job>> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
        params![id],
        job_from_row,
    )
    .optional()
}

pub(crate) fn pending_jobs(conn: &Connection) -> rusqlite::Result<Vec<Job>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE status = 'pending' ORDER BY id"
    ))?;
    let rows = stmt.query_map([], job_from_row)?;
    rows.collect()
}

/// Move a job out of `pending`. Returns false if the job had already left
/// `pending` (e.g. it was canceled while queued).
pub(crate) fn finish_job(
    conn: &Connection,
    id: i64,
    status: JobStatus,
    error: Option<&str>,
    finished_at: &str,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE jobs SET status = ?1, error = ?2, finished_at = ?3 WHERE id = ?4 AND status = 'pending'",
        params![status.as_str(), error, finished_at, id],
    )?;
    Ok(changed == 1)
}

// ── Settings ──────────────────────────────────────────────────

pub(crate) fn get_setting(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub(crate) fn put_setting(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}
