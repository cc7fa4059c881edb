//! Keeps each budget's stored `spent` consistent with the transaction
//! ledger across single inserts, deletes, budget upserts and batch imports.

mod calculator;
mod locator;
mod mutator;
mod reconciler;

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::{self, Database};
use crate::error::{LedgerError, LedgerResult};
use crate::models::Month;

pub(crate) use calculator::SignPolicy;
pub(crate) use reconciler::{ExtractedTransaction, ImportRequest};

pub(crate) struct Ledger<'db> {
    db: &'db mut Database,
    policy: SignPolicy,
}

impl<'db> Ledger<'db> {
    pub(crate) fn new(db: &'db mut Database, policy: SignPolicy) -> Self {
        Self { db, policy }
    }
}

const POLICY_SETTING: &str = "income_policy";

/// The first mutation records its policy in the database. Every later one
/// must run under the same policy, so a delete always reverses exactly what
/// the matching insert or backfill applied.
fn pin_policy(conn: &Connection, policy: SignPolicy) -> LedgerResult<()> {
    match db::get_setting(conn, POLICY_SETTING)? {
        None => {
            db::put_setting(conn, POLICY_SETTING, policy.as_str())?;
            Ok(())
        }
        Some(stored) if SignPolicy::parse(&stored) == Some(policy) => Ok(()),
        Some(stored) => Err(LedgerError::invalid(format!(
            "this ledger was built with income policy {stored}, not {}",
            policy.as_str()
        ))),
    }
}

/// What a single-transaction mutation did to the matching budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BudgetEffect {
    Adjusted { budget_id: i64, spent: Decimal },
    /// No budget exists for the category/month; nothing to reconcile.
    NoBudget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransactionAdded {
    pub(crate) transaction_id: i64,
    pub(crate) budget: BudgetEffect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransactionDeleted {
    pub(crate) transaction_id: i64,
    pub(crate) budget: BudgetEffect,
}

/// Which branch of the budget upsert was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BudgetOutcome {
    /// New budget; `spent` was backfilled from existing transactions.
    Created { budget_id: i64, spent: Decimal },
    /// Limit changed; `spent` untouched.
    Updated { budget_id: i64 },
    /// Limit set to zero on an existing budget.
    Deleted { budget_id: i64 },
}

/// Month a budget upsert targets, defaulting to the current one.
pub(crate) fn month_or_current(month: Option<&str>) -> LedgerResult<Month> {
    match month {
        Some(m) => Month::parse(m),
        None => Ok(Month::current()),
    }
}
