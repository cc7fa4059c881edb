//! Read-only views over one user's ledger: budget status, transaction
//! listings, category spend and month-by-month trends.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::auth::Session;
use crate::db::{self, Database};
use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

const RECENT_STATEMENTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryStatus {
    pub(crate) category: String,
    pub(crate) month: Month,
    pub(crate) limit: Decimal,
    pub(crate) spent: Decimal,
    pub(crate) remaining: Decimal,
    pub(crate) percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BudgetStatus {
    pub(crate) month: Month,
    pub(crate) total_budget: Decimal,
    pub(crate) total_spent: Decimal,
    pub(crate) total_remaining: Decimal,
    pub(crate) categories: Vec<CategoryStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MonthlyTrend {
    pub(crate) month: String,
    pub(crate) income: Decimal,
    pub(crate) expenses: Decimal,
    pub(crate) net: Decimal,
}

pub(crate) fn list_budgets(db: &Database, session: &Session, month: &Month) -> LedgerResult<Vec<Budget>> {
    let user = session.require()?;
    Ok(db::budgets_for_month(db.conn(), user, month)?)
}

pub(crate) fn budget_status(db: &Database, session: &Session, month: &Month) -> LedgerResult<BudgetStatus> {
    let budgets = list_budgets(db, session, month)?;
    let total_budget: Decimal = budgets.iter().map(|b| b.monthly_limit).sum();
    let total_spent: Decimal = budgets.iter().map(|b| b.spent).sum();
    let categories = budgets
        .iter()
        .map(|b| CategoryStatus {
            category: b.category.clone(),
            month: b.month.clone(),
            limit: b.monthly_limit,
            spent: b.spent,
            remaining: b.remaining(),
            percentage: b.percentage().round_dp(1),
        })
        .collect();

    Ok(BudgetStatus {
        month: month.clone(),
        total_budget,
        total_spent,
        total_remaining: total_budget - total_spent,
        categories,
    })
}

/// Transactions dated `start..=end`, newest first.
pub(crate) fn transactions_between(
    db: &Database,
    session: &Session,
    start: NaiveDate,
    end: NaiveDate,
    limit: Option<u32>,
) -> LedgerResult<Vec<Transaction>> {
    let user = session.require()?;
    if start > end {
        return Err(LedgerError::invalid(format!(
            "start date {start} is after end date {end}"
        )));
    }
    let end_exclusive = end.succ_opt().unwrap_or(end);
    Ok(db::transactions_between(db.conn(), user, start, end_exclusive, limit)?)
}

pub(crate) fn transactions_for_month(
    db: &Database,
    session: &Session,
    month: &Month,
    limit: Option<u32>,
) -> LedgerResult<Vec<Transaction>> {
    let user = session.require()?;
    Ok(db::transactions_between(
        db.conn(),
        user,
        month.first_day(),
        month.next_first_day(),
        limit,
    )?)
}

/// Expense totals per category for one month, largest first.
pub(crate) fn spending_by_category(
    db: &Database,
    session: &Session,
    month: &Month,
) -> LedgerResult<Vec<(String, Decimal)>> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for txn in transactions_for_month(db, session, month, None)? {
        if txn.is_expense() {
            *totals.entry(txn.category).or_default() += txn.amount;
        }
    }
    let mut spending: Vec<(String, Decimal)> = totals.into_iter().collect();
    spending.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(spending)
}

/// Income, expenses and net for the last `months` months that have any
/// activity, oldest first.
pub(crate) fn monthly_trends(
    db: &Database,
    session: &Session,
    months: usize,
) -> LedgerResult<Vec<MonthlyTrend>> {
    let user = session.require()?;
    let mut by_month: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for txn in db::all_transactions(db.conn(), user)? {
        let entry = by_month.entry(txn.month().to_string()).or_default();
        match txn.kind {
            TransactionKind::Income => entry.0 += txn.amount,
            TransactionKind::Expense => entry.1 += txn.amount,
        }
    }

    let skip = by_month.len().saturating_sub(months);
    Ok(by_month
        .into_iter()
        .skip(skip)
        .map(|(month, (income, expenses))| MonthlyTrend {
            month,
            income,
            expenses,
            net: income - expenses,
        })
        .collect())
}

pub(crate) fn processed_statements(
    db: &Database,
    session: &Session,
) -> LedgerResult<Vec<ProcessedStatement>> {
    let user = session.require()?;
    Ok(db::latest_processed_statements(db.conn(), user, RECENT_STATEMENTS)?)
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
