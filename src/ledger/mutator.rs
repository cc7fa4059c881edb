use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::calculator::{checked_sum, contribution, net_spend};
use super::locator::find_budget;
use super::{pin_policy, BudgetEffect, BudgetOutcome, Ledger, TransactionAdded, TransactionDeleted};
use crate::auth::Session;
use crate::db;
use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

pub(super) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Validate caller-supplied fields into a ledger row. Nothing is written here.
pub(super) fn build_transaction(
    user: UserId,
    new: &NewTransaction,
    source: &str,
    created_at: &str,
) -> LedgerResult<Transaction> {
    if new.category.trim().is_empty() {
        return Err(LedgerError::invalid("category is required"));
    }
    let kind = new
        .kind
        .ok_or_else(|| LedgerError::invalid("transaction kind is required"))?;
    let date = parse_transaction_date(&new.date)?;
    if new.amount <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "amount must be a positive magnitude, got {}",
            new.amount
        )));
    }
    if new.amount > max_amount() {
        return Err(LedgerError::invalid(format!(
            "amount {} is above the {} limit",
            new.amount,
            max_amount()
        )));
    }
    Ok(Transaction {
        id: None,
        user_id: user,
        amount: new.amount,
        description: new.description.trim().to_string(),
        category: new.category.clone(),
        date,
        kind,
        is_recurring: new.is_recurring,
        source: Some(source.to_string()),
        created_at: created_at.to_string(),
    })
}

/// Apply `delta` to a budget's stored `spent`, flooring at zero.
pub(super) fn apply_delta(conn: &Connection, budget: &Budget, delta: Decimal) -> LedgerResult<Decimal> {
    let id = budget
        .id
        .ok_or_else(|| LedgerError::NotFound("budget row id".into()))?;
    let spent = checked_sum(budget.spent, delta)?.max(Decimal::ZERO);
    db::update_budget_spent(conn, id, spent, &now())?;
    debug!(budget_id = id, %delta, %spent, "budget spent adjusted");
    Ok(spent)
}

fn reconcile(conn: &Connection, txn: &Transaction, delta: Decimal) -> LedgerResult<BudgetEffect> {
    match find_budget(conn, txn.user_id, &txn.category, &txn.month())? {
        Some(budget) => {
            let spent = apply_delta(conn, &budget, delta)?;
            Ok(BudgetEffect::Adjusted {
                budget_id: budget.id.unwrap_or_default(),
                spent,
            })
        }
        None => Ok(BudgetEffect::NoBudget),
    }
}

impl Ledger<'_> {
    pub(crate) fn add_transaction(
        &mut self,
        session: &Session,
        new: NewTransaction,
    ) -> LedgerResult<TransactionAdded> {
        let user = session.require()?;
        let txn = build_transaction(user, &new, SOURCE_MANUAL, &now())?;

        let tx = self.db.write()?;
        pin_policy(&tx, self.policy)?;
        let transaction_id = db::insert_transaction(&tx, &txn)?;
        let budget = reconcile(&tx, &txn, contribution(&txn, self.policy))?;
        tx.commit()?;

        info!(
            transaction_id,
            category = %txn.category,
            kind = %txn.kind,
            amount = %txn.amount,
            ?budget,
            "transaction added"
        );
        Ok(TransactionAdded {
            transaction_id,
            budget,
        })
    }

    pub(crate) fn delete_transaction(
        &mut self,
        session: &Session,
        transaction_id: i64,
    ) -> LedgerResult<TransactionDeleted> {
        let user = session.require()?;
        let tx = self.db.write()?;
        pin_policy(&tx, self.policy)?;
        let txn = db::get_transaction(&tx, transaction_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {transaction_id}")))?;
        if txn.user_id != user {
            return Err(LedgerError::Unauthorized(format!("transaction {transaction_id}")));
        }

        db::delete_transaction(&tx, transaction_id)?;
        let budget = reconcile(&tx, &txn, -contribution(&txn, self.policy))?;
        tx.commit()?;

        info!(transaction_id, ?budget, "transaction deleted");
        Ok(TransactionDeleted {
            transaction_id,
            budget,
        })
    }

    /// Create, update or delete the budget for (category, month).
    ///
    /// A zero limit deletes an existing budget and is rejected when none
    /// exists. A new budget starts from the net spend already recorded for
    /// that category and month rather than from zero.
    pub(crate) fn set_budget(
        &mut self,
        session: &Session,
        category: &str,
        monthly_limit: Decimal,
        month: &Month,
    ) -> LedgerResult<BudgetOutcome> {
        let user = session.require()?;
        if category.trim().is_empty() {
            return Err(LedgerError::invalid("category is required"));
        }
        if monthly_limit < Decimal::ZERO {
            return Err(LedgerError::invalid(format!(
                "monthly limit cannot be negative, got {monthly_limit}"
            )));
        }
        if monthly_limit > max_amount() {
            return Err(LedgerError::invalid(format!(
                "monthly limit {monthly_limit} is above the {} limit",
                max_amount()
            )));
        }

        let tx = self.db.write()?;
        pin_policy(&tx, self.policy)?;
        let existing = find_budget(&tx, user, category, month)?;
        let outcome = match (existing.and_then(|b| b.id), monthly_limit.is_zero()) {
            (None, true) => {
                return Err(LedgerError::invalid(format!(
                    "cannot create a zero budget for {category} in {month}"
                )));
            }
            (Some(budget_id), true) => {
                db::delete_budget(&tx, budget_id)?;
                BudgetOutcome::Deleted { budget_id }
            }
            (Some(budget_id), false) => {
                db::update_budget_limit(&tx, budget_id, monthly_limit, &now())?;
                BudgetOutcome::Updated { budget_id }
            }
            (None, false) => {
                let history = db::transactions_for_category(&tx, user, category, month)?;
                let spent = net_spend(&history, self.policy)?.max(Decimal::ZERO);
                let budget = Budget {
                    id: None,
                    user_id: user,
                    category: category.to_string(),
                    month: month.clone(),
                    monthly_limit,
                    spent,
                    updated_at: now(),
                };
                let budget_id = db::insert_budget(&tx, &budget)?;
                BudgetOutcome::Created { budget_id, spent }
            }
        };
        tx.commit()?;

        info!(category, month = %month, limit = %monthly_limit, ?outcome, "budget set");
        Ok(outcome)
    }

    pub(crate) fn delete_budget(&mut self, session: &Session, budget_id: i64) -> LedgerResult<()> {
        let user = session.require()?;
        let tx = self.db.write()?;
        let budget = db::get_budget(&tx, budget_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("budget {budget_id}")))?;
        if budget.user_id != user {
            return Err(LedgerError::Unauthorized(format!("budget {budget_id}")));
        }
        db::delete_budget(&tx, budget_id)?;
        tx.commit()?;
        info!(budget_id, "budget deleted");
        Ok(())
    }
}
