use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::calculator::{checked_sum, contribution};
use super::locator::find_budget;
use super::mutator::{apply_delta, build_transaction, now};
use super::{pin_policy, Ledger};
use crate::auth::Session;
use crate::db;
use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

/// One record produced by statement extraction, already shape-checked.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractedTransaction {
    /// Calendar date or full instant; normalised on import.
    pub(crate) date: String,
    pub(crate) description: String,
    pub(crate) amount: Decimal,
    pub(crate) kind: TransactionKind,
    pub(crate) category: String,
}

impl ExtractedTransaction {
    fn to_new(&self) -> NewTransaction {
        NewTransaction {
            amount: self.amount,
            description: self.description.clone(),
            category: self.category.clone(),
            date: self.date.clone(),
            kind: Some(self.kind),
            is_recurring: false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ImportRequest {
    pub(crate) file_name: String,
    pub(crate) statement_file_id: Option<i64>,
    /// Pending job settled as `success` in the same commit as the batch.
    pub(crate) job_id: Option<i64>,
    pub(crate) transactions: Vec<ExtractedTransaction>,
}

/// Net change written to one budget by a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BudgetAdjustment {
    pub(crate) budget_id: i64,
    pub(crate) category: String,
    pub(crate) month: Month,
    pub(crate) delta: Decimal,
    pub(crate) spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BatchImported {
    pub(crate) statement_id: i64,
    pub(crate) inserted: usize,
    pub(crate) adjustments: Vec<BudgetAdjustment>,
}

impl Ledger<'_> {
    /// Insert every extracted transaction and write one netted delta per
    /// affected budget. The batch commits as a unit: a bad record, a job that
    /// is no longer pending or a storage failure leaves no rows, no budget
    /// changes and no summary.
    pub(crate) fn import_batch(
        &mut self,
        session: &Session,
        request: ImportRequest,
    ) -> LedgerResult<BatchImported> {
        let user = session.require()?;
        let created_at = now();
        let tx = self.db.write()?;
        pin_policy(&tx, self.policy)?;

        // Deltas keep first-touch order so writes are deterministic.
        let mut pending: Vec<BudgetAdjustment> = Vec::new();
        let mut slots: HashMap<i64, usize> = HashMap::new();
        let mut inserted = 0usize;

        for (i, entry) in request.transactions.iter().enumerate() {
            let txn = build_transaction(user, &entry.to_new(), SOURCE_STATEMENT, &created_at)
                .map_err(|e| match e {
                    LedgerError::InvalidInput(msg) => {
                        LedgerError::InvalidInput(format!("record {i}: {msg}"))
                    }
                    other => other,
                })?;
            db::insert_transaction(&tx, &txn)?;
            inserted += 1;

            let month = txn.month();
            let Some(budget) = find_budget(&tx, user, &txn.category, &month)? else {
                continue;
            };
            let Some(budget_id) = budget.id else {
                continue;
            };
            let delta = contribution(&txn, self.policy);
            match slots.get(&budget_id) {
                Some(&slot) => pending[slot].delta = checked_sum(pending[slot].delta, delta)?,
                None => {
                    slots.insert(budget_id, pending.len());
                    pending.push(BudgetAdjustment {
                        budget_id,
                        category: txn.category.clone(),
                        month,
                        delta,
                        spent: budget.spent,
                    });
                }
            }
        }

        for adjustment in &mut pending {
            let current = db::get_budget(&tx, adjustment.budget_id)?.ok_or_else(|| {
                LedgerError::NotFound(format!("budget {}", adjustment.budget_id))
            })?;
            adjustment.spent = apply_delta(&tx, &current, adjustment.delta)?;
            debug!(
                budget_id = adjustment.budget_id,
                category = %adjustment.category,
                delta = %adjustment.delta,
                "batch delta applied"
            );
        }

        let statement_id = db::insert_processed_statement(
            &tx,
            user,
            &request.file_name,
            request.statement_file_id,
            inserted as i64,
            &created_at,
        )?;
        if let Some(job_id) = request.job_id {
            if !db::finish_job(&tx, job_id, JobStatus::Success, None, &created_at)? {
                return Err(LedgerError::invalid(format!("job {job_id} is no longer pending")));
            }
        }
        tx.commit()?;

        info!(
            statement_id,
            file = %request.file_name,
            inserted,
            budgets = pending.len(),
            "statement batch imported"
        );
        Ok(BatchImported {
            statement_id,
            inserted,
            adjustments: pending,
        })
    }
}
