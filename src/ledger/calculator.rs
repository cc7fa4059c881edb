use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Transaction, TransactionKind};

const REFUND_MARKERS: [&str; 3] = ["refund", "return", "credit"];

/// How income rows count against a category's spend. One policy is chosen
/// per ledger and applied on every path that touches `spent`: single
/// insert, single delete, budget backfill and batch import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SignPolicy {
    /// Income reduces spend only when its description reads like a refund.
    #[default]
    RefundOnly,
    /// Every income row reduces spend.
    AllIncome,
}

impl SignPolicy {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::RefundOnly => "refund_only",
            Self::AllIncome => "all_income",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "refund_only" => Some(Self::RefundOnly),
            "all_income" => Some(Self::AllIncome),
            _ => None,
        }
    }
}

/// Case-insensitive substring match on "refund", "return" or "credit".
pub(crate) fn is_refund_like(description: &str) -> bool {
    let lower = description.to_lowercase();
    REFUND_MARKERS.iter().any(|m| lower.contains(m))
}

/// Signed effect of one transaction on its budget's `spent`.
pub(crate) fn contribution(txn: &Transaction, policy: SignPolicy) -> Decimal {
    match txn.kind {
        TransactionKind::Expense => txn.amount,
        TransactionKind::Income => match policy {
            SignPolicy::AllIncome => -txn.amount,
            SignPolicy::RefundOnly if is_refund_like(&txn.description) => -txn.amount,
            SignPolicy::RefundOnly => Decimal::ZERO,
        },
    }
}

/// Overflow-checked money addition.
pub(crate) fn checked_sum(total: Decimal, delta: Decimal) -> LedgerResult<Decimal> {
    total
        .checked_add(delta)
        .ok_or_else(|| LedgerError::invalid(format!("adding {delta} to {total} overflows")))
}

/// Net spend over transactions already restricted to one user, category and
/// month. Not clamped; flooring happens when the value is stored.
pub(crate) fn net_spend(txns: &[Transaction], policy: SignPolicy) -> LedgerResult<Decimal> {
    txns.iter()
        .try_fold(Decimal::ZERO, |total, t| checked_sum(total, contribution(t, policy)))
}
