use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{Month, UserId};

pub(crate) const SOURCE_MANUAL: &str = "manual";
pub(crate) const SOURCE_STATEMENT: &str = "statement_upload";

/// Largest single amount, limit or goal accepted: one quadrillion. Running
/// totals of such values stay far inside `Decimal`'s range.
pub(crate) fn max_amount() -> Decimal {
    Decimal::new(1_000_000_000_000_000, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Some(Self::Expense),
            "income" => Some(Self::Income),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored ledger row. `amount` is always a non-negative magnitude; the
/// direction lives in `kind`.
#[derive(Debug, Clone)]
pub(crate) struct Transaction {
    pub(crate) id: Option<i64>,
    pub(crate) user_id: UserId,
    pub(crate) amount: Decimal,
    pub(crate) description: String,
    pub(crate) category: String,
    pub(crate) date: NaiveDate,
    pub(crate) kind: TransactionKind,
    pub(crate) is_recurring: bool,
    pub(crate) source: Option<String>,
    pub(crate) created_at: String,
}

impl Transaction {
    pub(crate) fn month(&self) -> Month {
        Month::of_date(self.date)
    }

    pub(crate) fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }
}

/// Caller-supplied fields for a single manual entry, validated by the ledger
/// before anything is written.
#[derive(Debug, Clone)]
pub(crate) struct NewTransaction {
    pub(crate) amount: Decimal,
    pub(crate) description: String,
    pub(crate) category: String,
    pub(crate) date: String,
    pub(crate) kind: Option<TransactionKind>,
    pub(crate) is_recurring: bool,
}
