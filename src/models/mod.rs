mod budget;
mod insight;
mod period;
mod savings_goal;
mod statement;
mod transaction;
mod user;

pub(crate) use budget::Budget;
pub(crate) use insight::{Insight, InsightKind, Priority};
pub(crate) use period::{date_to_instant, parse_transaction_date, Month};
pub(crate) use savings_goal::SavingsGoal;
pub(crate) use statement::{Job, JobKind, JobStatus, ProcessedStatement, StatementFile};
pub(crate) use transaction::{
    max_amount, NewTransaction, Transaction, TransactionKind, SOURCE_MANUAL, SOURCE_STATEMENT,
};
pub(crate) use user::{User, UserId};
