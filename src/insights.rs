use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::ai::{parse_reply, CompletionClient};
use crate::auth::Session;
use crate::db::{self, Database};
use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

const RECENT_INSIGHTS: u32 = 10;

const INSIGHT_FORMAT: &str = r#"Provide insights in this JSON format:
{
  "insights": [
    {
      "type": "spending_pattern" | "budget_alert" | "savings_tip" | "anomaly",
      "title": "Brief title",
      "description": "Detailed insight with actionable advice",
      "priority": "low" | "medium" | "high"
    }
  ]
}

Focus on actionable advice, spending patterns, and budget optimization."#;

/// What the model is told about the user's finances.
#[derive(Debug, Clone)]
pub(crate) struct FinancialSummary {
    pub(crate) total_transactions: usize,
    pub(crate) categories: Vec<String>,
    pub(crate) month: Month,
    /// Expenses dated in `month` only.
    pub(crate) month_spending: Decimal,
    pub(crate) budgets: Vec<Budget>,
}

impl FinancialSummary {
    fn budget_status(&self) -> Value {
        Value::Array(
            self.budgets
                .iter()
                .map(|b| {
                    json!({
                        "category": b.category,
                        "spent": b.spent.to_string(),
                        "limit": b.monthly_limit.to_string(),
                        "overBudget": b.is_over(),
                    })
                })
                .collect(),
        )
    }

    fn prompt(&self) -> String {
        format!(
            "Analyze this financial data and provide 5 personalized insights:\n\n\
             Financial Summary:\n\
             - Total transactions: {}\n\
             - Categories: {}\n\
             - Spending in {}: ${}\n\
             - Budget status: {}\n\n{INSIGHT_FORMAT}",
            self.total_transactions,
            self.categories.join(", "),
            self.month,
            self.month_spending.round_dp(2),
            self.budget_status(),
        )
    }
}

pub(crate) fn financial_summary(db: &Database, user: UserId, month: &Month) -> LedgerResult<FinancialSummary> {
    let transactions = db::all_transactions(db.conn(), user)?;
    let categories: BTreeSet<String> = transactions.iter().map(|t| t.category.clone()).collect();
    let month_spending = transactions
        .iter()
        .filter(|t| t.is_expense() && t.month() == *month)
        .map(|t| t.amount)
        .sum();
    Ok(FinancialSummary {
        total_transactions: transactions.len(),
        categories: categories.into_iter().collect(),
        month: month.clone(),
        month_spending,
        budgets: db::budgets_for_month(db.conn(), user, month)?,
    })
}

/// Ask the model for insights on the user's finances and store them unread.
/// A reply with any malformed insight stores nothing.
pub(crate) fn generate_insights(
    db: &mut Database,
    session: &Session,
    client: &dyn CompletionClient,
    month: &Month,
) -> LedgerResult<Vec<i64>> {
    let user = session.require()?;
    if db::count_transactions(db.conn(), user)? == 0 {
        return Err(LedgerError::NoData("no transactions to analyze".into()));
    }
    let summary = financial_summary(db, user, month)?;

    let reply = client.complete(&summary.prompt())?;
    let insights = parse_insights(&reply, user).inspect_err(|e| {
        warn!(error = %e, "rejected insight output");
    })?;

    let tx = db.write()?;
    let ids = insights
        .iter()
        .map(|insight| db::insert_insight(&tx, insight))
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    tx.commit()?;

    info!(count = ids.len(), "insights generated");
    Ok(ids)
}

fn parse_insights(raw: &str, user: UserId) -> LedgerResult<Vec<Insight>> {
    let value = parse_reply(raw)?;
    let items = value
        .get("insights")
        .and_then(Value::as_array)
        .ok_or_else(|| LedgerError::invalid("model response has no insights array"))?;
    let created_at = chrono::Utc::now().to_rfc3339();

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let field = |name: &str| {
                item.get(name)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| LedgerError::invalid(format!("insight {i}: missing {name}")))
            };
            let kind_raw = field("type")?;
            let priority_raw = field("priority")?;
            Ok(Insight {
                id: None,
                user_id: user,
                kind: InsightKind::parse(&kind_raw).ok_or_else(|| {
                    LedgerError::invalid(format!("insight {i}: unknown type '{kind_raw}'"))
                })?,
                title: field("title")?,
                description: field("description")?,
                priority: Priority::parse(&priority_raw).ok_or_else(|| {
                    LedgerError::invalid(format!("insight {i}: unknown priority '{priority_raw}'"))
                })?,
                is_read: false,
                created_at: created_at.clone(),
            })
        })
        .collect()
}

pub(crate) fn latest_insights(db: &Database, session: &Session) -> LedgerResult<Vec<Insight>> {
    let user = session.require()?;
    Ok(db::latest_insights(db.conn(), user, RECENT_INSIGHTS)?)
}

pub(crate) fn mark_read(db: &Database, session: &Session, insight_id: i64) -> LedgerResult<()> {
    let user = session.require()?;
    let insight = db::get_insight(db.conn(), insight_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("insight {insight_id}")))?;
    if insight.user_id != user {
        return Err(LedgerError::Unauthorized(format!("insight {insight_id}")));
    }
    db::mark_insight_read(db.conn(), insight_id)?;
    Ok(())
}

/// Returns how many insights were marked.
pub(crate) fn mark_all_read(db: &Database, session: &Session) -> LedgerResult<usize> {
    let user = session.require()?;
    match db::mark_all_insights_read(db.conn(), user)? {
        0 => Err(LedgerError::NoUnreadInsights),
        n => {
            info!(count = n, "insights marked read");
            Ok(n)
        }
    }
}

#[cfg(test)]
#[path = "insights_tests.rs"]
mod tests;
