use rust_decimal::Decimal;
use tracing::info;

use crate::auth::Session;
use crate::db::{self, Database};
use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

#[derive(Debug, Clone)]
pub(crate) struct NewGoal {
    pub(crate) name: String,
    pub(crate) target_amount: Decimal,
    pub(crate) target_date: String,
    pub(crate) category: String,
}

fn owned_goal(conn: &rusqlite::Connection, user: UserId, goal_id: i64) -> LedgerResult<SavingsGoal> {
    let goal = db::get_goal(conn, goal_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("savings goal {goal_id}")))?;
    if goal.user_id != user {
        return Err(LedgerError::Unauthorized(format!("savings goal {goal_id}")));
    }
    Ok(goal)
}

pub(crate) fn create_goal(db: &Database, session: &Session, new: NewGoal) -> LedgerResult<i64> {
    let user = session.require()?;
    if new.name.trim().is_empty() {
        return Err(LedgerError::invalid("goal name is required"));
    }
    if new.target_amount <= Decimal::ZERO || new.target_amount > max_amount() {
        return Err(LedgerError::invalid(format!(
            "target amount must be positive and at most {}, got {}",
            max_amount(),
            new.target_amount
        )));
    }
    let target_date = parse_transaction_date(&new.target_date)?;

    let goal = SavingsGoal {
        id: None,
        user_id: user,
        name: new.name.trim().to_string(),
        target_amount: new.target_amount,
        current_amount: Decimal::ZERO,
        target_date: target_date.format("%Y-%m-%d").to_string(),
        category: new.category.trim().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    let id = db::insert_goal(db.conn(), &goal)?;
    info!(goal_id = id, name = %goal.name, target = %goal.target_amount, "savings goal created");
    Ok(id)
}

/// Add `amount` (negative to withdraw) to a goal's saved total, flooring
/// at zero. Returns the new total.
pub(crate) fn update_progress(
    db: &mut Database,
    session: &Session,
    goal_id: i64,
    amount: Decimal,
) -> LedgerResult<Decimal> {
    let user = session.require()?;
    if amount.abs() > max_amount() {
        return Err(LedgerError::invalid(format!(
            "amount {amount} is above the {} limit",
            max_amount()
        )));
    }
    let tx = db.write()?;
    let goal = owned_goal(&tx, user, goal_id)?;
    let current = goal
        .current_amount
        .checked_add(amount)
        .ok_or_else(|| LedgerError::invalid(format!("goal {goal_id} total overflows")))?
        .max(Decimal::ZERO);
    db::update_goal_current(&tx, goal_id, current)?;
    tx.commit()?;
    info!(goal_id, %amount, %current, "savings progress updated");
    Ok(current)
}

pub(crate) fn list_goals(db: &Database, session: &Session) -> LedgerResult<Vec<SavingsGoal>> {
    let user = session.require()?;
    Ok(db::goals_for_user(db.conn(), user)?)
}

pub(crate) fn delete_goal(db: &Database, session: &Session, goal_id: i64) -> LedgerResult<()> {
    let user = session.require()?;
    owned_goal(db.conn(), user, goal_id)?;
    db::delete_goal(db.conn(), goal_id)?;
    info!(goal_id, "savings goal deleted");
    Ok(())
}
