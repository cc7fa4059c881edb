use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{budget_from_row, BUDGET_COLUMNS};
use crate::models::{Budget, Month, UserId};

/// The unique budget for (owner, category, month), if one was set.
/// Category comparison is exact and case-sensitive.
pub(crate) fn find_budget(
    conn: &Connection,
    user: UserId,
    category: &str,
    month: &Month,
) -> rusqlite::Result<Option<Budget>> {
    conn.query_row(
        &format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets
             WHERE user_id = ?1 AND month = ?2 AND category = ?3"
        ),
        params![user.0, month.as_str(), category],
        budget_from_row,
    )
    .optional()
}
