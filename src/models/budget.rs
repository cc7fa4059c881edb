use rust_decimal::Decimal;

use super::{Month, UserId};

#[derive(Debug, Clone)]
pub(crate) struct Budget {
    pub(crate) id: Option<i64>,
    pub(crate) user_id: UserId,
    /// Matched by exact, case-sensitive equality against transaction categories.
    pub(crate) category: String,
    pub(crate) month: Month,
    pub(crate) monthly_limit: Decimal,
    /// Running aggregate; only the ledger writes this.
    pub(crate) spent: Decimal,
    pub(crate) updated_at: String,
}

impl Budget {
    pub(crate) fn remaining(&self) -> Decimal {
        self.monthly_limit - self.spent
    }

    /// Saturates at `Decimal::MAX` when a tiny limit makes the ratio unrepresentable.
    pub(crate) fn percentage(&self) -> Decimal {
        if self.monthly_limit.is_zero() {
            return Decimal::ZERO;
        }
        self.spent
            .checked_div(self.monthly_limit)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
    }

    pub(crate) fn is_over(&self) -> bool {
        self.spent > self.monthly_limit
    }
}
