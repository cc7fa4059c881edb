use rust_decimal::Decimal;

use super::UserId;

#[derive(Debug, Clone)]
pub(crate) struct SavingsGoal {
    pub(crate) id: Option<i64>,
    pub(crate) user_id: UserId,
    pub(crate) name: String,
    pub(crate) target_amount: Decimal,
    pub(crate) current_amount: Decimal,
    pub(crate) target_date: String,
    pub(crate) category: String,
    pub(crate) created_at: String,
}

impl SavingsGoal {
    pub(crate) fn progress(&self) -> Decimal {
        if self.target_amount.is_zero() {
            return Decimal::ZERO;
        }
        self.current_amount
            .checked_div(self.target_amount)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
    }

    pub(crate) fn remaining(&self) -> Decimal {
        self.target_amount - self.current_amount
    }
}
