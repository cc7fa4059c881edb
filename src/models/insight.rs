use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsightKind {
    SpendingPattern,
    BudgetAlert,
    SavingsTip,
    Anomaly,
}

impl InsightKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::SpendingPattern => "spending_pattern",
            Self::BudgetAlert => "budget_alert",
            Self::SavingsTip => "savings_tip",
            Self::Anomaly => "anomaly",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "spending_pattern" => Some(Self::SpendingPattern),
            "budget_alert" => Some(Self::BudgetAlert),
            "savings_tip" => Some(Self::SavingsTip),
            "anomaly" => Some(Self::Anomaly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Insight {
    pub(crate) id: Option<i64>,
    pub(crate) user_id: UserId,
    pub(crate) kind: InsightKind,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) priority: Priority,
    pub(crate) is_read: bool,
    pub(crate) created_at: String,
}
