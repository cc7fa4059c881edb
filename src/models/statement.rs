use super::UserId;

/// Raw statement text as uploaded, pending extraction.
#[derive(Debug, Clone)]
pub(crate) struct StatementFile {
    pub(crate) id: i64,
    pub(crate) user_id: UserId,
    pub(crate) file_name: String,
    pub(crate) content: String,
    pub(crate) created_at: String,
}

/// Summary row written once per successful statement import.
#[derive(Debug, Clone)]
pub(crate) struct ProcessedStatement {
    pub(crate) id: i64,
    pub(crate) user_id: UserId,
    pub(crate) file_name: String,
    pub(crate) statement_file_id: Option<i64>,
    pub(crate) transaction_count: i64,
    pub(crate) created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobKind {
    ProcessStatement,
}

impl JobKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessStatement => "process_statement",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "process_statement" => Some(Self::ProcessStatement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobStatus {
    Pending,
    Success,
    Failed,
    Canceled,
}

impl JobStatus {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub(crate) id: i64,
    pub(crate) user_id: UserId,
    pub(crate) kind: JobKind,
    pub(crate) status: JobStatus,
    pub(crate) statement_file_id: i64,
    pub(crate) error: Option<String>,
    pub(crate) created_at: String,
    pub(crate) finished_at: Option<String>,
}
