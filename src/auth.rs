use tracing::warn;

use crate::db::Database;
use crate::error::{LedgerError, LedgerResult};
use crate::models::UserId;

/// The caller's identity for one operation. Every ledger entry point asks the
/// session for its user before touching storage.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Session {
    user: Option<UserId>,
}

impl Session {
    pub(crate) fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    pub(crate) fn anonymous() -> Self {
        Self { user: None }
    }

    pub(crate) fn require(&self) -> LedgerResult<UserId> {
        self.user.ok_or(LedgerError::Unauthenticated)
    }

    /// Resolve a session from a configured user name. An unknown name signs
    /// nobody in; operations then fail with `UNAUTHENTICATED`.
    pub(crate) fn resolve(db: &Database, name: Option<&str>) -> LedgerResult<Self> {
        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
            return Ok(Self::anonymous());
        };
        match db.find_user(name)? {
            Some(user) => Ok(Self::signed_in(user.id)),
            None => {
                warn!(user = name, "configured user is not registered");
                Ok(Self::anonymous())
            }
        }
    }
}
