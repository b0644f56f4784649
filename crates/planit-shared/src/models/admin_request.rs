use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "admin_request_status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum AdminRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// What an approver does with a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("request has already been {0}")]
    AlreadyDecided(AdminRequestStatus),
}

impl AdminRequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The only edges are pending -> approved and pending -> rejected.
    pub fn decide(self, action: DecisionAction) -> Result<AdminRequestStatus, TransitionError> {
        match (self, action) {
            (Self::Pending, DecisionAction::Approve) => Ok(Self::Approved),
            (Self::Pending, DecisionAction::Reject) => Ok(Self::Rejected),
            (decided, _) => Err(TransitionError::AlreadyDecided(decided)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AdminRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action must be one of approve, accept, reject (got {0:?})")]
pub struct ParseActionError(pub String);

impl FromStr for DecisionAction {
    type Err = ParseActionError;

    /// `accept` is accepted as an alias, matching the
    /// `/admin-requests/:id/accept` route.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "accept" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseActionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdminRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub requested_role: UserRole,
    pub reason: String,
    pub status: AdminRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request row joined with the requester, as shown in approval queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdminRequestWithUser {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub request: AdminRequest,
    pub user_email: String,
    pub user_name: String,
    pub current_role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_forward_only() {
        assert_eq!(
            AdminRequestStatus::Pending.decide(DecisionAction::Approve),
            Ok(AdminRequestStatus::Approved)
        );
        assert_eq!(
            AdminRequestStatus::Pending.decide(DecisionAction::Reject),
            Ok(AdminRequestStatus::Rejected)
        );
    }

    #[test]
    fn decided_requests_never_reopen() {
        for terminal in [AdminRequestStatus::Approved, AdminRequestStatus::Rejected] {
            assert!(terminal.is_terminal());
            for action in [DecisionAction::Approve, DecisionAction::Reject] {
                assert_eq!(
                    terminal.decide(action),
                    Err(TransitionError::AlreadyDecided(terminal))
                );
            }
        }
        assert!(!AdminRequestStatus::Pending.is_terminal());
    }

    #[test]
    fn actions_parse_leniently() {
        assert_eq!("approve".parse::<DecisionAction>(), Ok(DecisionAction::Approve));
        assert_eq!(" Accept ".parse::<DecisionAction>(), Ok(DecisionAction::Approve));
        assert_eq!("REJECT".parse::<DecisionAction>(), Ok(DecisionAction::Reject));
        assert!("deny".parse::<DecisionAction>().is_err());
        assert!("".parse::<DecisionAction>().is_err());
    }

    #[test]
    fn error_message_names_the_terminal_state() {
        let err = AdminRequestStatus::Approved
            .decide(DecisionAction::Reject)
            .unwrap_err();
        assert_eq!(err.to_string(), "request has already been approved");
    }
}
