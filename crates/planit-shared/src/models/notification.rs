use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned {
        task_id: Uuid,
        task_title: String,
        workspace_id: Uuid,
        assigned_by: Uuid,
    },
    AdminRequestDecided {
        request_id: Uuid,
        approved: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: Uuid,
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient_id: Uuid, kind: NotificationKind) -> Self {
        Self {
            recipient_id,
            kind,
            created_at: Utc::now(),
        }
    }

    /// Event name used on the SSE stream.
    pub fn event_name(&self) -> &'static str {
        match self.kind {
            NotificationKind::TaskAssigned { .. } => "task_assigned",
            NotificationKind::AdminRequestDecided { .. } => "admin_request_decided",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let note = Notification::new(
            Uuid::nil(),
            NotificationKind::AdminRequestDecided {
                request_id: Uuid::nil(),
                approved: true,
            },
        );
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["type"], "admin_request_decided");
        assert_eq!(value["approved"], true);
        assert_eq!(note.event_name(), "admin_request_decided");
    }
}
