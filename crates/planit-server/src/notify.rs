use planit_shared::{Notification, NotificationKind};
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of in-app notifications to connected SSE clients.
///
/// Delivery is best effort: nobody listening, or a lagging listener, never
/// affects the request that produced the notification.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn send(&self, notification: Notification) {
        let recipient = notification.recipient_id;
        let event = notification.event_name();
        match self.tx.send(notification) {
            Ok(receivers) => {
                tracing::debug!(%recipient, event, receivers, "Notification published")
            }
            Err(_) => tracing::debug!(%recipient, event, "No listeners, notification dropped"),
        }
    }

    pub fn task_assigned(
        &self,
        assignee_id: Uuid,
        task_id: Uuid,
        task_title: &str,
        workspace_id: Uuid,
        assigned_by: Uuid,
    ) {
        if assignee_id == assigned_by {
            return;
        }
        self.send(Notification::new(
            assignee_id,
            NotificationKind::TaskAssigned {
                task_id,
                task_title: task_title.to_string(),
                workspace_id,
                assigned_by,
            },
        ));
    }

    pub fn request_decided(&self, requester_id: Uuid, request_id: Uuid, approved: bool) {
        self.send(Notification::new(
            requester_id,
            NotificationKind::AdminRequestDecided {
                request_id,
                approved,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sending_without_listeners_is_harmless() {
        let notifier = Notifier::new();
        notifier.request_decided(Uuid::new_v4(), Uuid::new_v4(), true);
    }

    #[tokio::test]
    async fn assignment_reaches_subscribers() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let (assignee, task, ws, actor) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        notifier.task_assigned(assignee, task, "Write report", ws, actor);

        let note = rx.recv().await.unwrap();
        assert_eq!(note.recipient_id, assignee);
        assert_eq!(
            note.kind,
            NotificationKind::TaskAssigned {
                task_id: task,
                task_title: "Write report".into(),
                workspace_id: ws,
                assigned_by: actor,
            }
        );
    }

    #[tokio::test]
    async fn self_assignment_is_silent() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let me = Uuid::new_v4();

        notifier.task_assigned(me, Uuid::new_v4(), "Mine", Uuid::new_v4(), me);

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
