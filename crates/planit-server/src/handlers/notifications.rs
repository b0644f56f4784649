use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::Stream;
use planit_shared::Notification;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::routes::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn to_event(notification: &Notification) -> Option<Event> {
    match Event::default()
        .event(notification.event_name())
        .json_data(notification)
    {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode notification");
            None
        }
    }
}

fn for_recipient(notification: &Notification, user_id: Uuid) -> bool {
    notification.recipient_id == user_id
}

/// GET /api/notifications/stream
///
/// Lagged receivers skip what they missed and keep streaming.
pub async fn stream_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %user.id, "Notification stream opened");

    let user_id = user.id;
    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(move |msg| match msg {
        Ok(notification) if for_recipient(&notification, user_id) => {
            to_event(&notification).map(Ok)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(%user_id, error = %e, "Notification stream lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

#[cfg(test)]
mod tests {
    use planit_shared::NotificationKind;

    use super::*;

    fn decided(recipient: Uuid) -> Notification {
        Notification::new(
            recipient,
            NotificationKind::AdminRequestDecided {
                request_id: Uuid::new_v4(),
                approved: true,
            },
        )
    }

    #[test]
    fn filters_by_recipient() {
        let me = Uuid::new_v4();
        assert!(for_recipient(&decided(me), me));
        assert!(!for_recipient(&decided(Uuid::new_v4()), me));
    }

    #[test]
    fn encodes_event() {
        assert!(to_event(&decided(Uuid::new_v4())).is_some());
    }

    #[tokio::test]
    async fn stream_receives_only_own_notifications() {
        use crate::notify::Notifier;

        let notifier = Notifier::new();
        let me = Uuid::new_v4();
        let mut rx = Box::pin(
            BroadcastStream::new(notifier.subscribe())
                .filter_map(move |msg| msg.ok().filter(|n| for_recipient(n, me))),
        );

        notifier.send(decided(Uuid::new_v4()));
        notifier.send(decided(me));

        let received = rx.next().await.expect("notification");
        assert_eq!(received.recipient_id, me);
    }
}
