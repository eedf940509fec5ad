use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use appointment_cell::models::Appointment;
use appointment_cell::services::{
    InMemoryPresence, NotificationError, NotificationEvent, NotificationKind, NotificationSink,
    RealtimeNotificationHub,
};
use availability_cell::models::Modality;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

fn sample_event() -> NotificationEvent {
    let now = Utc::now();
    let appointment = Appointment::requested(
        Uuid::new_v4(),
        Uuid::new_v4(),
        now + Duration::days(3),
        50,
        Modality::InPerson,
        now,
    );
    // Emitted by a third party so both participants are recipients
    NotificationEvent::new(NotificationKind::AppointmentCancelled, &appointment, Uuid::new_v4(), now)
}

#[tokio::test]
async fn online_users_receive_pushes_and_offline_users_fall_back() {
    let presence = Arc::new(InMemoryPresence::new());
    let fallback = Arc::new(RecordingSink::default());
    let hub = RealtimeNotificationHub::new(presence.clone(), fallback.clone());

    let event = sample_event();
    let online = event.appointment.client_id;
    let offline = event.appointment.professional_id;

    presence.set_online(online).await;
    let mut receiver = hub.subscribe(online).await;

    hub.publish(&event).await.unwrap();

    let pushed: NotificationEvent = serde_json::from_str(&receiver.recv().await.unwrap()).unwrap();
    assert_eq!(pushed, event);

    let stored = fallback.events.lock().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].recipients, vec![offline]);
    assert_eq!(stored[0].kind, NotificationKind::AppointmentCancelled);
}

#[tokio::test]
async fn online_without_a_subscription_still_falls_back() {
    let presence = Arc::new(InMemoryPresence::new());
    let fallback = Arc::new(RecordingSink::default());
    let hub = RealtimeNotificationHub::new(presence.clone(), fallback.clone());

    let event = sample_event();
    presence.set_online(event.appointment.client_id).await;
    presence.set_online(event.appointment.professional_id).await;

    let receiver = hub.subscribe(event.appointment.client_id).await;
    drop(receiver);

    hub.publish(&event).await.unwrap();

    let stored = fallback.events.lock().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].recipients.len(), 2);
}

#[tokio::test]
async fn everyone_connected_means_no_fallback() {
    let presence = Arc::new(InMemoryPresence::new());
    let fallback = Arc::new(RecordingSink::default());
    let hub = RealtimeNotificationHub::new(presence.clone(), fallback.clone());

    let event = sample_event();
    let mut receivers = Vec::new();
    for user in event.recipients.clone() {
        presence.set_online(user).await;
        receivers.push(hub.subscribe(user).await);
    }

    hub.publish(&event).await.unwrap();

    assert!(fallback.events.lock().await.is_empty());
    for receiver in receivers.iter_mut() {
        assert!(receiver.recv().await.is_ok());
    }

    hub.unsubscribe(event.appointment.client_id).await;
    presence.set_offline(event.appointment.professional_id).await;
    hub.publish(&event).await.unwrap();
    assert_eq!(fallback.events.lock().await[0].recipients.len(), 2);
}
