// libs/appointment-cell/src/services/notification.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use availability_cell::models::Modality;

use crate::models::{Appointment, AppointmentStatus, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentRequested,
    AppointmentConfirmed,
    AppointmentRejected,
    RescheduleProposed,
    RescheduleResolved,
    AppointmentCancelled,
    AppointmentFinalized,
    FeedbackAdded,
}

impl NotificationKind {
    pub fn for_transition(transition: &Transition) -> Self {
        match transition {
            Transition::Confirm => NotificationKind::AppointmentConfirmed,
            Transition::Reject => NotificationKind::AppointmentRejected,
            Transition::ProposeReschedule { .. } => NotificationKind::RescheduleProposed,
            Transition::Accept | Transition::Decline => NotificationKind::RescheduleResolved,
            Transition::Cancel { .. } => NotificationKind::AppointmentCancelled,
            Transition::Finalize => NotificationKind::AppointmentFinalized,
            Transition::AddFeedback { .. } => NotificationKind::FeedbackAdded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub modality: Modality,
    pub status: AppointmentStatus,
}

impl From<&Appointment> for AppointmentSummary {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            client_id: appointment.client_id,
            professional_id: appointment.professional_id,
            start_time: appointment.start_time,
            duration_minutes: appointment.duration_minutes,
            modality: appointment.modality,
            status: appointment.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub recipients: Vec<Uuid>,
    pub actor_id: Uuid,
    pub appointment: AppointmentSummary,
    pub occurred_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Event addressed to every participant except the actor.
    pub fn new(kind: NotificationKind, appointment: &Appointment, actor_id: Uuid, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            recipients: appointment.counterparts_of(actor_id),
            actor_id,
            appointment: AppointmentSummary::from(appointment),
            occurred_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Outbound edge for appointment events. Delivery is owned by an external
/// service; callers treat failures as non-fatal.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), NotificationError>;
}

/// Writes events to the log. Used when no delivery service is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        info!(
            kind = ?event.kind,
            appointment_id = %event.appointment.id,
            recipients = ?event.recipients,
            "Appointment event"
        );
        Ok(())
    }
}
