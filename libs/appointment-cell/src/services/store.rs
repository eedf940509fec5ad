use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    /// The id is unknown when the database constraint caught the overlap.
    Conflict { conflicting_id: Option<Uuid> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed,
    /// The new interval overlaps another open appointment.
    Conflict { conflicting_id: Option<Uuid> },
    /// The stored row moved on since it was read. `current` is `None` when it
    /// no longer exists.
    Stale { current: Option<AppointmentStatus> },
}

/// Persistence seam for appointments. The two conditional writes are the
/// only way appointments are created or changed and each must be atomic:
/// the overlap check and the write either both happen or neither does.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Open appointments of `professional_id` overlapping `[from, to)`.
    async fn find_non_terminal_appointments(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn insert_appointment_if_free(&self, appointment: &Appointment) -> Result<InsertOutcome, AppointmentError>;

    /// Replace `current` with `next` only if the stored row still has the
    /// status and revision (history length) of `current`. When `next` holds
    /// the calendar on a different interval, that interval is re-checked
    /// against every other open appointment in the same write.
    async fn update_appointment_if_status(
        &self,
        current: &Appointment,
        next: &Appointment,
    ) -> Result<CommitOutcome, AppointmentError>;
}

/// Bound a store call by the configured storage timeout.
pub(crate) async fn with_timeout<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T, AppointmentError>
where
    F: Future<Output = Result<T, AppointmentError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Appointment storage timed out during {}", operation);
            Err(AppointmentError::StorageTimeout)
        }
    }
}
