// libs/appointment-cell/src/models.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use availability_cell::models::{AvailabilityError, Modality};
use shared_database::DatabaseError;
use shared_utils::time_grid::{ClockTime, Weekday};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Requested,
    Confirmed,
    RescheduleRequested,
    Rejected,
    Cancelled,
    Finalized,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled | AppointmentStatus::Finalized
        )
    }

    /// Whether an appointment in this status holds its interval on the calendar.
    pub fn occupies_calendar(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Requested => write!(f, "requested"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::RescheduleRequested => write!(f, "reschedule_requested"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Finalized => write!(f, "finalized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// Pending reschedule, present only while the status is `reschedule_requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleProposal {
    pub proposed_by: Uuid,
    pub proposed_start: DateTime<Utc>,
    /// Restored when the counterparty declines.
    pub previous_status: AppointmentStatus,
    pub proposed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: u8,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Request,
    Confirm,
    Reject,
    ProposeReschedule,
    AcceptReschedule,
    DeclineReschedule,
    Cancel,
    Finalize,
    AddFeedback,
    PaymentRecorded,
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentAction::Request => "request",
            AppointmentAction::Confirm => "confirm",
            AppointmentAction::Reject => "reject",
            AppointmentAction::ProposeReschedule => "propose_reschedule",
            AppointmentAction::AcceptReschedule => "accept_reschedule",
            AppointmentAction::DeclineReschedule => "decline_reschedule",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::Finalize => "finalize",
            AppointmentAction::AddFeedback => "add_feedback",
            AppointmentAction::PaymentRecorded => "payment_recorded",
        };
        f.write_str(name)
    }
}

/// One immutable line of an appointment's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: AppointmentAction,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub modality: Modality,
    pub status: AppointmentStatus,
    pub reschedule: Option<RescheduleProposal>,
    pub payment_status: PaymentStatus,
    pub feedback: Option<Feedback>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// A freshly requested booking with its opening history entry.
    pub fn requested(
        client_id: Uuid,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: u32,
        modality: Modality,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            professional_id,
            start_time,
            duration_minutes,
            modality,
            status: AppointmentStatus::Requested,
            reschedule: None,
            payment_status: PaymentStatus::Pending,
            feedback: None,
            history: vec![HistoryEntry {
                action: AppointmentAction::Request,
                actor_id: client_id,
                at: now,
                note: None,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        user_id == self.client_id || user_id == self.professional_id
    }

    /// Participants other than `actor_id`; both when the actor is a third party.
    pub fn counterparts_of(&self, actor_id: Uuid) -> Vec<Uuid> {
        [self.client_id, self.professional_id]
            .into_iter()
            .filter(|id| *id != actor_id)
            .collect()
    }
}

/// End of a session starting at `start`; `ValidationError` when it would
/// fall outside the representable calendar.
pub fn session_end(start: DateTime<Utc>, duration_minutes: u32) -> Result<DateTime<Utc>, AppointmentError> {
    start
        .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
        .ok_or_else(|| AppointmentError::ValidationError("start time is out of range".to_string()))
}

/// A state-machine action with its payload, tagged by `action` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Transition {
    Confirm,
    Reject,
    ProposeReschedule { new_start: DateTime<Utc> },
    #[serde(alias = "accept_reschedule")]
    Accept,
    #[serde(alias = "decline_reschedule")]
    Decline,
    Cancel {
        #[serde(default)]
        reason: Option<String>,
    },
    Finalize,
    AddFeedback {
        rating: u8,
        #[serde(default)]
        comment: Option<String>,
    },
}

impl Transition {
    pub fn action(&self) -> AppointmentAction {
        match self {
            Transition::Confirm => AppointmentAction::Confirm,
            Transition::Reject => AppointmentAction::Reject,
            Transition::ProposeReschedule { .. } => AppointmentAction::ProposeReschedule,
            Transition::Accept => AppointmentAction::AcceptReschedule,
            Transition::Decline => AppointmentAction::DeclineReschedule,
            Transition::Cancel { .. } => AppointmentAction::Cancel,
            Transition::Finalize => AppointmentAction::Finalize,
            Transition::AddFeedback { .. } => AppointmentAction::AddFeedback,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAppointment {
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub modality: Modality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub professional_id: Uuid,
    pub modality: Modality,
    pub week_start: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Wall-clock start in the professional's timezone.
    pub time: ClockTime,
    pub iso_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub professional_id: Uuid,
    pub modality: Modality,
    pub week_start: NaiveDate,
    pub timezone: String,
    pub slots_by_day: BTreeMap<Weekday, Vec<Slot>>,
    pub session_price: f64,
    pub session_duration: u32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Professional not found: {0}")]
    ProfessionalNotFound(Uuid),

    #[error("Requested time is already taken")]
    SlotConflict { conflicting_id: Option<Uuid> },

    #[error("Cannot {action} an appointment that is {status}")]
    InvalidTransition {
        status: AppointmentStatus,
        action: AppointmentAction,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Storage request timed out")]
    StorageTimeout,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AvailabilityError> for AppointmentError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::ProfessionalNotFound(id) => AppointmentError::ProfessionalNotFound(id),
            AvailabilityError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            AvailabilityError::Unauthorized => AppointmentError::Unauthorized(err.to_string()),
            AvailabilityError::StorageTimeout => AppointmentError::StorageTimeout,
            AvailabilityError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Timeout => AppointmentError::StorageTimeout,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}
