// libs/availability-cell/src/models.rs
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::auth::Role;
use shared_utils::time_grid::{self, ranges_are_disjoint, TimeGridError, TimeRange, Weekday};

// ==============================================================================
// CORE AVAILABILITY MODELS
// ==============================================================================

/// How a session is delivered. Availability is kept separately per modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Remote,
    InPerson,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Remote => write!(f, "remote"),
            Modality::InPerson => write!(f, "in_person"),
        }
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" | "online" => Ok(Modality::Remote),
            "in_person" | "in-person" | "presential" => Ok(Modality::InPerson),
            other => Err(format!("unknown modality '{}'", other)),
        }
    }
}

/// Read-only view of a professional's profile, owned by the profile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub id: Uuid,
    pub role: Role,
    /// Falls back to the configured default when unset.
    pub session_duration_minutes: Option<u32>,
    pub session_price: f64,
    /// IANA name; wall-clock availability is interpreted in this zone.
    pub timezone: String,
}

impl ProfessionalProfile {
    pub fn is_professional(&self) -> bool {
        self.role == Role::Professional
    }

    pub fn session_minutes(&self, default_minutes: u32) -> u32 {
        match self.session_duration_minutes {
            Some(minutes) if minutes > 0 => minutes,
            _ => default_minutes,
        }
    }

    pub fn tz(&self) -> Result<Tz, AvailabilityError> {
        time_grid::parse_timezone(&self.timezone).map_err(AvailabilityError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub weekday: Weekday,
    pub blocks: Vec<TimeRange>,
}

/// Recurring weekly pattern for one professional and one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub professional_id: Uuid,
    pub modality: Modality,
    pub days: Vec<DaySchedule>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyAvailability {
    pub fn new(professional_id: Uuid, modality: Modality, days: Vec<DaySchedule>) -> Self {
        Self {
            professional_id,
            modality,
            days,
            updated_at: Utc::now(),
        }
    }

    /// One schedule per weekday, non-overlapping blocks within each day.
    pub fn validate(&self) -> Result<(), AvailabilityError> {
        let mut seen = HashSet::new();

        for day in &self.days {
            if !seen.insert(day.weekday) {
                return Err(AvailabilityError::ValidationError(format!(
                    "{} is listed more than once", day.weekday
                )));
            }
            ranges_are_disjoint(&day.blocks)?;
        }
        Ok(())
    }

    /// Blocks for `weekday`, ascending by start.
    pub fn blocks_for(&self, weekday: Weekday) -> Vec<TimeRange> {
        let mut blocks: Vec<TimeRange> = self
            .days
            .iter()
            .filter(|day| day.weekday == weekday)
            .flat_map(|day| day.blocks.iter().copied())
            .collect();
        blocks.sort();
        blocks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Nothing is bookable on the date.
    BlockedDay,
    /// These ranges replace the weekly pattern for the date.
    Ranges { ranges: Vec<TimeRange> },
}

/// Date-specific override that takes precedence over the weekly pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityException {
    pub professional_id: Uuid,
    pub modality: Modality,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: ExceptionKind,
    pub reason: Option<String>,
}

impl AvailabilityException {
    pub fn validate(&self) -> Result<(), AvailabilityError> {
        match &self.kind {
            ExceptionKind::BlockedDay => Ok(()),
            ExceptionKind::Ranges { ranges } if ranges.is_empty() => Err(AvailabilityError::ValidationError(
                "an exception with no ranges must be a blocked_day".to_string(),
            )),
            ExceptionKind::Ranges { ranges } => Ok(ranges_are_disjoint(ranges)?),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceAvailabilityRequest {
    pub days: Vec<DaySchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutExceptionRequest {
    #[serde(flatten)]
    pub kind: ExceptionKind,
    pub reason: Option<String>,
}

/// Open intervals of a single calendar date after exceptions are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayIntervals {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub intervals: Vec<TimeRange>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Professional not found: {0}")]
    ProfessionalNotFound(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not authorized to manage this professional's availability")]
    Unauthorized,

    #[error("Storage request timed out")]
    StorageTimeout,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<TimeGridError> for AvailabilityError {
    fn from(err: TimeGridError) -> Self {
        AvailabilityError::ValidationError(err.to_string())
    }
}

impl From<DatabaseError> for AvailabilityError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Timeout => AvailabilityError::StorageTimeout,
            other => AvailabilityError::DatabaseError(other.to_string()),
        }
    }
}
