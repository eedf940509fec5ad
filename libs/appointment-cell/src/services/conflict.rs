// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use shared_utils::time_grid::ranges_overlap;

use crate::models::Appointment;

/// True when `[candidate_start, candidate_start + duration)` overlaps any
/// appointment that still holds its interval. Each existing appointment is
/// measured with its own stored duration.
pub fn is_occupied(candidate_start: DateTime<Utc>, duration_minutes: u32, existing: &[Appointment]) -> bool {
    first_conflict(candidate_start, duration_minutes, existing).is_some()
}

pub fn first_conflict(
    candidate_start: DateTime<Utc>,
    duration_minutes: u32,
    existing: &[Appointment],
) -> Option<&Appointment> {
    first_conflict_excluding(candidate_start, duration_minutes, existing, None)
}

/// Like [`first_conflict`], ignoring the appointment with id `exclude` so a
/// reschedule does not collide with its own current reservation.
pub fn first_conflict_excluding(
    candidate_start: DateTime<Utc>,
    duration_minutes: u32,
    existing: &[Appointment],
    exclude: Option<Uuid>,
) -> Option<&Appointment> {
    let candidate_end = candidate_start + Duration::minutes(i64::from(duration_minutes));

    existing.iter().find(|appointment| {
        Some(appointment.id) != exclude
            && appointment.status.occupies_calendar()
            && ranges_overlap(candidate_start, candidate_end, appointment.start_time, appointment.end_time())
    })
}
