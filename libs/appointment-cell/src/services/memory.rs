use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError};
use crate::services::conflict::first_conflict_excluding;
use crate::services::store::{AppointmentStore, CommitOutcome, InsertOutcome};

/// Process-local appointment store. Both conditional writes run inside a
/// single write-lock section with no await between check and write.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Appointment> {
        self.appointments.read().await.values().cloned().collect()
    }
}

fn open_for_professional(map: &HashMap<Uuid, Appointment>, professional_id: Uuid) -> Vec<Appointment> {
    map.values()
        .filter(|a| a.professional_id == professional_id && a.status.occupies_calendar())
        .cloned()
        .collect()
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn find_non_terminal_appointments(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = open_for_professional(&appointments, professional_id)
            .into_iter()
            .filter(|a| a.start_time < to && from < a.end_time())
            .collect();
        found.sort_by_key(|a| a.start_time);
        Ok(found)
    }

    async fn insert_appointment_if_free(&self, appointment: &Appointment) -> Result<InsertOutcome, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        let open = open_for_professional(&appointments, appointment.professional_id);
        if let Some(existing) =
            first_conflict_excluding(appointment.start_time, appointment.duration_minutes, &open, Some(appointment.id))
        {
            warn!("Insert of {} conflicts with {}", appointment.id, existing.id);
            return Ok(InsertOutcome::Conflict { conflicting_id: Some(existing.id) });
        }

        appointments.insert(appointment.id, appointment.clone());
        debug!("Inserted appointment {}", appointment.id);
        Ok(InsertOutcome::Inserted)
    }

    async fn update_appointment_if_status(
        &self,
        current: &Appointment,
        next: &Appointment,
    ) -> Result<CommitOutcome, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        let stored = match appointments.get(&current.id) {
            Some(stored) => stored,
            None => return Ok(CommitOutcome::Stale { current: None }),
        };
        if stored.status != current.status || stored.history.len() != current.history.len() {
            return Ok(CommitOutcome::Stale { current: Some(stored.status) });
        }

        let moved = stored.start_time != next.start_time || stored.duration_minutes != next.duration_minutes;
        if moved && next.status.occupies_calendar() {
            let open = open_for_professional(&appointments, next.professional_id);
            if let Some(existing) =
                first_conflict_excluding(next.start_time, next.duration_minutes, &open, Some(next.id))
            {
                return Ok(CommitOutcome::Conflict { conflicting_id: Some(existing.id) });
            }
        }

        appointments.insert(next.id, next.clone());
        Ok(CommitOutcome::Committed)
    }
}
