use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentError};
use crate::services::store::{AppointmentStore, CommitOutcome, InsertOutcome};

/// PostgREST-backed store. Reads go straight to the `appointments` table;
/// the conditional writes call the Postgres functions defined in
/// `sql/appointments.sql`, which run the overlap check and the write in one
/// transaction under the `appointments_no_overlap` exclusion constraint.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&limit=1", appointment_id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next())
    }

    async fn find_non_terminal_appointments(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        // end_time is a generated column (start_time + duration)
        let path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&status=in.(requested,confirmed,reschedule_requested)&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            professional_id,
            timestamp(to),
            timestamp(from)
        );
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;

        debug!("Found {} open appointments for professional {}", rows.len(), professional_id);
        Ok(rows)
    }

    async fn insert_appointment_if_free(&self, appointment: &Appointment) -> Result<InsertOutcome, AppointmentError> {
        let outcome: InsertOutcome = self
            .supabase
            .rpc("insert_appointment_if_free", json!({ "payload": appointment }))
            .await?;
        Ok(outcome)
    }

    async fn update_appointment_if_status(
        &self,
        current: &Appointment,
        next: &Appointment,
    ) -> Result<CommitOutcome, AppointmentError> {
        let outcome: CommitOutcome = self
            .supabase
            .rpc(
                "update_appointment_if_status",
                json!({
                    "expected_status": current.status,
                    "expected_revision": current.history.len(),
                    "payload": next,
                }),
            )
            .await?;
        Ok(outcome)
    }
}
