use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{
    AvailabilityError, AvailabilityException, Modality, ProfessionalProfile, WeeklyAvailability,
};
use crate::services::store::AvailabilityStore;

/// PostgREST-backed store. Tables: `professionals`, `weekly_availability`
/// (unique on professional_id, modality) and `availability_exceptions`
/// (unique on professional_id, modality, date).
pub struct SupabaseAvailabilityStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAvailabilityStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn get_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalProfile>, AvailabilityError> {
        let path = format!("/rest/v1/professionals?id=eq.{}&limit=1", professional_id);
        let rows: Vec<ProfessionalProfile> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next())
    }

    async fn get_weekly_availability(
        &self,
        professional_id: Uuid,
        modality: Modality,
    ) -> Result<Option<WeeklyAvailability>, AvailabilityError> {
        let path = format!(
            "/rest/v1/weekly_availability?professional_id=eq.{}&modality=eq.{}&limit=1",
            professional_id, modality
        );
        let rows: Vec<WeeklyAvailability> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next())
    }

    async fn get_exceptions(
        &self,
        professional_id: Uuid,
        modality: Modality,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityException>, AvailabilityError> {
        let path = format!(
            "/rest/v1/availability_exceptions?professional_id=eq.{}&modality=eq.{}&date=gte.{}&date=lte.{}&order=date.asc",
            professional_id, modality, from, to
        );
        let rows: Vec<AvailabilityException> = self.supabase.request(Method::GET, &path, None).await?;

        debug!("Loaded {} exceptions for professional {}", rows.len(), professional_id);
        Ok(rows)
    }

    async fn put_weekly_availability(
        &self,
        availability: &WeeklyAvailability,
    ) -> Result<(), AvailabilityError> {
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/weekly_availability?on_conflict=professional_id,modality",
                Some(json!(availability)),
                Some(SupabaseClient::upsert_representation()),
            )
            .await?;
        Ok(())
    }

    async fn put_exception(
        &self,
        exception: &AvailabilityException,
    ) -> Result<(), AvailabilityError> {
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/availability_exceptions?on_conflict=professional_id,modality,date",
                Some(json!(exception)),
                Some(SupabaseClient::upsert_representation()),
            )
            .await?;
        Ok(())
    }
}
