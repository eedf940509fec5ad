use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    AvailabilityError, AvailabilityException, DaySchedule, Modality, ProfessionalProfile, WeeklyAvailability,
};
use crate::services::store::AvailabilityStore;

/// Development fixture loaded into the in-memory store at startup.
#[derive(Debug, Default, Deserialize)]
pub struct MemorySeed {
    #[serde(default)]
    pub professionals: Vec<ProfessionalProfile>,
    #[serde(default)]
    pub weekly_availability: Vec<SeedWeekly>,
}

#[derive(Debug, Deserialize)]
pub struct SeedWeekly {
    pub professional_id: Uuid,
    pub modality: Modality,
    pub days: Vec<DaySchedule>,
}

/// Process-local store used in development and tests.
#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    professionals: RwLock<HashMap<Uuid, ProfessionalProfile>>,
    weekly: RwLock<HashMap<(Uuid, Modality), WeeklyAvailability>>,
    exceptions: RwLock<BTreeMap<(Uuid, Modality, NaiveDate), AvailabilityException>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile; profiles are owned by an external service in production.
    pub async fn upsert_professional(&self, profile: ProfessionalProfile) {
        debug!("Seeding profile {}", profile.id);
        self.professionals.write().await.insert(profile.id, profile);
    }

    /// Load a seed, rejecting malformed patterns and patterns for unknown profiles.
    pub async fn load_seed(&self, seed: MemorySeed) -> Result<(), AvailabilityError> {
        let profiles = seed.professionals.len();
        for profile in seed.professionals {
            profile.tz()?;
            self.upsert_professional(profile).await;
        }

        let patterns = seed.weekly_availability.len();
        for entry in seed.weekly_availability {
            if !self.professionals.read().await.contains_key(&entry.professional_id) {
                return Err(AvailabilityError::ProfessionalNotFound(entry.professional_id));
            }
            let availability = WeeklyAvailability::new(entry.professional_id, entry.modality, entry.days);
            availability.validate()?;
            self.put_weekly_availability(&availability).await?;
        }

        info!("Seeded {} profiles and {} weekly patterns", profiles, patterns);
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn get_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalProfile>, AvailabilityError> {
        Ok(self.professionals.read().await.get(&professional_id).cloned())
    }

    async fn get_weekly_availability(
        &self,
        professional_id: Uuid,
        modality: Modality,
    ) -> Result<Option<WeeklyAvailability>, AvailabilityError> {
        Ok(self.weekly.read().await.get(&(professional_id, modality)).cloned())
    }

    async fn get_exceptions(
        &self,
        professional_id: Uuid,
        modality: Modality,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityException>, AvailabilityError> {
        if from > to {
            return Ok(Vec::new());
        }

        let exceptions = self.exceptions.read().await;
        Ok(exceptions
            .range((professional_id, modality, from)..=(professional_id, modality, to))
            .map(|(_, exception)| exception.clone())
            .collect())
    }

    async fn put_weekly_availability(
        &self,
        availability: &WeeklyAvailability,
    ) -> Result<(), AvailabilityError> {
        self.weekly
            .write()
            .await
            .insert((availability.professional_id, availability.modality), availability.clone());
        Ok(())
    }

    async fn put_exception(
        &self,
        exception: &AvailabilityException,
    ) -> Result<(), AvailabilityError> {
        self.exceptions.write().await.insert(
            (exception.professional_id, exception.modality, exception.date),
            exception.clone(),
        );
        Ok(())
    }
}
