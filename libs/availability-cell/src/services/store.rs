use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    AvailabilityError, AvailabilityException, Modality, ProfessionalProfile, WeeklyAvailability,
};

/// Persistence seam for professional profiles, weekly patterns and exceptions.
///
/// Reads may be served by an eventually-consistent replica; availability is
/// advisory and every booking is re-validated on the appointment side.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn get_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalProfile>, AvailabilityError>;

    async fn get_weekly_availability(
        &self,
        professional_id: Uuid,
        modality: Modality,
    ) -> Result<Option<WeeklyAvailability>, AvailabilityError>;

    /// Exceptions dated within `from..=to`.
    async fn get_exceptions(
        &self,
        professional_id: Uuid,
        modality: Modality,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityException>, AvailabilityError>;

    /// Replaces any existing pattern for the same professional and modality.
    async fn put_weekly_availability(
        &self,
        availability: &WeeklyAvailability,
    ) -> Result<(), AvailabilityError>;

    /// Replaces any existing exception for the same professional, modality and date.
    async fn put_exception(
        &self,
        exception: &AvailabilityException,
    ) -> Result<(), AvailabilityError>;
}
