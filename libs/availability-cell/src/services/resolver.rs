// libs/availability-cell/src/services/resolver.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Actor, Role};
use shared_utils::time_grid::{weekday_of, TimeRange};

use crate::models::{
    AvailabilityError, AvailabilityException, DayIntervals, DaySchedule, ExceptionKind, Modality,
    ProfessionalProfile, WeeklyAvailability,
};
use crate::services::store::AvailabilityStore;

/// Open intervals for `date`, applying exception precedence.
///
/// A blocked-day exception empties the date. Exception ranges replace the
/// weekly blocks outright. Without an exception the weekly blocks for the
/// date's weekday are returned. The result is ascending by start.
pub fn resolve_open_intervals(
    weekly: Option<&WeeklyAvailability>,
    exceptions: &[AvailabilityException],
    modality: Modality,
    date: NaiveDate,
) -> Vec<TimeRange> {
    let todays: Vec<&AvailabilityException> = exceptions
        .iter()
        .filter(|exception| exception.date == date && exception.modality == modality)
        .collect();

    if !todays.is_empty() {
        if todays.iter().any(|e| matches!(e.kind, ExceptionKind::BlockedDay)) {
            return Vec::new();
        }

        let mut ranges: Vec<TimeRange> = todays
            .iter()
            .flat_map(|exception| match &exception.kind {
                ExceptionKind::Ranges { ranges } => ranges.clone(),
                ExceptionKind::BlockedDay => Vec::new(),
            })
            .collect();
        ranges.sort();
        return ranges;
    }

    weekly
        .filter(|availability| availability.modality == modality)
        .map(|availability| availability.blocks_for(weekday_of(date)))
        .unwrap_or_default()
}

pub struct AvailabilityResolver {
    store: Arc<dyn AvailabilityStore>,
    storage_timeout: Duration,
}

impl AvailabilityResolver {
    pub fn new(store: Arc<dyn AvailabilityStore>, config: &AppConfig) -> Self {
        Self {
            store,
            storage_timeout: config.storage_timeout(),
        }
    }

    async fn timed<T, F>(&self, operation: &str, fut: F) -> Result<T, AvailabilityError>
    where
        F: Future<Output = Result<T, AvailabilityError>>,
    {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Availability storage timed out during {}", operation);
                Err(AvailabilityError::StorageTimeout)
            }
        }
    }

    /// Fails with `ProfessionalNotFound` for unknown ids and for users that
    /// are not professionals.
    pub async fn get_professional(&self, professional_id: Uuid) -> Result<ProfessionalProfile, AvailabilityError> {
        let profile = self
            .timed("get_professional", self.store.get_professional(professional_id))
            .await?;

        match profile {
            Some(profile) if profile.is_professional() => Ok(profile),
            _ => Err(AvailabilityError::ProfessionalNotFound(professional_id)),
        }
    }

    pub async fn get_weekly_availability(
        &self,
        professional_id: Uuid,
        modality: Modality,
    ) -> Result<Option<WeeklyAvailability>, AvailabilityError> {
        self.timed(
            "get_weekly_availability",
            self.store.get_weekly_availability(professional_id, modality),
        )
        .await
    }

    pub async fn open_intervals_for(
        &self,
        professional_id: Uuid,
        modality: Modality,
        date: NaiveDate,
    ) -> Result<Vec<TimeRange>, AvailabilityError> {
        debug!("Resolving open intervals for {} ({}) on {}", professional_id, modality, date);

        let (weekly, exceptions) = futures::try_join!(
            self.get_weekly_availability(professional_id, modality),
            self.timed(
                "get_exceptions",
                self.store.get_exceptions(professional_id, modality, date, date),
            ),
        )?;

        Ok(resolve_open_intervals(weekly.as_ref(), &exceptions, modality, date))
    }

    /// Open intervals for the seven days starting at `week_start`, from a
    /// single fetch of the weekly pattern and the week's exceptions.
    pub async fn week_intervals(
        &self,
        professional_id: Uuid,
        modality: Modality,
        week_start: NaiveDate,
    ) -> Result<Vec<DayIntervals>, AvailabilityError> {
        let week_end = week_start
            .checked_add_days(Days::new(6))
            .ok_or_else(|| AvailabilityError::ValidationError(format!("week of {} is out of range", week_start)))?;

        let (weekly, exceptions) = futures::try_join!(
            self.get_weekly_availability(professional_id, modality),
            self.timed(
                "get_exceptions",
                self.store.get_exceptions(professional_id, modality, week_start, week_end),
            ),
        )?;

        if weekly.is_none() {
            debug!("Professional {} has no {} availability configured", professional_id, modality);
        }

        Ok(week_start
            .iter_days()
            .take(7)
            .map(|date| DayIntervals {
                date,
                weekday: weekday_of(date),
                intervals: resolve_open_intervals(weekly.as_ref(), &exceptions, modality, date),
            })
            .collect())
    }

    pub async fn replace_weekly_availability(
        &self,
        actor: &Actor,
        professional_id: Uuid,
        modality: Modality,
        days: Vec<DaySchedule>,
    ) -> Result<WeeklyAvailability, AvailabilityError> {
        ensure_owner(actor, professional_id)?;
        self.get_professional(professional_id).await?;

        let availability = WeeklyAvailability::new(professional_id, modality, days);
        availability.validate()?;

        self.timed(
            "put_weekly_availability",
            self.store.put_weekly_availability(&availability),
        )
        .await?;

        info!("Weekly {} availability replaced for professional {}", modality, professional_id);
        Ok(availability)
    }

    pub async fn put_exception(
        &self,
        actor: &Actor,
        exception: AvailabilityException,
    ) -> Result<AvailabilityException, AvailabilityError> {
        ensure_owner(actor, exception.professional_id)?;
        self.get_professional(exception.professional_id).await?;
        exception.validate()?;

        self.timed("put_exception", self.store.put_exception(&exception)).await?;

        info!(
            "Availability exception stored for professional {} on {}",
            exception.professional_id, exception.date
        );
        Ok(exception)
    }
}

fn ensure_owner(actor: &Actor, professional_id: Uuid) -> Result<(), AvailabilityError> {
    let is_owner = actor.role == Role::Professional && actor.user_id == professional_id;

    if is_owner || actor.is_admin() {
        Ok(())
    } else {
        warn!("{} {} tried to edit availability of {}", actor.role, actor.user_id, professional_id);
        Err(AvailabilityError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use shared_utils::time_grid::Weekday;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    fn weekly(professional_id: Uuid) -> WeeklyAvailability {
        WeeklyAvailability::new(
            professional_id,
            Modality::Remote,
            vec![DaySchedule {
                weekday: Weekday::Monday,
                blocks: vec![range("14:00", "15:00"), range("09:00", "12:00")],
            }],
        )
    }

    fn exception(professional_id: Uuid, kind: ExceptionKind) -> AvailabilityException {
        AvailabilityException {
            professional_id,
            modality: Modality::Remote,
            date: monday(),
            kind,
            reason: None,
        }
    }

    #[test]
    fn weekly_blocks_are_sorted() {
        let id = Uuid::new_v4();
        let open = resolve_open_intervals(Some(&weekly(id)), &[], Modality::Remote, monday());
        assert_eq!(open, vec![range("09:00", "12:00"), range("14:00", "15:00")]);
    }

    #[test]
    fn exception_ranges_replace_weekly_pattern() {
        let id = Uuid::new_v4();
        let exceptions = vec![exception(id, ExceptionKind::Ranges { ranges: vec![range("14:00", "16:00")] })];

        let open = resolve_open_intervals(Some(&weekly(id)), &exceptions, Modality::Remote, monday());
        assert_eq!(open, vec![range("14:00", "16:00")]);
    }

    #[test]
    fn blocked_day_wins() {
        let id = Uuid::new_v4();
        let exceptions = vec![exception(id, ExceptionKind::BlockedDay)];

        assert!(resolve_open_intervals(Some(&weekly(id)), &exceptions, Modality::Remote, monday()).is_empty());
    }

    #[test]
    fn exceptions_for_other_modalities_or_dates_are_ignored() {
        let id = Uuid::new_v4();
        let mut other_modality = exception(id, ExceptionKind::BlockedDay);
        other_modality.modality = Modality::InPerson;
        let mut other_date = exception(id, ExceptionKind::BlockedDay);
        other_date.date = monday() + ChronoDuration::days(7);

        let open = resolve_open_intervals(
            Some(&weekly(id)),
            &[other_modality, other_date],
            Modality::Remote,
            monday(),
        );
        assert_eq!(open.len(), 2);
    }

    #[test]
    fn no_configuration_means_no_intervals() {
        assert!(resolve_open_intervals(None, &[], Modality::Remote, monday()).is_empty());
    }

    #[test]
    fn admin_and_owner_may_edit() {
        let id = Uuid::new_v4();
        assert!(ensure_owner(&Actor::professional(id), id).is_ok());
        assert!(ensure_owner(&Actor::admin(Uuid::new_v4()), id).is_ok());
        assert_eq!(ensure_owner(&Actor::professional(Uuid::new_v4()), id), Err(AvailabilityError::Unauthorized));
        assert_eq!(ensure_owner(&Actor::client(id), id), Err(AvailabilityError::Unauthorized));
    }
}
