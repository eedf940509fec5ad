// libs/appointment-cell/src/services/slots.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use availability_cell::models::DayIntervals;
use availability_cell::services::AvailabilityResolver;
use shared_config::AppConfig;
use shared_utils::time_grid::{local_instant, ClockTime, TimeRange, Weekday};

use crate::models::{Appointment, AppointmentError, Slot, SlotQuery, SlotsResponse};
use crate::services::conflict::is_occupied;
use crate::services::store::{with_timeout, AppointmentStore};

/// Candidate starts inside `intervals` on `date`, stepping by `stride_minutes`
/// while a whole session still fits. Starts that are not strictly after
/// `now`, fall into a DST gap, or overlap an open appointment are dropped.
pub fn enumerate_day(
    date: NaiveDate,
    intervals: &[TimeRange],
    tz: &Tz,
    session_minutes: u32,
    stride_minutes: u32,
    occupied: &[Appointment],
    now: DateTime<Utc>,
) -> Vec<Slot> {
    let stride = stride_minutes.max(1);
    let mut slots = Vec::new();

    for range in intervals {
        let mut current = range.start().minutes();

        while current
            .checked_add(session_minutes)
            .is_some_and(|end| end <= range.end().minutes())
        {
            let Some(clock) = ClockTime::from_minutes(current) else { break };

            if let Some(instant) = local_instant(date, clock, tz) {
                if instant > now && !is_occupied(instant, session_minutes, occupied) {
                    slots.push(Slot { time: clock, iso_timestamp: instant });
                }
            }
            current = current.saturating_add(stride);
        }
    }
    slots
}

/// Group a week's open intervals into slots keyed by weekday. Every weekday
/// is present, with an empty list when nothing is bookable.
pub fn enumerate_week(
    week: &[DayIntervals],
    tz: &Tz,
    session_minutes: u32,
    stride_minutes: u32,
    occupied: &[Appointment],
    now: DateTime<Utc>,
) -> BTreeMap<Weekday, Vec<Slot>> {
    let mut slots_by_day: BTreeMap<Weekday, Vec<Slot>> =
        Weekday::ALL.iter().map(|weekday| (*weekday, Vec::new())).collect();

    for day in week {
        let slots = enumerate_day(day.date, &day.intervals, tz, session_minutes, stride_minutes, occupied, now);
        slots_by_day.entry(day.weekday).or_default().extend(slots);
    }
    slots_by_day
}

pub struct SlotService {
    availability: Arc<AvailabilityResolver>,
    appointments: Arc<dyn AppointmentStore>,
    stride_minutes: u32,
    default_session_minutes: u32,
    storage_timeout: Duration,
}

impl SlotService {
    pub fn new(
        availability: Arc<AvailabilityResolver>,
        appointments: Arc<dyn AppointmentStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            availability,
            appointments,
            stride_minutes: config.slot_stride(),
            default_session_minutes: config.default_session_minutes,
            storage_timeout: config.storage_timeout(),
        }
    }

    pub async fn compute_slots(&self, query: SlotQuery) -> Result<SlotsResponse, AppointmentError> {
        self.compute_slots_at(query, Utc::now()).await
    }

    /// Bookable slots for the week starting at `query.week_start`, as seen at `now`.
    pub async fn compute_slots_at(&self, query: SlotQuery, now: DateTime<Utc>) -> Result<SlotsResponse, AppointmentError> {
        let week_start = query
            .week_start
            .ok_or_else(|| AppointmentError::ValidationError("week_start is required".to_string()))?;

        // One day of padding on each side covers any UTC offset.
        let from = midnight_utc(week_start.checked_sub_days(Days::new(1)), week_start)?;
        let to = midnight_utc(week_start.checked_add_days(Days::new(8)), week_start)?;

        let profile = self.availability.get_professional(query.professional_id).await?;
        let tz = profile.tz()?;
        let session_minutes = profile.session_minutes(self.default_session_minutes);

        let week = self
            .availability
            .week_intervals(query.professional_id, query.modality, week_start)
            .await?;

        let occupied = with_timeout(
            self.storage_timeout,
            "find_non_terminal_appointments",
            self.appointments.find_non_terminal_appointments(query.professional_id, from, to),
        )
        .await?;

        let slots_by_day = enumerate_week(&week, &tz, session_minutes, self.stride_minutes, &occupied, now);
        debug!(
            "Computed {} slots for professional {} in week of {}",
            slots_by_day.values().map(Vec::len).sum::<usize>(),
            query.professional_id,
            week_start
        );

        Ok(SlotsResponse {
            professional_id: query.professional_id,
            modality: query.modality,
            week_start,
            timezone: profile.timezone.clone(),
            slots_by_day,
            session_price: profile.session_price,
            session_duration: session_minutes,
        })
    }
}

fn midnight_utc(date: Option<NaiveDate>, week_start: NaiveDate) -> Result<DateTime<Utc>, AppointmentError> {
    date.map(|date| date.and_time(NaiveTime::default()).and_utc())
        .ok_or_else(|| AppointmentError::ValidationError(format!("week of {} is out of range", week_start)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use availability_cell::models::Modality;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 8).unwrap()
    }

    fn long_ago() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    fn times(slots: &[Slot]) -> Vec<String> {
        slots.iter().map(|slot| slot.time.to_string()).collect()
    }

    #[test]
    fn session_must_fit_inside_the_block() {
        let slots = enumerate_day(tuesday(), &[range("09:00", "10:00")], &Tz::UTC, 50, 30, &[], long_ago());
        assert_eq!(times(&slots), vec!["09:00"]);
    }

    #[test]
    fn stride_and_duration_are_independent() {
        let slots = enumerate_day(tuesday(), &[range("09:00", "11:00")], &Tz::UTC, 50, 30, &[], long_ago());
        assert_eq!(times(&slots), vec!["09:00", "09:30", "10:00"]);

        let slots = enumerate_day(tuesday(), &[range("09:00", "11:00")], &Tz::UTC, 30, 15, &[], long_ago());
        assert_eq!(slots.len(), 7);
    }

    #[test]
    fn occupied_and_past_starts_are_dropped() {
        let start = Utc.with_ymd_and_hms(2030, 1, 8, 9, 0, 0).unwrap();
        let booked = Appointment::requested(Uuid::new_v4(), Uuid::new_v4(), start, 50, Modality::Remote, long_ago());

        let slots = enumerate_day(tuesday(), &[range("09:00", "11:00")], &Tz::UTC, 50, 30, &[booked], long_ago());
        assert_eq!(times(&slots), vec!["10:00"]);

        let now = Utc.with_ymd_and_hms(2030, 1, 8, 9, 30, 0).unwrap();
        let slots = enumerate_day(tuesday(), &[range("09:00", "11:00")], &Tz::UTC, 50, 30, &[], now);
        assert_eq!(times(&slots), vec!["10:00"]);
    }

    #[test]
    fn wall_clock_is_converted_with_the_professional_timezone() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let slots = enumerate_day(tuesday(), &[range("09:00", "10:00")], &tz, 50, 30, &[], long_ago());

        assert_eq!(slots[0].iso_timestamp, Utc.with_ymd_and_hms(2030, 1, 8, 14, 0, 0).unwrap());
    }

    #[test]
    fn nonexistent_local_times_are_skipped() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let dst_start = NaiveDate::from_ymd_opt(2030, 3, 31).unwrap();
        let slots = enumerate_day(dst_start, &[range("01:00", "04:00")], &tz, 30, 30, &[], long_ago());

        assert_eq!(times(&slots), vec!["01:00", "01:30", "03:00", "03:30"]);
    }

    #[test]
    fn oversized_sessions_and_strides_yield_nothing_or_one() {
        let slots = enumerate_day(tuesday(), &[range("00:00", "24:00")], &Tz::UTC, u32::MAX - 100, 30, &[], long_ago());
        assert!(slots.is_empty());

        let slots = enumerate_day(tuesday(), &[range("09:00", "11:00")], &Tz::UTC, 50, u32::MAX, &[], long_ago());
        assert_eq!(times(&slots), vec!["09:00"]);
    }

    #[test]
    fn every_weekday_is_present() {
        let week = vec![DayIntervals {
            date: tuesday(),
            weekday: Weekday::Tuesday,
            intervals: vec![range("09:00", "10:00")],
        }];

        let by_day = enumerate_week(&week, &Tz::UTC, 50, 30, &[], long_ago());
        assert_eq!(by_day.len(), 7);
        assert_eq!(by_day[&Weekday::Tuesday].len(), 1);
        assert!(by_day[&Weekday::Sunday].is_empty());
    }
}
