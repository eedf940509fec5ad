//! Calendar arithmetic shared by the availability and appointment cells.
//!
//! Clock times are minute-resolution wall-clock values on a 24h dial. All
//! interval comparisons are half-open: `[start, end)`, so ranges that merely
//! touch never overlap.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeGridError {
    #[error("malformed clock time '{0}', expected HH:MM")]
    MalformedTime(String),

    #[error("time range {start}-{end} is empty or inverted")]
    EmptyRange { start: ClockTime, end: ClockTime },

    #[error("time ranges {first} and {second} overlap")]
    OverlappingRanges { first: TimeRange, second: TimeRange },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

// ==============================================================================
// WEEKDAYS
// ==============================================================================

/// The one day enumeration used across the workspace. Ordering is
/// Monday-first and never depends on locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        Weekday::ALL
            .iter()
            .copied()
            .find(|day| day.name() == lowered)
            .ok_or_else(|| format!("unknown weekday '{}'", value))
    }
}

pub fn weekday_of(date: NaiveDate) -> Weekday {
    date.weekday().into()
}

// ==============================================================================
// CLOCK TIMES
// ==============================================================================

/// Minutes since midnight, `0..=1440`. `24:00` only makes sense as the end
/// of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY as u16);

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then(|| ClockTime(minutes as u16))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }

    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        self.minutes().checked_add(minutes).and_then(Self::from_minutes)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_range_end(&raw).map_err(serde::de::Error::custom)
    }
}

fn split_clock(input: &str) -> Option<(u32, u32)> {
    let (hour, minute) = input.split_once(':')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
        return None;
    }

    Some((hour.parse().ok()?, minute.parse().ok()?))
}

/// Parse a `HH:MM` start-of-slot time. Rejects `24:00`.
pub fn parse_clock_time(input: &str) -> Result<ClockTime, TimeGridError> {
    split_clock(input.trim())
        .and_then(|(hour, minute)| ClockTime::from_hm(hour, minute))
        .ok_or_else(|| TimeGridError::MalformedTime(input.to_string()))
}

/// Like [`parse_clock_time`] but also accepts `24:00` as end of day.
pub fn parse_range_end(input: &str) -> Result<ClockTime, TimeGridError> {
    match split_clock(input.trim()) {
        Some((24, 0)) => Ok(ClockTime::END_OF_DAY),
        _ => parse_clock_time(input),
    }
}

// ==============================================================================
// TIME RANGES
// ==============================================================================

/// A half-open `[start, end)` block of wall-clock time within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: ClockTime,
    end: ClockTime,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: ClockTime,
    end: ClockTime,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = TimeGridError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self, TimeGridError> {
        if start >= end {
            return Err(TimeGridError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, TimeGridError> {
        Self::new(parse_clock_time(start)?, parse_range_end(end)?)
    }

    pub fn start(&self) -> ClockTime {
        self.start
    }

    pub fn end(&self) -> ClockTime {
        self.end
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end.minutes() - self.start.minutes()
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        ranges_overlap(self.start, self.end, other.start, other.end)
    }

    /// Whether a block of `minutes` starting at `start` fits inside this range.
    pub fn fits(&self, start: ClockTime, minutes: u32) -> bool {
        match start.checked_add_minutes(minutes) {
            Some(end) => start >= self.start && end <= self.end,
            None => false,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Fails on the first pair of overlapping blocks, in start order.
pub fn ranges_are_disjoint(ranges: &[TimeRange]) -> Result<(), TimeGridError> {
    let mut sorted = ranges.to_vec();
    sorted.sort();

    for pair in sorted.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(TimeGridError::OverlappingRanges { first: pair[0], second: pair[1] });
        }
    }
    Ok(())
}

// ==============================================================================
// INSTANTS
// ==============================================================================

/// True iff `[a_start, a_end)` and `[b_start, b_end)` share any point.
pub fn ranges_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn add_minutes(instant: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    instant + Duration::minutes(minutes)
}

pub fn is_before(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a < b
}

pub fn same_day<Z: TimeZone>(a: &DateTime<Z>, b: &DateTime<Z>) -> bool {
    a.date_naive() == b.date_naive()
}

pub fn parse_timezone(name: &str) -> Result<Tz, TimeGridError> {
    name.parse::<Tz>().map_err(|_| TimeGridError::UnknownTimezone(name.to_string()))
}

/// Convert a wall-clock time on `date` in `tz` to a UTC instant.
///
/// Times falling into a DST gap do not exist and yield `None`; times repeated
/// by a DST fold resolve to the earlier instant.
pub fn local_instant(date: NaiveDate, clock: ClockTime, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::minutes(i64::from(clock.minutes())))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        parse_range_end(s).unwrap()
    }

    #[test]
    fn parses_valid_clock_times() {
        assert_eq!(parse_clock_time("09:30").unwrap().minutes(), 570);
        assert_eq!(parse_clock_time("0:05").unwrap().minutes(), 5);
        assert_eq!(parse_clock_time("23:59").unwrap().minutes(), 1439);
    }

    #[test]
    fn rejects_malformed_clock_times() {
        for bad in ["24:00", "12:60", "9", "9:5", "09-30", "aa:bb", "", "123:00", "-1:00"] {
            assert_eq!(
                parse_clock_time(bad),
                Err(TimeGridError::MalformedTime(bad.to_string())),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn end_of_day_only_valid_as_range_end() {
        assert_eq!(parse_range_end("24:00"), Ok(ClockTime::END_OF_DAY));
        assert!(TimeRange::parse("24:00", "24:00").is_err());
        assert_eq!(TimeRange::parse("22:00", "24:00").unwrap().duration_minutes(), 120);
    }

    #[test]
    fn weekday_mapping_is_canonical() {
        let monday = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        assert_eq!(weekday_of(monday), Weekday::Monday);
        assert_eq!(weekday_of(monday + Duration::days(6)), Weekday::Sunday);
        assert_eq!("Tuesday".parse::<Weekday>(), Ok(Weekday::Tuesday));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let morning = TimeRange::new(t("09:00"), t("10:00")).unwrap();
        let late_morning = TimeRange::new(t("10:00"), t("11:00")).unwrap();
        let straddling = TimeRange::new(t("09:30"), t("10:30")).unwrap();

        assert!(!morning.overlaps(&late_morning));
        assert!(morning.overlaps(&straddling));
        assert!(ranges_are_disjoint(&[late_morning, morning]).is_ok());
        assert_eq!(
            ranges_are_disjoint(&[straddling, morning]),
            Err(TimeGridError::OverlappingRanges { first: morning, second: straddling })
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert_eq!(
            TimeRange::parse("10:00", "09:00"),
            Err(TimeGridError::EmptyRange { start: t("10:00"), end: t("09:00") })
        );
    }

    #[test]
    fn fits_respects_range_end() {
        let block = TimeRange::parse("09:00", "10:00").unwrap();
        assert!(block.fits(t("09:00"), 50));
        assert!(!block.fits(t("09:30"), 50));
        assert!(block.fits(t("09:10"), 50));
        assert!(!block.fits(t("08:50"), 30));
    }

    #[test]
    fn local_instant_skips_dst_gap() {
        let tz = parse_timezone("Europe/Berlin").unwrap();
        let spring_forward = NaiveDate::from_ymd_opt(2030, 3, 31).unwrap();

        assert!(local_instant(spring_forward, t("02:30"), &tz).is_none());
        let nine = local_instant(spring_forward, t("09:00"), &tz).unwrap();
        assert_eq!(nine.to_rfc3339(), "2030-03-31T07:00:00+00:00");
    }

    #[test]
    fn is_before_is_strict() {
        let nine = Utc.with_ymd_and_hms(2030, 1, 8, 9, 0, 0).unwrap();
        let later = add_minutes(nine, 1);

        assert!(is_before(nine, later));
        assert!(!is_before(later, nine));
        assert!(!is_before(nine, nine));
    }

    #[test]
    fn same_day_compares_dates_in_the_given_zone() {
        let late_evening = Utc.with_ymd_and_hms(2030, 1, 8, 23, 30, 0).unwrap();
        let early_morning = Utc.with_ymd_and_hms(2030, 1, 9, 0, 30, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2030, 1, 8, 12, 0, 0).unwrap();

        assert!(same_day(&late_evening, &noon));
        assert!(!same_day(&late_evening, &early_morning));

        // 18:30 and 19:30 on the 8th in New York
        let tz = parse_timezone("America/New_York").unwrap();
        assert!(same_day(&late_evening.with_timezone(&tz), &early_morning.with_timezone(&tz)));
    }

    #[test]
    fn local_instant_at_the_end_of_the_calendar_is_none() {
        assert!(local_instant(NaiveDate::MAX, t("24:00"), &Tz::UTC).is_none());
    }

    #[test]
    fn serde_uses_clock_strings_and_validates_ranges() {
        let range: TimeRange = serde_json::from_str(r#"{"start":"14:00","end":"16:00"}"#).unwrap();
        assert_eq!(serde_json::to_string(&range).unwrap(), r#"{"start":"14:00","end":"16:00"}"#);
        assert!(serde_json::from_str::<TimeRange>(r#"{"start":"16:00","end":"14:00"}"#).is_err());
    }
}
