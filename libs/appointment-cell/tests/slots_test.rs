mod common;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};

use appointment_cell::models::{AppointmentError, RequestAppointment, SlotQuery, Transition};
use availability_cell::models::{AvailabilityException, ExceptionKind, Modality};
use shared_utils::test_utils::{future_monday, TestUser};
use shared_utils::time_grid::{TimeRange, Weekday};

use common::{at, client, Fixture};

fn query(fixture: &Fixture) -> SlotQuery {
    SlotQuery {
        professional_id: fixture.professional.user_id,
        modality: Modality::Remote,
        week_start: Some(future_monday()),
    }
}

fn times(response: &appointment_cell::models::SlotsResponse, weekday: Weekday) -> Vec<String> {
    response.slots_by_day[&weekday].iter().map(|slot| slot.time.to_string()).collect()
}

#[tokio::test]
async fn tuesday_booking_scenario() {
    let fixture = Fixture::new().await;
    fixture.open(&[(Weekday::Tuesday, "09:00", "11:00")]).await;
    let tuesday = future_monday() + Duration::days(1);

    let before = fixture.slots.compute_slots(query(&fixture)).await.unwrap();
    assert_eq!(times(&before, Weekday::Tuesday), vec!["09:00", "09:30", "10:00"]);
    assert_eq!(before.session_duration, 50);
    assert_eq!(before.session_price, 75.0);

    let first = client();
    let booked = fixture
        .booking
        .request_appointment(
            &first,
            RequestAppointment {
                client_id: first.user_id,
                professional_id: fixture.professional.user_id,
                start_time: at(tuesday, "09:00"),
                modality: Modality::Remote,
            },
        )
        .await
        .unwrap();

    let second = client();
    let clash = fixture
        .booking
        .request_appointment(
            &second,
            RequestAppointment {
                client_id: second.user_id,
                professional_id: fixture.professional.user_id,
                start_time: at(tuesday, "09:00"),
                modality: Modality::Remote,
            },
        )
        .await;
    assert_matches!(clash, Err(AppointmentError::SlotConflict { .. }));

    fixture
        .booking
        .transition(&fixture.professional, booked.id, Transition::Confirm)
        .await
        .unwrap();

    let after = fixture.slots.compute_slots(query(&fixture)).await.unwrap();
    assert_eq!(times(&after, Weekday::Tuesday), vec!["10:00"]);
    assert_eq!(after.slots_by_day[&Weekday::Tuesday][0].iso_timestamp, at(tuesday, "10:00"));
}

#[tokio::test]
async fn boundary_exactness() {
    let fixture = Fixture::new().await;
    fixture.open(&[(Weekday::Thursday, "09:00", "10:00")]).await;

    let response = fixture.slots.compute_slots(query(&fixture)).await.unwrap();
    assert_eq!(times(&response, Weekday::Thursday), vec!["09:00"]);
}

#[tokio::test]
async fn exception_ranges_take_precedence() {
    let fixture = Fixture::new().await;
    fixture.open(&[(Weekday::Monday, "09:00", "12:00")]).await;

    fixture
        .resolver
        .put_exception(
            &fixture.professional,
            AvailabilityException {
                professional_id: fixture.professional.user_id,
                modality: Modality::Remote,
                date: future_monday(),
                kind: ExceptionKind::Ranges { ranges: vec![TimeRange::parse("14:00", "16:00").unwrap()] },
                reason: None,
            },
        )
        .await
        .unwrap();

    let response = fixture.slots.compute_slots(query(&fixture)).await.unwrap();
    assert_eq!(times(&response, Weekday::Monday), vec!["14:00", "14:30", "15:00"]);

    // The following Monday still follows the weekly pattern
    let next_week = SlotQuery {
        week_start: Some(future_monday() + Duration::days(7)),
        ..query(&fixture)
    };
    let response = fixture.slots.compute_slots(next_week).await.unwrap();
    assert_eq!(times(&response, Weekday::Monday), vec!["09:00", "09:30", "10:00", "10:30", "11:00"]);
}

#[tokio::test]
async fn listing_is_idempotent() {
    let fixture = Fixture::new().await;
    fixture
        .open(&[(Weekday::Monday, "08:00", "12:00"), (Weekday::Friday, "13:00", "18:00")])
        .await;

    let first = fixture.slots.compute_slots(query(&fixture)).await.unwrap();
    let second = fixture.slots.compute_slots(query(&fixture)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.slots_by_day.len(), 7);
    assert!(first.slots_by_day[&Weekday::Sunday].is_empty());
}

#[tokio::test]
async fn no_availability_means_no_slots() {
    let fixture = Fixture::new().await;

    let response = fixture.slots.compute_slots(query(&fixture)).await.unwrap();
    assert!(response.slots_by_day.values().all(Vec::is_empty));
}

#[tokio::test]
async fn week_start_is_required() {
    let fixture = Fixture::new().await;
    let missing = SlotQuery { week_start: None, ..query(&fixture) };

    assert_matches!(
        fixture.slots.compute_slots(missing).await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn unknown_professional_is_not_found() {
    let fixture = Fixture::new().await;
    let unknown = SlotQuery {
        professional_id: TestUser::professional().user_id,
        ..query(&fixture)
    };

    assert_matches!(
        fixture.slots.compute_slots(unknown).await,
        Err(AppointmentError::ProfessionalNotFound(_))
    );
}

#[tokio::test]
async fn weeks_past_the_calendar_end_are_rejected() {
    let fixture = Fixture::new().await;
    fixture.open(&[(Weekday::Tuesday, "09:00", "11:00")]).await;

    for week_start in [NaiveDate::MAX, NaiveDate::MIN] {
        let edge = SlotQuery { week_start: Some(week_start), ..query(&fixture) };
        assert_matches!(
            fixture.slots.compute_slots(edge).await,
            Err(AppointmentError::ValidationError(_))
        );
    }
}
