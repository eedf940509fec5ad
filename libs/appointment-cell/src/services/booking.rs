// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::models::{Modality, ProfessionalProfile};
use availability_cell::services::AvailabilityResolver;
use shared_config::AppConfig;
use shared_models::auth::{Actor, Role};
use shared_utils::time_grid::ClockTime;

use crate::models::{session_end, Appointment, AppointmentError, PaymentStatus, RequestAppointment, Transition};
use crate::services::conflict::first_conflict_excluding;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notification::{NotificationEvent, NotificationKind, NotificationSink};
use crate::services::store::{with_timeout, AppointmentStore, CommitOutcome, InsertOutcome};

/// Entry point for every appointment write. Validates the request, applies
/// the state machine and commits through the store's conditional writes.
pub struct BookingService {
    appointments: Arc<dyn AppointmentStore>,
    availability: Arc<AvailabilityResolver>,
    notifier: Arc<dyn NotificationSink>,
    lifecycle: AppointmentLifecycleService,
    default_session_minutes: u32,
    enforce_availability: bool,
    storage_timeout: Duration,
}

impl BookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        availability: Arc<AvailabilityResolver>,
        notifier: Arc<dyn NotificationSink>,
        config: &AppConfig,
    ) -> Self {
        Self {
            appointments,
            availability,
            notifier,
            lifecycle: AppointmentLifecycleService::new(config.reschedule_accept_policy),
            default_session_minutes: config.default_session_minutes,
            enforce_availability: config.enforce_availability,
            storage_timeout: config.storage_timeout(),
        }
    }

    pub async fn request_appointment(
        &self,
        actor: &Actor,
        request: RequestAppointment,
    ) -> Result<Appointment, AppointmentError> {
        if actor.role != Role::Client || actor.user_id != request.client_id {
            return Err(AppointmentError::Unauthorized(
                "appointments are requested by the client themselves".to_string(),
            ));
        }
        if request.client_id == request.professional_id {
            return Err(AppointmentError::ValidationError(
                "client and professional must differ".to_string(),
            ));
        }

        let now = Utc::now();
        if request.start_time <= now {
            return Err(AppointmentError::ValidationError(
                "start_time must be in the future".to_string(),
            ));
        }

        let profile = self.availability.get_professional(request.professional_id).await?;
        let duration = profile.session_minutes(self.default_session_minutes);
        session_end(request.start_time, duration)?;

        if self.enforce_availability {
            self.ensure_within_availability(&profile, request.modality, request.start_time, duration)
                .await?;
        }

        let appointment = Appointment::requested(
            request.client_id,
            request.professional_id,
            request.start_time,
            duration,
            request.modality,
            now,
        );

        let outcome = with_timeout(
            self.storage_timeout,
            "insert_appointment_if_free",
            self.appointments.insert_appointment_if_free(&appointment),
        )
        .await?;

        match outcome {
            InsertOutcome::Inserted => {
                info!(
                    "Appointment {} requested with professional {} at {}",
                    appointment.id, appointment.professional_id, appointment.start_time
                );
                self.notify(NotificationKind::AppointmentRequested, &appointment, actor, now).await;
                Ok(appointment)
            }
            InsertOutcome::Conflict { conflicting_id } => {
                warn!(
                    "Slot {} for professional {} is taken",
                    appointment.start_time, appointment.professional_id
                );
                Err(AppointmentError::SlotConflict { conflicting_id })
            }
        }
    }

    pub async fn transition(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        transition: Transition,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;
        let now = Utc::now();
        let next = self.lifecycle.apply(&current, actor, &transition, now)?;

        if let Transition::ProposeReschedule { new_start } = &transition {
            self.ensure_reschedule_target_free(&current, *new_start).await?;
        }

        self.commit(&current, &next, &transition).await?;

        info!("Appointment {} is now {} after {}", next.id, next.status, transition.action());
        self.notify(NotificationKind::for_transition(&transition), &next, actor, now).await;
        Ok(next)
    }

    /// Participants and admins only.
    pub async fn get_appointment(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;

        if appointment.is_participant(actor.user_id) || actor.is_admin() {
            Ok(appointment)
        } else {
            Err(AppointmentError::Unauthorized(
                "only participants may view this appointment".to_string(),
            ))
        }
    }

    pub async fn record_payment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;
        let next = self.lifecycle.record_payment(&current, actor, payment_status, Utc::now())?;

        match self.commit_outcome(&current, &next).await? {
            CommitOutcome::Committed => {
                info!("Payment for appointment {} recorded as {}", next.id, payment_status);
                Ok(next)
            }
            CommitOutcome::Stale { current: Some(_) } | CommitOutcome::Conflict { .. } => {
                Err(AppointmentError::PreconditionFailed(
                    "appointment changed while recording payment, retry with fresh data".to_string(),
                ))
            }
            CommitOutcome::Stale { current: None } => Err(AppointmentError::NotFound(appointment_id)),
        }
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        with_timeout(
            self.storage_timeout,
            "get_appointment",
            self.appointments.get_appointment(appointment_id),
        )
        .await?
        .ok_or(AppointmentError::NotFound(appointment_id))
    }

    async fn commit_outcome(&self, current: &Appointment, next: &Appointment) -> Result<CommitOutcome, AppointmentError> {
        with_timeout(
            self.storage_timeout,
            "update_appointment_if_status",
            self.appointments.update_appointment_if_status(current, next),
        )
        .await
    }

    async fn commit(
        &self,
        current: &Appointment,
        next: &Appointment,
        transition: &Transition,
    ) -> Result<(), AppointmentError> {
        match self.commit_outcome(current, next).await? {
            CommitOutcome::Committed => Ok(()),
            CommitOutcome::Conflict { conflicting_id } => {
                warn!("Appointment {} cannot move to {}: slot taken", next.id, next.start_time);
                Err(AppointmentError::SlotConflict { conflicting_id })
            }
            CommitOutcome::Stale { current: Some(status) } => {
                warn!("Appointment {} changed concurrently, now {}", next.id, status);
                Err(AppointmentError::InvalidTransition {
                    status,
                    action: transition.action(),
                })
            }
            CommitOutcome::Stale { current: None } => Err(AppointmentError::NotFound(next.id)),
        }
    }

    async fn ensure_reschedule_target_free(
        &self,
        appointment: &Appointment,
        new_start: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if self.enforce_availability {
            let profile = self.availability.get_professional(appointment.professional_id).await?;
            self.ensure_within_availability(&profile, appointment.modality, new_start, appointment.duration_minutes)
                .await?;
        }

        let new_end = session_end(new_start, appointment.duration_minutes)?;
        let nearby = with_timeout(
            self.storage_timeout,
            "find_non_terminal_appointments",
            self.appointments
                .find_non_terminal_appointments(appointment.professional_id, new_start, new_end),
        )
        .await?;

        match first_conflict_excluding(new_start, appointment.duration_minutes, &nearby, Some(appointment.id)) {
            Some(existing) => Err(AppointmentError::SlotConflict {
                conflicting_id: Some(existing.id),
            }),
            None => Ok(()),
        }
    }

    /// `[start, start + duration)` must lie inside one open interval of the
    /// professional's local date.
    async fn ensure_within_availability(
        &self,
        profile: &ProfessionalProfile,
        modality: Modality,
        start: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Result<(), AppointmentError> {
        let tz = profile.tz()?;
        let local = start.with_timezone(&tz);
        if local.second() != 0 || local.nanosecond() != 0 {
            return Err(AppointmentError::ValidationError(
                "start_time must fall on a whole minute".to_string(),
            ));
        }

        let clock = ClockTime::from_hm(local.hour(), local.minute()).ok_or_else(|| {
            AppointmentError::ValidationError("start_time is not a valid wall-clock time".to_string())
        })?;
        let intervals = self
            .availability
            .open_intervals_for(profile.id, modality, local.date_naive())
            .await?;

        if intervals.iter().any(|range| range.fits(clock, duration_minutes)) {
            Ok(())
        } else {
            debug!("{} on {} is outside availability of {}", clock, local.date_naive(), profile.id);
            Err(AppointmentError::ValidationError(
                "requested time is outside the professional's availability".to_string(),
            ))
        }
    }

    async fn notify(&self, kind: NotificationKind, appointment: &Appointment, actor: &Actor, now: DateTime<Utc>) {
        let event = NotificationEvent::new(kind, appointment, actor.user_id, now);

        if let Err(e) = self.notifier.publish(&event).await {
            warn!("Failed to publish {:?} for appointment {}: {}", kind, appointment.id, e);
        }
    }
}
