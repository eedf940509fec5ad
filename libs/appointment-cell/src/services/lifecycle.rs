// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use shared_config::RescheduleAcceptPolicy;
use shared_models::auth::Actor;

use crate::models::{
    session_end, Appointment, AppointmentAction, AppointmentError, AppointmentStatus, Feedback, HistoryEntry,
    PaymentStatus, RescheduleProposal, Transition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Client,
    Professional,
}

/// Pure appointment state machine. Produces the next version of an
/// appointment or the reason the transition is not allowed; persistence and
/// conflict checks against other bookings happen in the booking service.
#[derive(Debug, Clone, Copy)]
pub struct AppointmentLifecycleService {
    accept_policy: RescheduleAcceptPolicy,
}

impl AppointmentLifecycleService {
    pub fn new(accept_policy: RescheduleAcceptPolicy) -> Self {
        Self { accept_policy }
    }

    pub fn apply(
        &self,
        appointment: &Appointment,
        actor: &Actor,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let action = transition.action();
        debug!("Applying {} to appointment {} ({})", action, appointment.id, appointment.status);

        let party = party_of(appointment, actor)?;
        let mut next = appointment.clone();
        let mut note = None;

        match transition {
            Transition::Confirm => {
                require_status(appointment, action, &[AppointmentStatus::Requested])?;
                require_party(party, Party::Professional, action)?;
                next.status = AppointmentStatus::Confirmed;
            }
            Transition::Reject => {
                require_status(appointment, action, &[AppointmentStatus::Requested])?;
                require_party(party, Party::Professional, action)?;
                next.status = AppointmentStatus::Rejected;
            }
            Transition::ProposeReschedule { new_start } => {
                require_status(
                    appointment,
                    action,
                    &[AppointmentStatus::Requested, AppointmentStatus::Confirmed],
                )?;
                if *new_start <= now {
                    return Err(AppointmentError::ValidationError(
                        "new_start must be in the future".to_string(),
                    ));
                }
                session_end(*new_start, appointment.duration_minutes)?;
                if *new_start == appointment.start_time {
                    return Err(AppointmentError::ValidationError(
                        "new_start matches the current start".to_string(),
                    ));
                }
                next.status = AppointmentStatus::RescheduleRequested;
                next.reschedule = Some(RescheduleProposal {
                    proposed_by: actor.user_id,
                    proposed_start: *new_start,
                    previous_status: appointment.status,
                    proposed_at: now,
                });
                note = Some(format!("proposed {}", new_start.to_rfc3339()));
            }
            Transition::Accept | Transition::Decline => {
                require_status(appointment, action, &[AppointmentStatus::RescheduleRequested])?;
                let proposal = appointment.reschedule.as_ref().ok_or_else(|| {
                    AppointmentError::PreconditionFailed("no reschedule proposal is pending".to_string())
                })?;
                if proposal.proposed_by == actor.user_id {
                    return Err(AppointmentError::Unauthorized(
                        "a reschedule must be resolved by the other party".to_string(),
                    ));
                }

                if *transition == Transition::Accept {
                    next.start_time = proposal.proposed_start;
                    next.status = match self.accept_policy {
                        RescheduleAcceptPolicy::Confirmed => AppointmentStatus::Confirmed,
                        RescheduleAcceptPolicy::Requested => AppointmentStatus::Requested,
                    };
                } else {
                    next.status = proposal.previous_status;
                }
                next.reschedule = None;
            }
            Transition::Cancel { reason } => {
                if appointment.status.is_terminal() {
                    return Err(invalid(appointment, action));
                }
                next.status = AppointmentStatus::Cancelled;
                next.reschedule = None;
                note = reason.clone();
            }
            Transition::Finalize => {
                require_status(appointment, action, &[AppointmentStatus::Confirmed])?;
                require_party(party, Party::Professional, action)?;
                if appointment.payment_status != PaymentStatus::Paid {
                    return Err(AppointmentError::PreconditionFailed(
                        "appointment has not been paid".to_string(),
                    ));
                }
                if now < appointment.end_time() {
                    return Err(AppointmentError::PreconditionFailed(
                        "session has not ended yet".to_string(),
                    ));
                }
                next.status = AppointmentStatus::Finalized;
            }
            Transition::AddFeedback { rating, comment } => {
                require_status(appointment, action, &[AppointmentStatus::Finalized])?;
                require_party(party, Party::Client, action)?;
                if appointment.feedback.is_some() {
                    return Err(AppointmentError::PreconditionFailed(
                        "feedback was already submitted".to_string(),
                    ));
                }
                if !(1..=5).contains(rating) {
                    return Err(AppointmentError::ValidationError(
                        "rating must be between 1 and 5".to_string(),
                    ));
                }
                next.feedback = Some(Feedback {
                    rating: *rating,
                    comment: comment.clone(),
                    submitted_at: now,
                });
            }
        }

        record(&mut next, action, actor, now, note);
        Ok(next)
    }

    /// Payment callback from the billing collaborator. Admin only.
    pub fn record_payment(
        &self,
        appointment: &Appointment,
        actor: &Actor,
        payment_status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if !actor.is_admin() {
            return Err(AppointmentError::Unauthorized(
                "only the billing service may record payments".to_string(),
            ));
        }
        if payment_status == PaymentStatus::Refunded && appointment.payment_status != PaymentStatus::Paid {
            return Err(AppointmentError::PreconditionFailed(
                "only a paid appointment can be refunded".to_string(),
            ));
        }

        let mut next = appointment.clone();
        next.payment_status = payment_status;
        record(&mut next, AppointmentAction::PaymentRecorded, actor, now, Some(payment_status.to_string()));
        Ok(next)
    }
}

fn party_of(appointment: &Appointment, actor: &Actor) -> Result<Party, AppointmentError> {
    if actor.user_id == appointment.professional_id {
        Ok(Party::Professional)
    } else if actor.user_id == appointment.client_id {
        Ok(Party::Client)
    } else {
        warn!("User {} is not a participant of appointment {}", actor.user_id, appointment.id);
        Err(AppointmentError::Unauthorized(
            "only the client or the professional may act on this appointment".to_string(),
        ))
    }
}

fn require_status(
    appointment: &Appointment,
    action: AppointmentAction,
    allowed: &[AppointmentStatus],
) -> Result<(), AppointmentError> {
    if allowed.contains(&appointment.status) {
        Ok(())
    } else {
        Err(invalid(appointment, action))
    }
}

fn require_party(party: Party, required: Party, action: AppointmentAction) -> Result<(), AppointmentError> {
    if party == required {
        return Ok(());
    }

    let side = match required {
        Party::Client => "client",
        Party::Professional => "professional",
    };
    Err(AppointmentError::Unauthorized(format!("only the {} may {}", side, action)))
}

fn invalid(appointment: &Appointment, action: AppointmentAction) -> AppointmentError {
    warn!("Rejected {} on appointment {} in status {}", action, appointment.id, appointment.status);
    AppointmentError::InvalidTransition {
        status: appointment.status,
        action,
    }
}

fn record(
    appointment: &mut Appointment,
    action: AppointmentAction,
    actor: &Actor,
    now: DateTime<Utc>,
    note: Option<String>,
) {
    appointment.history.push(HistoryEntry {
        action,
        actor_id: actor.user_id,
        at: now,
        note,
    });
    appointment.updated_at = now;
}
