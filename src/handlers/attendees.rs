use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::{Attendee, Event, RsvpStatus};
use crate::services::RsvpChange;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

async fn event_by_slug(state: &AppState, slug: &str) -> Result<Event, AppError> {
    state
        .store
        .event_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

async fn attendee_by_contact(
    state: &AppState,
    event: &Event,
    whatsapp_number: &str,
) -> Result<Attendee, AppError> {
    state
        .store
        .attendee_by_contact(event.id, whatsapp_number)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendee not found".to_string()))
}

/// The notification channel is a side channel; whatever goes wrong there
/// is logged and swallowed.
async fn notify_best_effort(
    state: &AppState,
    change: RsvpChange,
    event: &Event,
    attendee: &Attendee,
    reason: Option<&str>,
) {
    let host = match state.store.host_by_id(event.host_id).await {
        Ok(Some(host)) => host,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "could not load host for notification");
            return;
        }
    };
    if let Err(e) = state
        .notifier
        .notify(change, event, &host, attendee, reason)
        .await
    {
        warn!(error = %e, "rsvp notification failed");
    }
}

#[derive(Deserialize)]
pub struct RsvpRequest {
    pub event_slug: Option<String>,
    pub whatsapp_number: Option<String>,
    pub name: Option<String>,
    pub num_adults: Option<i32>,
    pub num_children: Option<i32>,
    pub family_member_names: Option<Vec<String>>,
    pub comments: Option<String>,
}

#[derive(Serialize)]
struct RsvpRef {
    attendee_id: Uuid,
}

pub async fn create_rsvp(
    State(state): State<AppState>,
    Json(req): Json<RsvpRequest>,
) -> Result<Response, AppError> {
    let (Some(event_slug), Some(whatsapp_number), Some(name), Some(num_adults)) =
        (req.event_slug, req.whatsapp_number, req.name, req.num_adults)
    else {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    };

    let event = event_by_slug(&state, &event_slug).await?;

    // Pre-check for a friendly error; the unique constraint still decides
    // the race between concurrent identical submissions.
    if state
        .store
        .attendee_by_contact(event.id, &whatsapp_number)
        .await?
        .is_some()
    {
        return Err(AppError::AlreadyRsvpd);
    }

    let now = Utc::now();
    let attendee = Attendee {
        id: Uuid::new_v4(),
        event_id: event.id,
        whatsapp_number,
        name,
        family_member_names: req.family_member_names,
        num_adults,
        num_children: req.num_children.unwrap_or(0),
        comments: req.comments,
        status: RsvpStatus::Confirmed,
        rsvp_date: now,
        last_modified: now,
    };
    state.store.create_attendee(&attendee).await?;

    notify_best_effort(&state, RsvpChange::Created, &event, &attendee, None).await;

    Ok(created(RsvpRef { attendee_id: attendee.id }, "RSVP successful").into_response())
}

#[derive(Deserialize)]
pub struct FindQuery {
    pub event_slug: String,
    pub whatsapp_number: String,
}

/// Guest lookup of their own RSVP, used to prefill the self-service form.
pub async fn find_attendee(
    State(state): State<AppState>,
    Query(query): Query<FindQuery>,
) -> Result<Response, AppError> {
    let event = event_by_slug(&state, &query.event_slug).await?;
    let attendee = attendee_by_contact(&state, &event, &query.whatsapp_number).await?;
    Ok(success(attendee, "Attendee fetched").into_response())
}

#[derive(Deserialize)]
pub struct ModifyRequest {
    pub event_slug: Option<String>,
    pub whatsapp_number: Option<String>,
    pub name: Option<String>,
    pub num_adults: Option<i32>,
    pub num_children: Option<i32>,
    pub family_member_names: Option<Vec<String>>,
    pub comments: Option<String>,
}

pub async fn modify_rsvp(
    State(state): State<AppState>,
    Json(req): Json<ModifyRequest>,
) -> Result<Response, AppError> {
    let (Some(event_slug), Some(whatsapp_number)) = (req.event_slug, req.whatsapp_number) else {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    };

    let event = event_by_slug(&state, &event_slug).await?;
    if !event.allow_modifications {
        return Err(AppError::Forbidden(
            "This event does not allow RSVP modifications".to_string(),
        ));
    }

    let mut attendee = attendee_by_contact(&state, &event, &whatsapp_number).await?;

    if let Some(name) = req.name {
        attendee.name = name;
    }
    if let Some(adults) = req.num_adults {
        attendee.num_adults = adults;
    }
    if let Some(children) = req.num_children {
        attendee.num_children = children;
    }
    if let Some(family) = req.family_member_names {
        attendee.family_member_names = Some(family);
    }
    if let Some(comments) = req.comments {
        attendee.comments = Some(comments);
    }
    // Editing a cancelled RSVP brings it back; guests expect a touched
    // record to count again.
    attendee.status = RsvpStatus::Confirmed;

    state.store.update_attendee(&attendee).await?;

    notify_best_effort(&state, RsvpChange::Modified, &event, &attendee, None).await;

    Ok(success(attendee, "RSVP updated successfully").into_response())
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub event_slug: Option<String>,
    pub whatsapp_number: Option<String>,
    pub reason: Option<String>,
}

pub async fn cancel_rsvp(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> Result<Response, AppError> {
    let (Some(event_slug), Some(whatsapp_number)) = (req.event_slug, req.whatsapp_number) else {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    };

    let event = event_by_slug(&state, &event_slug).await?;
    if !event.allow_cancellations {
        return Err(AppError::Forbidden(
            "This event does not allow RSVP cancellations".to_string(),
        ));
    }

    let mut attendee = attendee_by_contact(&state, &event, &whatsapp_number).await?;

    // The row stays; it keeps the uniqueness slot and the history
    attendee.status = RsvpStatus::Cancelled;
    state.store.update_attendee(&attendee).await?;

    notify_best_effort(
        &state,
        RsvpChange::Cancelled,
        &event,
        &attendee,
        req.reason.as_deref(),
    )
    .await;

    Ok(success(attendee, "RSVP cancelled").into_response())
}
