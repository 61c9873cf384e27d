use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ResolverKind;
use crate::handlers::auth::CurrentHost;
use crate::models::{Event, EventSummary};
use crate::services::AddressInput;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::csv::attendees_to_csv;
use crate::utils::error::AppError;
use crate::utils::ids;
use crate::utils::response::{created, csv_attachment, empty_success, success};

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Invalid date: {s}")))
}

fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| AppError::ValidationError(format!("Invalid time: {s}")))
}

async fn unique_slug(store: &dyn Store) -> Result<String, AppError> {
    loop {
        let slug = ids::new_slug();
        if !store.slug_exists(&slug).await? {
            return Ok(slug);
        }
    }
}

/// Loads an event and checks the acting host owns it. Unknown events are
/// 404; known events owned by someone else are 403.
async fn owned_event(state: &AppState, event_id: Uuid, host_id: Uuid) -> Result<Event, AppError> {
    let event = state
        .store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if event.host_id != host_id {
        return Err(AppError::Forbidden(
            "You do not own this event".to_string(),
        ));
    }
    Ok(event)
}

fn invite_url(slug: &str) -> String {
    format!("/invite/{slug}")
}

#[derive(Serialize)]
struct EventRef {
    id: Uuid,
    slug: String,
    invite_url: String,
}

impl EventRef {
    fn from_event(event: &Event) -> Self {
        Self {
            id: event.id,
            slug: event.slug.clone(),
            invite_url: invite_url(&event.slug),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub address_cep: Option<String>,
    pub address_full: Option<String>,
    pub allow_modifications: Option<bool>,
    pub allow_cancellations: Option<bool>,
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Json(req): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    let (Some(title), Some(event_date), Some(start_time)) =
        (req.title, req.event_date, req.start_time)
    else {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    };
    if req.address_full.is_none() && req.address_cep.is_none() {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    }

    let event_date = parse_date(&event_date)?;
    let start_time = parse_time(&start_time)?;
    let end_time = req.end_time.as_deref().map(parse_time).transpose()?;

    // Best-effort enrichment; under the CEP policy a missing address is
    // the one hard failure, since there is nothing else to store.
    let input = AddressInput {
        address_full: req.address_full.clone(),
        cep: req.address_cep.clone(),
    };
    let resolved = state.resolver.resolve(&input).await;
    let address_full = match req.address_full.or(resolved.address_full) {
        Some(address) => address,
        None => {
            return Err(AppError::ValidationError(
                "Could not resolve an address from the given CEP".to_string(),
            ))
        }
    };

    let event = Event {
        id: Uuid::new_v4(),
        host_id: host.id,
        slug: unique_slug(state.store.as_ref()).await?,
        title,
        description: req.description,
        event_date,
        start_time,
        end_time,
        address_cep: req.address_cep,
        address_full,
        latitude: resolved.latitude,
        longitude: resolved.longitude,
        allow_modifications: req.allow_modifications.unwrap_or(true),
        allow_cancellations: req.allow_cancellations.unwrap_or(true),
        created_at: Utc::now(),
    };
    state.store.create_event(&event).await?;

    Ok(created(EventRef::from_event(&event), "Event created successfully").into_response())
}

#[derive(Serialize)]
struct EventListItem {
    id: Uuid,
    slug: String,
    title: String,
    event_date: String,
    start_time: String,
    attendee_count: i64,
    total_adults: i64,
    total_children: i64,
}

impl From<EventSummary> for EventListItem {
    fn from(s: EventSummary) -> Self {
        Self {
            id: s.id,
            slug: s.slug,
            title: s.title,
            event_date: s.event_date.to_string(),
            start_time: s.start_time.format("%H:%M").to_string(),
            attendee_count: s.attendee_count,
            total_adults: s.total_adults,
            total_children: s.total_children,
        }
    }
}

pub async fn list_my_events(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
) -> Result<Response, AppError> {
    let events: Vec<EventListItem> = state
        .store
        .events_for_host(host.id)
        .await?
        .into_iter()
        .map(EventListItem::from)
        .collect();
    Ok(success(events, "Events fetched").into_response())
}

#[derive(Serialize)]
struct HostContact {
    name: String,
    whatsapp_number: String,
}

#[derive(Serialize)]
struct PublicEvent {
    id: Uuid,
    slug: String,
    title: String,
    description: Option<String>,
    event_date: String,
    start_time: String,
    end_time: Option<String>,
    address_full: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    allow_modifications: bool,
    allow_cancellations: bool,
    host: HostContact,
}

/// Public invite view; no authentication, and nothing about the host
/// beyond display name and contact number.
pub async fn get_event_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .event_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let host = state
        .store
        .host_by_id(event.host_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let payload = PublicEvent {
        id: event.id,
        slug: event.slug.clone(),
        title: event.title.clone(),
        description: event.description.clone(),
        event_date: event.event_date.to_string(),
        start_time: event.start_time.format("%H:%M").to_string(),
        end_time: event.end_time.map(|t| t.format("%H:%M").to_string()),
        address_full: event.address_full.clone(),
        latitude: event.latitude,
        longitude: event.longitude,
        allow_modifications: event.allow_modifications,
        allow_cancellations: event.allow_cancellations,
        host: HostContact {
            name: host.name,
            whatsapp_number: host.whatsapp_number,
        },
    };
    Ok(success(payload, "Event fetched").into_response())
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub address_cep: Option<String>,
    pub address_full: Option<String>,
    pub allow_modifications: Option<bool>,
    pub allow_cancellations: Option<bool>,
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Path(event_id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Response, AppError> {
    let mut event = owned_event(&state, event_id, host.id).await?;

    // Only fields present in the request are applied
    if let Some(title) = req.title {
        event.title = title;
    }
    if let Some(description) = req.description {
        event.description = Some(description);
    }
    if let Some(date) = req.event_date.as_deref() {
        event.event_date = parse_date(date)?;
    }
    if let Some(time) = req.start_time.as_deref() {
        event.start_time = parse_time(time)?;
    }
    if let Some(time) = req.end_time.as_deref() {
        event.end_time = Some(parse_time(time)?);
    }
    if let Some(flag) = req.allow_modifications {
        event.allow_modifications = flag;
    }
    if let Some(flag) = req.allow_cancellations {
        event.allow_cancellations = flag;
    }

    if let Some(address_full) = req.address_full {
        // A changed address re-runs enrichment; stale coordinates are
        // worse than none.
        let changed = address_full != event.address_full;
        event.address_full = address_full;
        if changed {
            let resolved = state
                .resolver
                .resolve(&AddressInput {
                    address_full: Some(event.address_full.clone()),
                    cep: event.address_cep.clone(),
                })
                .await;
            event.latitude = resolved.latitude;
            event.longitude = resolved.longitude;
        }
        if let Some(cep) = req.address_cep {
            event.address_cep = Some(cep);
        }
    } else if let Some(cep) = req.address_cep {
        let changed = event.address_cep.as_deref() != Some(cep.as_str());
        event.address_cep = Some(cep.clone());
        if changed && state.config.resolver == ResolverKind::Cep {
            let resolved = state
                .resolver
                .resolve(&AddressInput {
                    address_full: None,
                    cep: Some(cep),
                })
                .await;
            event.address_full = resolved.address_full.ok_or_else(|| {
                AppError::ValidationError(
                    "Could not resolve an address from the given CEP".to_string(),
                )
            })?;
        }
    }

    state.store.update_event(&event).await?;
    Ok(empty_success("Event updated successfully").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = owned_event(&state, event_id, host.id).await?;
    // Attendees go first, then the event, in one transaction
    state.store.delete_event(event.id).await?;
    Ok(empty_success("Event deleted successfully").into_response())
}

pub async fn duplicate_event(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let source = owned_event(&state, event_id, host.id).await?;

    let copy = Event {
        id: Uuid::new_v4(),
        slug: unique_slug(state.store.as_ref()).await?,
        title: format!("{} (copy)", source.title),
        created_at: Utc::now(),
        ..source
    };
    state.store.create_event(&copy).await?;

    Ok(created(EventRef::from_event(&copy), "Event duplicated successfully").into_response())
}

pub async fn list_attendees(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = owned_event(&state, event_id, host.id).await?;
    let attendees = state.store.attendees_for_event(event.id).await?;
    Ok(success(attendees, "Attendees fetched").into_response())
}

pub async fn export_attendees_csv(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = owned_event(&state, event_id, host.id).await?;
    let attendees = state.store.attendees_for_event(event.id).await?;

    let filename = format!("event_{}_attendees.csv", event.id);
    Ok(csv_attachment(&filename, attendees_to_csv(&attendees)))
}

#[derive(Deserialize)]
pub struct UpdateAttendeeRequest {
    pub name: Option<String>,
    pub family_member_names: Option<Vec<String>>,
    pub num_adults: Option<i32>,
    pub num_children: Option<i32>,
    pub comments: Option<String>,
}

/// Host-side attendee edit; unlike guest self-service this ignores the
/// event's policy flags.
pub async fn update_attendee(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Path((event_id, attendee_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateAttendeeRequest>,
) -> Result<Response, AppError> {
    let event = owned_event(&state, event_id, host.id).await?;

    let mut attendee = state
        .store
        .attendee_by_id(attendee_id)
        .await?
        .filter(|a| a.event_id == event.id)
        .ok_or_else(|| AppError::NotFound("Attendee not found".to_string()))?;

    if let Some(name) = req.name {
        attendee.name = name;
    }
    if let Some(family) = req.family_member_names {
        attendee.family_member_names = Some(family);
    }
    if let Some(adults) = req.num_adults {
        attendee.num_adults = adults;
    }
    if let Some(children) = req.num_children {
        attendee.num_children = children;
    }
    if let Some(comments) = req.comments {
        attendee.comments = Some(comments);
    }

    state.store.update_attendee(&attendee).await?;
    Ok(empty_success("Attendee updated successfully").into_response())
}

pub async fn delete_attendee(
    State(state): State<AppState>,
    CurrentHost(host): CurrentHost,
    Path((event_id, attendee_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    let event = owned_event(&state, event_id, host.id).await?;

    let attendee = state
        .store
        .attendee_by_id(attendee_id)
        .await?
        .filter(|a| a.event_id == event.id)
        .ok_or_else(|| AppError::NotFound("Attendee not found".to_string()))?;

    state.store.delete_attendee(attendee.id).await?;
    Ok(empty_success("Attendee deleted successfully").into_response())
}
