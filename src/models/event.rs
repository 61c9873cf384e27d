use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub host_id: Uuid,
    /// Short public identifier used in shareable invite links.
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub address_cep: Option<String>,
    pub address_full: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub allow_modifications: bool,
    pub allow_cancellations: bool,
    pub created_at: DateTime<Utc>,
}

/// One row of the host dashboard listing. The aggregates cover confirmed
/// attendees only; cancelled RSVPs never count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub attendee_count: i64,
    pub total_adults: i64,
    pub total_children: i64,
}
