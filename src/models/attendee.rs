use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Confirmed,
    Cancelled,
}

impl RsvpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RsvpStatus::Confirmed => "confirmed",
            RsvpStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(RsvpStatus::Confirmed),
            "cancelled" => Ok(RsvpStatus::Cancelled),
            other => Err(format!("unknown rsvp status: {other}")),
        }
    }
}

/// A guest's RSVP record for one event. At most one row exists per
/// (event, whatsapp_number); cancelling flips `status`, never deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub id: Uuid,
    pub event_id: Uuid,
    pub whatsapp_number: String,
    pub name: String,
    pub family_member_names: Option<Vec<String>>,
    pub num_adults: i32,
    pub num_children: i32,
    pub comments: Option<String>,
    pub status: RsvpStatus,
    pub rsvp_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

// The status column is plain TEXT, so the row is decoded by hand.
impl<'r> FromRow<'r, PgRow> for Attendee {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse()
            .map_err(|e: String| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: e.into(),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            whatsapp_number: row.try_get("whatsapp_number")?,
            name: row.try_get("name")?,
            family_member_names: row.try_get("family_member_names")?,
            num_adults: row.try_get("num_adults")?,
            num_children: row.try_get("num_children")?,
            comments: row.try_get("comments")?,
            status,
            rsvp_date: row.try_get("rsvp_date")?,
            last_modified: row.try_get("last_modified")?,
        })
    }
}
