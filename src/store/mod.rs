//! Persistence layer behind a trait object, so handlers stay ignorant of
//! the backing store and tests can run without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Attendee, Event, EventSummary, Host, Session};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("attendee already registered for event")]
    DuplicateAttendee,

    #[error("row not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    // Hosts
    async fn create_host(&self, host: &Host) -> Result<(), StoreError>;
    async fn host_by_email(&self, email: &str) -> Result<Option<Host>, StoreError>;
    async fn host_by_id(&self, id: Uuid) -> Result<Option<Host>, StoreError>;
    /// Removes the host and everything it owns: attendees, events,
    /// sessions, then the host row, in one transaction.
    async fn delete_host(&self, id: Uuid) -> Result<(), StoreError>;

    // Sessions
    async fn create_session(&self, session: &Session) -> Result<(), StoreError>;
    async fn session_host_id(&self, token: &str) -> Result<Option<Uuid>, StoreError>;
    async fn delete_session(&self, token: &str) -> Result<(), StoreError>;

    // Events
    async fn create_event(&self, event: &Event) -> Result<(), StoreError>;
    async fn event_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError>;
    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError>;
    /// Dashboard listing for one host, newest event date first, with
    /// aggregates over confirmed attendees only.
    async fn events_for_host(&self, host_id: Uuid) -> Result<Vec<EventSummary>, StoreError>;
    async fn update_event(&self, event: &Event) -> Result<(), StoreError>;
    /// Deletes the event's attendees and then the event, atomically.
    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError>;

    // Attendees
    async fn create_attendee(&self, attendee: &Attendee) -> Result<(), StoreError>;
    async fn attendee_by_id(&self, id: Uuid) -> Result<Option<Attendee>, StoreError>;
    async fn attendee_by_contact(
        &self,
        event_id: Uuid,
        whatsapp_number: &str,
    ) -> Result<Option<Attendee>, StoreError>;
    async fn attendees_for_event(&self, event_id: Uuid) -> Result<Vec<Attendee>, StoreError>;
    /// Writes all mutable fields and refreshes `last_modified`.
    async fn update_attendee(&self, attendee: &Attendee) -> Result<(), StoreError>;
    async fn delete_attendee(&self, id: Uuid) -> Result<(), StoreError>;
}
