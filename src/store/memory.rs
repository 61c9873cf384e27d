use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{Attendee, Event, EventSummary, Host, RsvpStatus, Session};
use crate::store::{Store, StoreError};

/// Mutex'd in-memory store. Backs the test suite and DATABASE_URL-less
/// development runs; all data is lost on shutdown.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    hosts: HashMap<Uuid, Host>,
    sessions: HashMap<String, Session>,
    events: HashMap<Uuid, Event>,
    attendees: HashMap<Uuid, Attendee>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-write; propagating the panic
        // is the only honest option here.
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_host(&self, host: &Host) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.hosts.values().any(|h| h.email == host.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.hosts.insert(host.id, host.clone());
        Ok(())
    }

    async fn host_by_email(&self, email: &str) -> Result<Option<Host>, StoreError> {
        let inner = self.lock();
        Ok(inner.hosts.values().find(|h| h.email == email).cloned())
    }

    async fn host_by_id(&self, id: Uuid) -> Result<Option<Host>, StoreError> {
        Ok(self.lock().hosts.get(&id).cloned())
    }

    async fn delete_host(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.hosts.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        let event_ids: Vec<Uuid> = inner
            .events
            .values()
            .filter(|e| e.host_id == id)
            .map(|e| e.id)
            .collect();
        inner
            .attendees
            .retain(|_, a| !event_ids.contains(&a.event_id));
        inner.events.retain(|_, e| e.host_id != id);
        inner.sessions.retain(|_, s| s.host_id != id);
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        self.lock()
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn session_host_id(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        Ok(self.lock().sessions.get(token).map(|s| s.host_id))
    }

    async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        self.lock().sessions.remove(token);
        Ok(())
    }

    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        self.lock().events.insert(event.id, event.clone());
        Ok(())
    }

    async fn event_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let inner = self.lock();
        Ok(inner.events.values().find(|e| e.slug == slug).cloned())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.lock().events.values().any(|e| e.slug == slug))
    }

    async fn events_for_host(&self, host_id: Uuid) -> Result<Vec<EventSummary>, StoreError> {
        let inner = self.lock();
        let mut summaries: Vec<EventSummary> = inner
            .events
            .values()
            .filter(|e| e.host_id == host_id)
            .map(|e| {
                let confirmed: Vec<&Attendee> = inner
                    .attendees
                    .values()
                    .filter(|a| a.event_id == e.id && a.status == RsvpStatus::Confirmed)
                    .collect();
                EventSummary {
                    id: e.id,
                    slug: e.slug.clone(),
                    title: e.title.clone(),
                    event_date: e.event_date,
                    start_time: e.start_time,
                    attendee_count: confirmed.len() as i64,
                    total_adults: confirmed.iter().map(|a| i64::from(a.num_adults)).sum(),
                    total_children: confirmed.iter().map(|a| i64::from(a.num_children)).sum(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(summaries)
    }

    async fn update_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.events.get_mut(&event.id) {
            Some(existing) => {
                *existing = event.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.events.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        inner.attendees.retain(|_, a| a.event_id != id);
        Ok(())
    }

    async fn create_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let duplicate = inner.attendees.values().any(|a| {
            a.event_id == attendee.event_id && a.whatsapp_number == attendee.whatsapp_number
        });
        if duplicate {
            return Err(StoreError::DuplicateAttendee);
        }
        inner.attendees.insert(attendee.id, attendee.clone());
        Ok(())
    }

    async fn attendee_by_id(&self, id: Uuid) -> Result<Option<Attendee>, StoreError> {
        Ok(self.lock().attendees.get(&id).cloned())
    }

    async fn attendee_by_contact(
        &self,
        event_id: Uuid,
        whatsapp_number: &str,
    ) -> Result<Option<Attendee>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .attendees
            .values()
            .find(|a| a.event_id == event_id && a.whatsapp_number == whatsapp_number)
            .cloned())
    }

    async fn attendees_for_event(&self, event_id: Uuid) -> Result<Vec<Attendee>, StoreError> {
        let inner = self.lock();
        let mut attendees: Vec<Attendee> = inner
            .attendees
            .values()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        attendees.sort_by_key(|a| a.rsvp_date);
        Ok(attendees)
    }

    async fn update_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.attendees.get_mut(&attendee.id) {
            Some(existing) => {
                *existing = attendee.clone();
                existing.last_modified = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_attendee(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.attendees.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
