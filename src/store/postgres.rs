use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Attendee, Event, EventSummary, Host, Session};
use crate::store::{Store, StoreError};

const ATTENDEE_COLUMNS: &str = "id, event_id, whatsapp_number, name, family_member_names, \
     num_adults, num_children, comments, status, rsvp_date, last_modified";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-constraint violation on insert to the matching store
/// error, so racing duplicates surface as conflicts rather than 500s.
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.constraint() {
            Some("hosts_email_key") => return StoreError::DuplicateEmail,
            Some("unique_attendee_per_event") => return StoreError::DuplicateAttendee,
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn create_host(&self, host: &Host) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO hosts (id, email, name, whatsapp_number, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(host.id)
        .bind(&host.email)
        .bind(&host.name)
        .bind(&host.whatsapp_number)
        .bind(&host.password_hash)
        .bind(host.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(())
    }

    async fn host_by_email(&self, email: &str) -> Result<Option<Host>, StoreError> {
        let host = sqlx::query_as::<_, Host>("SELECT * FROM hosts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(host)
    }

    async fn host_by_id(&self, id: Uuid) -> Result<Option<Host>, StoreError> {
        let host = sqlx::query_as::<_, Host>("SELECT * FROM hosts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(host)
    }

    async fn delete_host(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM attendees WHERE event_id IN (SELECT id FROM events WHERE host_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM events WHERE host_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE host_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM hosts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (token, host_id, created_at) VALUES ($1, $2, $3)")
            .bind(&session.token)
            .bind(session.host_id)
            .bind(session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn session_host_id(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session.map(|s| s.host_id))
    }

    async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (id, host_id, slug, title, description, event_date, start_time, \
             end_time, address_cep, address_full, latitude, longitude, allow_modifications, \
             allow_cancellations, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(event.id)
        .bind(event.host_id)
        .bind(&event.slug)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.address_cep)
        .bind(&event.address_full)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.allow_modifications)
        .bind(event.allow_cancellations)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn event_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM events WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn events_for_host(&self, host_id: Uuid) -> Result<Vec<EventSummary>, StoreError> {
        let rows = sqlx::query_as::<_, EventSummary>(
            "SELECT e.id, e.slug, e.title, e.event_date, e.start_time, \
             COUNT(a.id) FILTER (WHERE a.status = 'confirmed') AS attendee_count, \
             COALESCE(SUM(a.num_adults) FILTER (WHERE a.status = 'confirmed'), 0) AS total_adults, \
             COALESCE(SUM(a.num_children) FILTER (WHERE a.status = 'confirmed'), 0) AS total_children \
             FROM events e \
             LEFT JOIN attendees a ON a.event_id = e.id \
             WHERE e.host_id = $1 \
             GROUP BY e.id \
             ORDER BY e.event_date DESC",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_event(&self, event: &Event) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE events SET title = $2, description = $3, event_date = $4, start_time = $5, \
             end_time = $6, address_cep = $7, address_full = $8, latitude = $9, longitude = $10, \
             allow_modifications = $11, allow_cancellations = $12 \
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.address_cep)
        .bind(&event.address_full)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.allow_modifications)
        .bind(event.allow_cancellations)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM attendees WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn create_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO attendees (id, event_id, whatsapp_number, name, family_member_names, \
             num_adults, num_children, comments, status, rsvp_date, last_modified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(attendee.id)
        .bind(attendee.event_id)
        .bind(&attendee.whatsapp_number)
        .bind(&attendee.name)
        .bind(&attendee.family_member_names)
        .bind(attendee.num_adults)
        .bind(attendee.num_children)
        .bind(&attendee.comments)
        .bind(attendee.status.as_str())
        .bind(attendee.rsvp_date)
        .bind(attendee.last_modified)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(())
    }

    async fn attendee_by_id(&self, id: Uuid) -> Result<Option<Attendee>, StoreError> {
        let attendee = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendee)
    }

    async fn attendee_by_contact(
        &self,
        event_id: Uuid,
        whatsapp_number: &str,
    ) -> Result<Option<Attendee>, StoreError> {
        let attendee = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees \
             WHERE event_id = $1 AND whatsapp_number = $2"
        ))
        .bind(event_id)
        .bind(whatsapp_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendee)
    }

    async fn attendees_for_event(&self, event_id: Uuid) -> Result<Vec<Attendee>, StoreError> {
        let attendees = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = $1 ORDER BY rsvp_date"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attendees)
    }

    async fn update_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE attendees SET whatsapp_number = $2, name = $3, family_member_names = $4, \
             num_adults = $5, num_children = $6, comments = $7, status = $8, \
             last_modified = now() \
             WHERE id = $1",
        )
        .bind(attendee.id)
        .bind(&attendee.whatsapp_number)
        .bind(&attendee.name)
        .bind(&attendee.family_member_names)
        .bind(attendee.num_adults)
        .bind(attendee.num_children)
        .bind(&attendee.comments)
        .bind(attendee.status.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_attendee(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM attendees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
