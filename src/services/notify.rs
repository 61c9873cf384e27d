//! Host notifications for RSVP activity.
//!
//! The production implementation is a structured-logging stand-in for the
//! email provider; callers treat every notifier as best-effort and keep
//! going when it fails.

use async_trait::async_trait;

use crate::models::{Attendee, Event, Host};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpChange {
    Created,
    Modified,
    Cancelled,
}

impl RsvpChange {
    fn subject(self, event_title: &str) -> String {
        match self {
            RsvpChange::Created => format!("New RSVP for {event_title}"),
            RsvpChange::Modified => format!("RSVP modified - {event_title}"),
            RsvpChange::Cancelled => format!("RSVP cancelled - {event_title}"),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        change: RsvpChange,
        event: &Event,
        host: &Host,
        attendee: &Attendee,
        reason: Option<&str>,
    ) -> anyhow::Result<()>;
}

/// Logs the notification the system would email to the host.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        change: RsvpChange,
        event: &Event,
        host: &Host,
        attendee: &Attendee,
        reason: Option<&str>,
    ) -> anyhow::Result<()> {
        tracing::info!(
            target: "notifications",
            to = %host.email,
            subject = %change.subject(&event.title),
            guest = %attendee.name,
            contact = %attendee.whatsapp_number,
            adults = attendee.num_adults,
            children = attendee.num_children,
            comments = attendee.comments.as_deref().unwrap_or(""),
            reason = reason.unwrap_or(""),
            "rsvp notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_lines_name_the_event() {
        assert_eq!(
            RsvpChange::Created.subject("Birthday"),
            "New RSVP for Birthday"
        );
        assert_eq!(
            RsvpChange::Cancelled.subject("Birthday"),
            "RSVP cancelled - Birthday"
        );
    }
}
