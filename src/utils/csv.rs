//! Attendee-list CSV serialization.
//!
//! Fixed column order: Name, WhatsApp, Adults, Children, Family Members,
//! Comments, Status, RSVP Date.

use crate::models::Attendee;

const HEADER: [&str; 8] = [
    "Name",
    "WhatsApp",
    "Adults",
    "Children",
    "Family Members",
    "Comments",
    "Status",
    "RSVP Date",
];

pub fn attendees_to_csv(attendees: &[Attendee]) -> String {
    let mut out = String::new();
    write_row(&mut out, HEADER.iter().map(|s| s.to_string()));

    for a in attendees {
        let family = a
            .family_member_names
            .as_deref()
            .map(|names| names.join(", "))
            .unwrap_or_default();
        write_row(
            &mut out,
            [
                a.name.clone(),
                a.whatsapp_number.clone(),
                a.num_adults.to_string(),
                a.num_children.to_string(),
                family,
                a.comments.clone().unwrap_or_default(),
                a.status.to_string(),
                a.rsvp_date.format("%Y-%m-%d %H:%M").to_string(),
            ]
            .into_iter(),
        );
    }

    out
}

fn write_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape(&field));
    }
    out.push_str("\r\n");
}

/// RFC 4180 quoting: fields containing commas, quotes or line breaks are
/// wrapped in double quotes, with inner quotes doubled.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        let mut quoted = String::with_capacity(field.len() + 2);
        quoted.push('"');
        for c in field.chars() {
            if c == '"' {
                quoted.push('"');
            }
            quoted.push(c);
        }
        quoted.push('"');
        quoted
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RsvpStatus;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn attendee(name: &str, comments: Option<&str>) -> Attendee {
        Attendee {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            whatsapp_number: "5521999990000".to_string(),
            name: name.to_string(),
            family_member_names: Some(vec!["Ana".to_string(), "Luiz".to_string()]),
            num_adults: 2,
            num_children: 1,
            comments: comments.map(|c| c.to_string()),
            status: RsvpStatus::Confirmed,
            rsvp_date: Utc.with_ymd_and_hms(2025, 12, 1, 18, 30, 0).unwrap(),
            last_modified: Utc.with_ymd_and_hms(2025, 12, 1, 18, 30, 0).unwrap(),
        }
    }

    #[test]
    fn header_row_has_fixed_column_order() {
        let csv = attendees_to_csv(&[]);
        assert_eq!(
            csv,
            "Name,WhatsApp,Adults,Children,Family Members,Comments,Status,RSVP Date\r\n"
        );
    }

    #[test]
    fn serializes_one_row_per_attendee() {
        let csv = attendees_to_csv(&[attendee("Bob", None)]);
        let mut lines = csv.lines();
        lines.next();
        assert_eq!(
            lines.next().unwrap(),
            "Bob,5521999990000,2,1,\"Ana, Luiz\",,confirmed,2025-12-01 18:30"
        );
    }

    #[test]
    fn escapes_quotes_and_commas() {
        let csv = attendees_to_csv(&[attendee("Bob \"Bobby\" Silva", Some("late, maybe"))]);
        assert!(csv.contains("\"Bob \"\"Bobby\"\" Silva\""));
        assert!(csv.contains("\"late, maybe\""));
    }
}
