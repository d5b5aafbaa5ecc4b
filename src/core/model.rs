// PRISM - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;

// =============================================================================
// Log Entry (normalised output of parsing)
// =============================================================================

/// One delivery event row from an email log search export.
///
/// Created once per parsed row and never mutated afterwards. The pair
/// (`message_id`, `recipient`) is the deduplication key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// RFC 822 message ID, trimmed. Never empty.
    pub message_id: String,

    /// Envelope sender address.
    pub sender: String,

    /// Recipient mailbox; expected to contain a domain after `@`.
    pub recipient: String,

    /// Start of the delivery event, with the export's zone offset.
    pub start_date: DateTime<FixedOffset>,

    /// End of the delivery event, with the export's zone offset.
    pub end_date: DateTime<FixedOffset>,

    /// Zone abbreviations as written in the export ("UTC", "EST", ...).
    /// Offsets alone are ambiguous (EST and CDT are both -05:00).
    pub start_zone: String,
    pub end_zone: String,

    /// Message size in bytes (0 when the column is absent or empty).
    pub message_size: u64,

    /// Number of attachments (0 when the column is absent or empty).
    pub attachments: u32,

    /// True when the "Has encryption" column reads "Encrypted".
    pub encrypted: bool,

    /// Delivery event status.
    pub event_status: EventStatus,

    /// Message subject, if the export carried one.
    pub subject: Option<String>,

    pub direction: Option<String>,
    pub event_target: Option<String>,
    pub event_date: Option<String>,
    pub event_target_ip: Option<String>,
    pub smtp_reply_code: Option<String>,
    pub event_description: Option<String>,
    pub client_type: Option<String>,
    pub device_session_id: Option<String>,

    /// Export file this row came from.
    pub source_file: PathBuf,

    /// CSV line number of the row within `source_file`.
    pub line_number: u64,
}

impl LogEntry {
    /// True when the message carried at least one attachment.
    pub fn has_attachments(&self) -> bool {
        self.attachments >= 1
    }

    /// True when the message was delivered encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// True when the subject exists and `pattern` matches anywhere in it.
    pub fn subject_matches(&self, pattern: &Regex) -> bool {
        self.subject
            .as_deref()
            .is_some_and(|subject| pattern.is_match(subject))
    }

    /// The deduplication key for this entry.
    pub fn dedup_key(&self) -> (&str, &str) {
        (self.message_id.as_str(), self.recipient.as_str())
    }
}

// =============================================================================
// Event status
// =============================================================================

/// Status of a single delivery event as written by the export.
///
/// Known values are matched exactly (the export mixes upper-case and
/// title-case spellings); everything else is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EventStatus {
    Delivered,
    Viewed,
    Bounced,
    Quarantined,
    MarkedSpam,
    Other(String),
}

impl EventStatus {
    /// Map a raw "Event status" cell to a status.
    pub fn from_export(raw: &str) -> Self {
        match raw {
            "DELIVERED" => Self::Delivered,
            "VIEWED" => Self::Viewed,
            "BOUNCED" => Self::Bounced,
            "Quarantined" => Self::Quarantined,
            "Marked spam" => Self::MarkedSpam,
            other => Self::Other(other.to_string()),
        }
    }

    /// The export's spelling of this status.
    pub fn as_export_str(&self) -> &str {
        match self {
            Self::Delivered => "DELIVERED",
            Self::Viewed => "VIEWED",
            Self::Bounced => "BOUNCED",
            Self::Quarantined => "Quarantined",
            Self::MarkedSpam => "Marked spam",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_export_str())
    }
}

// =============================================================================
// Delivery outcome
// =============================================================================

/// Final classification of one recipient across all of its log rows.
///
/// Listed in precedence order, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
pub enum DeliveryOutcome {
    Viewed,
    Bounced,
    Quarantined,
    Delivered,
    #[default]
    Unclassified,
}

impl DeliveryOutcome {
    /// The four reportable outcomes in chart order.
    pub fn reportable() -> &'static [DeliveryOutcome] {
        &[
            DeliveryOutcome::Viewed,
            DeliveryOutcome::Bounced,
            DeliveryOutcome::Quarantined,
            DeliveryOutcome::Delivered,
        ]
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Viewed => "Viewed",
            DeliveryOutcome::Bounced => "Bounced",
            DeliveryOutcome::Quarantined => "Quarantined",
            DeliveryOutcome::Delivered => "Delivered",
            DeliveryOutcome::Unclassified => "Unclassified",
        }
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_status_known_spellings() {
        assert_eq!(EventStatus::from_export("DELIVERED"), EventStatus::Delivered);
        assert_eq!(EventStatus::from_export("VIEWED"), EventStatus::Viewed);
        assert_eq!(EventStatus::from_export("BOUNCED"), EventStatus::Bounced);
        assert_eq!(EventStatus::from_export("Quarantined"), EventStatus::Quarantined);
        assert_eq!(EventStatus::from_export("Marked spam"), EventStatus::MarkedSpam);
    }

    #[test]
    fn test_event_status_is_case_sensitive() {
        assert_eq!(
            EventStatus::from_export("delivered"),
            EventStatus::Other("delivered".to_string())
        );
        assert_eq!(EventStatus::from_export(""), EventStatus::Other(String::new()));
    }

    #[test]
    fn test_event_status_display_round_trips_export_text() {
        assert_eq!(EventStatus::MarkedSpam.to_string(), "Marked spam");
        assert_eq!(EventStatus::Other("SENT".into()).to_string(), "SENT");
    }

    #[test]
    fn test_outcome_order_is_precedence_order() {
        assert!(DeliveryOutcome::Viewed < DeliveryOutcome::Bounced);
        assert!(DeliveryOutcome::Bounced < DeliveryOutcome::Quarantined);
        assert!(DeliveryOutcome::Quarantined < DeliveryOutcome::Delivered);
        assert!(DeliveryOutcome::Delivered < DeliveryOutcome::Unclassified);
        assert_eq!(DeliveryOutcome::default(), DeliveryOutcome::Unclassified);
    }
}
