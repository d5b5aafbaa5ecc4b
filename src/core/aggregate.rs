// PRISM - core/aggregate.rs
//
// Per-recipient delivery classification and incident statistics.
//
// Classification is a left fold over entries in input order: the outcome
// of a recipient after each entry depends on the outcome before it, so the
// order of rows matters (a later VIEWED always wins, an earlier BOUNCED is
// never replaced by QUARANTINED or DELIVERED).

use crate::core::model::{DeliveryOutcome, EventStatus, LogEntry};
use crate::util::constants;
use crate::util::error::{AddressError, ReportError};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

// =============================================================================
// Reducer
// =============================================================================

/// Outcome of a recipient after observing one more event.
///
/// - Viewed replaces anything.
/// - Bounced applies only to an unclassified recipient.
/// - Quarantined applies unless the recipient is Viewed or Bounced.
/// - Delivered applies only to an unclassified recipient.
/// - Any other status leaves the outcome unchanged.
pub fn next_outcome(current: DeliveryOutcome, status: &EventStatus) -> DeliveryOutcome {
    use DeliveryOutcome as O;
    match status {
        EventStatus::Viewed => O::Viewed,
        EventStatus::Bounced if current == O::Unclassified => O::Bounced,
        EventStatus::Quarantined if !matches!(current, O::Viewed | O::Bounced) => O::Quarantined,
        EventStatus::Delivered if current == O::Unclassified => O::Delivered,
        _ => current,
    }
}

/// Insertion-ordered map from recipient to its current outcome.
#[derive(Debug, Clone, Default)]
pub struct RecipientOutcomes {
    order: Vec<(String, DeliveryOutcome)>,
    index: HashMap<String, usize>,
}

impl RecipientOutcomes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `status` to `recipient`, inserting it as Unclassified first if
    /// it has not been seen. Returns true if the recipient was new.
    pub fn observe(&mut self, recipient: &str, status: &EventStatus) -> bool {
        let (slot, is_new) = match self.index.get(recipient) {
            Some(&idx) => (idx, false),
            None => {
                let idx = self.order.len();
                self.order.push((recipient.to_string(), DeliveryOutcome::Unclassified));
                self.index.insert(recipient.to_string(), idx);
                (idx, true)
            }
        };
        let outcome = &mut self.order[slot].1;
        *outcome = next_outcome(*outcome, status);
        is_new
    }

    pub fn get(&self, recipient: &str) -> Option<DeliveryOutcome> {
        self.index.get(recipient).map(|&idx| self.order[idx].1)
    }

    /// Recipients in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DeliveryOutcome)> {
        self.order.iter().map(|(r, o)| (r.as_str(), *o))
    }

    pub fn count(&self, outcome: DeliveryOutcome) -> usize {
        self.order.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// =============================================================================
// Domains
// =============================================================================

/// Domain part of an address: the text after the first `@`.
pub fn domain_of(address: &str) -> Result<&str, AddressError> {
    address
        .split_once('@')
        .map(|(_, domain)| domain)
        .ok_or_else(|| AddressError::MissingAt {
            address: address.to_string(),
        })
}

/// The set of domains managed by the operator. Membership is exact string
/// comparison.
#[derive(Debug, Clone, Default)]
pub struct OwnedDomains {
    domains: HashSet<String>,
}

impl OwnedDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// True when the address's domain is not one of ours.
    pub fn is_external(&self, address: &str) -> Result<bool, AddressError> {
        Ok(!self.contains(domain_of(address)?))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Aggregate view of one incident, recomputed from scratch by `summarize`.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentSummary {
    pub viewed: usize,
    pub bounced: usize,
    pub quarantined: usize,
    pub delivered: usize,
    pub unclassified: usize,

    /// Distinct recipients, whatever their outcome.
    pub total_recipients: usize,

    /// Distinct recipients whose domain is not owned.
    pub external_recipients: usize,

    /// Earliest start date over all entries; `None` when there were none.
    pub start_time: Option<DateTime<FixedOffset>>,

    pub senders: BTreeSet<String>,

    /// Final outcome per recipient, in first-seen order.
    pub outcomes: Vec<(String, DeliveryOutcome)>,
}

/// Classify every recipient and compute incident statistics in one pass.
///
/// Fails on the first recipient with no `@`, since it cannot be judged
/// internal or external.
pub fn summarize(
    entries: &[LogEntry],
    owned: &OwnedDomains,
) -> Result<IncidentSummary, AddressError> {
    let mut outcomes = RecipientOutcomes::new();
    let mut senders = BTreeSet::new();
    let mut start_time: Option<DateTime<FixedOffset>> = None;
    let mut external_recipients = 0;

    for entry in entries {
        senders.insert(entry.sender.clone());

        if start_time.map_or(true, |earliest| entry.start_date < earliest) {
            start_time = Some(entry.start_date);
        }

        if outcomes.get(&entry.recipient).is_none() && owned.is_external(&entry.recipient)? {
            external_recipients += 1;
        }

        outcomes.observe(&entry.recipient, &entry.event_status);
    }

    let summary = IncidentSummary {
        viewed: outcomes.count(DeliveryOutcome::Viewed),
        bounced: outcomes.count(DeliveryOutcome::Bounced),
        quarantined: outcomes.count(DeliveryOutcome::Quarantined),
        delivered: outcomes.count(DeliveryOutcome::Delivered),
        unclassified: outcomes.count(DeliveryOutcome::Unclassified),
        total_recipients: outcomes.len(),
        external_recipients,
        start_time,
        senders,
        outcomes: outcomes.iter().map(|(r, o)| (r.to_string(), o)).collect(),
    };

    tracing::debug!(
        entries = entries.len(),
        recipients = summary.total_recipients,
        external = summary.external_recipients,
        viewed = summary.viewed,
        bounced = summary.bounced,
        quarantined = summary.quarantined,
        delivered = summary.delivered,
        "Incident summarised"
    );

    Ok(summary)
}

impl IncidentSummary {
    /// Count for one outcome bucket.
    pub fn count(&self, outcome: DeliveryOutcome) -> usize {
        match outcome {
            DeliveryOutcome::Viewed => self.viewed,
            DeliveryOutcome::Bounced => self.bounced,
            DeliveryOutcome::Quarantined => self.quarantined,
            DeliveryOutcome::Delivered => self.delivered,
            DeliveryOutcome::Unclassified => self.unclassified,
        }
    }

    pub fn internal_recipients(&self) -> usize {
        self.total_recipients - self.external_recipients
    }

    /// `MM/DD/YYYY <suffix>`, dated by the incident start.
    pub fn title(&self, suffix: &str) -> Result<String, ReportError> {
        let start = self.start_time.ok_or(ReportError::NoTimestamp)?;
        Ok(format!("{} {suffix}", start.format("%m/%d/%Y")))
    }

    /// One-paragraph narrative of the incident.
    ///
    /// An empty summary has no start time and is rejected rather than
    /// rendered with a placeholder.
    pub fn summary_text(&self) -> Result<String, ReportError> {
        let start = self.start_time.ok_or(ReportError::NoTimestamp)?;
        let formatted_start = start.format("%I:%M %p");

        let sender_text = match self.senders.len() {
            1 => self
                .senders
                .iter()
                .next()
                .map(String::as_str)
                .unwrap_or(constants::MULTIPLE_SENDERS_TEXT),
            _ => constants::MULTIPLE_SENDERS_TEXT,
        };

        let intro = if self.external_recipients > 0 {
            format!(
                "At {formatted_start}, an email from {sender_text} was identified as a phishing attempt. \
                 It was sent to a total of {} recipients, including {} within our managed domains \
                 and {} external organizations.",
                self.total_recipients,
                self.internal_recipients(),
                self.external_recipients,
            )
        } else {
            format!(
                "At {formatted_start}, an email from {sender_text} was identified as a phishing attempt. \
                 It was sent to {} recipients within our managed domains.",
                self.total_recipients,
            )
        };

        let viewed = if self.viewed > 0 {
            format!("Of these, {} emails were viewed by the recipients.", self.viewed)
        } else {
            "Fortunately, none of the recipients within our managed domains opened the email."
                .to_string()
        };

        Ok(format!("{intro} {viewed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_timestamp;
    use std::path::PathBuf;

    fn entry(recipient: &str, status: EventStatus, start: &str) -> LogEntry {
        LogEntry {
            message_id: "<phish@evil.test>".to_string(),
            sender: "attacker@evil.test".to_string(),
            recipient: recipient.to_string(),
            start_date: parse_timestamp(start).unwrap(),
            end_date: parse_timestamp(start).unwrap(),
            start_zone: "UTC".to_string(),
            end_zone: "UTC".to_string(),
            message_size: 0,
            attachments: 0,
            encrypted: false,
            event_status: status,
            subject: None,
            direction: None,
            event_target: None,
            event_date: None,
            event_target_ip: None,
            smtp_reply_code: None,
            event_description: None,
            client_type: None,
            device_session_id: None,
            source_file: PathBuf::from("test.csv"),
            line_number: 0,
        }
    }

    fn fold(statuses: &[EventStatus]) -> DeliveryOutcome {
        statuses
            .iter()
            .fold(DeliveryOutcome::Unclassified, next_outcome)
    }

    fn owned() -> OwnedDomains {
        OwnedDomains::new(["owned.com"])
    }

    const T0: &str = "2024/03/05 09:15:00 UTC";

    // -------------------------------------------------------------------------
    // Reducer
    // -------------------------------------------------------------------------

    #[test]
    fn test_viewed_wins_after_everything() {
        use EventStatus::*;
        assert_eq!(fold(&[Delivered, Quarantined, Bounced, Viewed]), DeliveryOutcome::Viewed);
        assert_eq!(fold(&[Delivered, Bounced, Viewed, Delivered]), DeliveryOutcome::Viewed);
    }

    #[test]
    fn test_quarantined_overrides_delivered() {
        use EventStatus::*;
        assert_eq!(fold(&[Delivered, Quarantined]), DeliveryOutcome::Quarantined);
    }

    #[test]
    fn test_bounced_is_sticky_against_quarantined() {
        use EventStatus::*;
        assert_eq!(fold(&[Bounced, Quarantined]), DeliveryOutcome::Bounced);
        assert_eq!(fold(&[Bounced, Delivered]), DeliveryOutcome::Bounced);
    }

    #[test]
    fn test_bounced_does_not_replace_existing_outcome() {
        use EventStatus::*;
        assert_eq!(fold(&[Delivered, Bounced]), DeliveryOutcome::Delivered);
        assert_eq!(fold(&[Quarantined, Bounced]), DeliveryOutcome::Quarantined);
    }

    #[test]
    fn test_unknown_statuses_leave_outcome_alone() {
        assert_eq!(
            fold(&[EventStatus::MarkedSpam, EventStatus::Other("SENT".into())]),
            DeliveryOutcome::Unclassified
        );
        assert_eq!(
            fold(&[EventStatus::Delivered, EventStatus::MarkedSpam]),
            DeliveryOutcome::Delivered
        );
    }

    #[test]
    fn test_recipient_outcomes_keep_first_seen_order() {
        let mut map = RecipientOutcomes::new();
        assert!(map.observe("b@owned.com", &EventStatus::Delivered));
        assert!(map.observe("a@owned.com", &EventStatus::Bounced));
        assert!(!map.observe("b@owned.com", &EventStatus::Viewed));

        let order: Vec<_> = map.iter().collect();
        assert_eq!(
            order,
            vec![
                ("b@owned.com", DeliveryOutcome::Viewed),
                ("a@owned.com", DeliveryOutcome::Bounced),
            ]
        );
    }

    // -------------------------------------------------------------------------
    // Domains
    // -------------------------------------------------------------------------

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("a@owned.com").unwrap(), "owned.com");
        assert_eq!(domain_of("a@b@c").unwrap(), "b@c");
        assert_eq!(
            domain_of("noatsign"),
            Err(AddressError::MissingAt {
                address: "noatsign".to_string()
            })
        );
    }

    #[test]
    fn test_owned_domains_exact_match() {
        let owned = owned();
        assert!(!owned.is_external("x@owned.com").unwrap());
        assert!(owned.is_external("x@sub.owned.com").unwrap());
        assert!(owned.is_external("x@OWNED.COM").unwrap());
    }

    // -------------------------------------------------------------------------
    // Summaries
    // -------------------------------------------------------------------------

    #[test]
    fn test_summarize_scenario() {
        let entries = vec![
            entry("a@external.com", EventStatus::Delivered, T0),
            entry("a@external.com", EventStatus::Viewed, T0),
            entry("b@owned.com", EventStatus::Bounced, T0),
        ];
        let s = summarize(&entries, &owned()).unwrap();

        assert_eq!(s.viewed, 1);
        assert_eq!(s.bounced, 1);
        assert_eq!(s.quarantined, 0);
        assert_eq!(s.delivered, 0);
        assert_eq!(s.total_recipients, 2);
        assert_eq!(s.external_recipients, 1);
        assert_eq!(s.internal_recipients(), 1);
        assert_eq!(
            s.senders.iter().collect::<Vec<_>>(),
            vec!["attacker@evil.test"]
        );
    }

    #[test]
    fn test_external_counted_once_per_recipient() {
        let entries = vec![
            entry("x@other.org", EventStatus::Delivered, T0),
            entry("x@other.org", EventStatus::Delivered, T0),
            entry("x@other.org", EventStatus::Viewed, T0),
            entry("y@other.org", EventStatus::Delivered, T0),
        ];
        let s = summarize(&entries, &owned()).unwrap();
        assert_eq!(s.external_recipients, 2);
        assert_eq!(s.total_recipients, 2);
    }

    #[test]
    fn test_unclassified_counts_toward_total_only() {
        let entries = vec![
            entry("a@owned.com", EventStatus::MarkedSpam, T0),
            entry("b@owned.com", EventStatus::Delivered, T0),
        ];
        let s = summarize(&entries, &owned()).unwrap();
        assert_eq!(s.total_recipients, 2);
        assert_eq!(s.unclassified, 1);
        assert_eq!(s.delivered, 1);
        assert_eq!(s.viewed + s.bounced + s.quarantined + s.delivered, 1);
    }

    #[test]
    fn test_start_time_is_earliest_instant() {
        let entries = vec![
            entry("a@owned.com", EventStatus::Delivered, "2024/03/05 10:00:00 UTC"),
            // 08:30 PST is 16:30 UTC, later than 10:00 UTC.
            entry("b@owned.com", EventStatus::Delivered, "2024/03/05 08:30:00 PST"),
            entry("c@owned.com", EventStatus::Delivered, "2024/03/05 09:59:59 UTC"),
        ];
        let s = summarize(&entries, &owned()).unwrap();
        assert_eq!(
            s.start_time.unwrap().to_rfc3339(),
            "2024-03-05T09:59:59+00:00"
        );
    }

    #[test]
    fn test_empty_input_summary() {
        let s = summarize(&[], &owned()).unwrap();
        assert_eq!(s.total_recipients, 0);
        assert_eq!(s.external_recipients, 0);
        assert_eq!(s.viewed + s.bounced + s.quarantined + s.delivered, 0);
        assert!(s.senders.is_empty());
        assert!(s.start_time.is_none());
        assert!(matches!(s.summary_text(), Err(ReportError::NoTimestamp)));
        assert!(matches!(s.title("Phishing Incident"), Err(ReportError::NoTimestamp)));
    }

    #[test]
    fn test_recipient_without_at_is_rejected() {
        let entries = vec![
            entry("a@owned.com", EventStatus::Delivered, T0),
            entry("noatsign", EventStatus::Delivered, T0),
        ];
        let err = summarize(&entries, &owned()).unwrap_err();
        assert_eq!(
            err,
            AddressError::MissingAt {
                address: "noatsign".to_string()
            }
        );
    }

    // -------------------------------------------------------------------------
    // Narrative
    // -------------------------------------------------------------------------

    #[test]
    fn test_summary_text_with_external_and_views() {
        let entries = vec![
            entry("a@external.com", EventStatus::Viewed, "2024/03/05 14:05:00 UTC"),
            entry("b@owned.com", EventStatus::Bounced, "2024/03/05 14:10:00 UTC"),
        ];
        let s = summarize(&entries, &owned()).unwrap();
        let text = s.summary_text().unwrap();
        assert!(text.starts_with("At 02:05 PM, an email from attacker@evil.test"));
        assert!(text.contains(
            "a total of 2 recipients, including 1 within our managed domains and 1 external"
        ));
        assert!(text.ends_with("Of these, 1 emails were viewed by the recipients."));
        assert_eq!(s.title("Phishing Incident").unwrap(), "03/05/2024 Phishing Incident");
    }

    #[test]
    fn test_summary_text_internal_only_multiple_senders() {
        let mut second = entry("b@owned.com", EventStatus::Delivered, T0);
        second.sender = "other@evil.test".to_string();
        let entries = vec![entry("a@owned.com", EventStatus::Delivered, T0), second];

        let text = summarize(&entries, &owned()).unwrap().summary_text().unwrap();
        assert!(text.contains("an email from multiple users"));
        assert!(text.contains("It was sent to 2 recipients within our managed domains."));
        assert!(
            text.ends_with("none of the recipients within our managed domains opened the email.")
        );
    }
}
