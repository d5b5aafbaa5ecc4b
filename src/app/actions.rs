// PRISM - app/actions.rs
//
// Mailbox remediation actions driven by parsed log entries.
//
// A `MailActionProvider` performs one call per (message, mailbox). The
// runner treats each entry independently: a failure is logged and the
// run continues with the next entry.

use crate::core::model::LogEntry;
use crate::util::error::ProviderError;
use std::fmt;

/// Remediation to apply to every selected entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailAction {
    Delete,
    MarkAsSpam,
}

impl MailAction {
    /// Past-tense verb for log lines and tallies.
    pub fn past_tense(&self) -> &'static str {
        match self {
            MailAction::Delete => "Deleted",
            MailAction::MarkAsSpam => "Marked as spam",
        }
    }
}

impl fmt::Display for MailAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MailAction::Delete => "delete",
            MailAction::MarkAsSpam => "mark-as-spam",
        })
    }
}

/// Backend that can act on a user's mailbox.
///
/// `message_id` is the RFC 822 message ID from the export; translating it to
/// the backend's internal ID is the provider's job.
pub trait MailActionProvider {
    fn delete_message(&mut self, message_id: &str, mailbox: &str) -> Result<(), ProviderError>;

    fn mark_as_spam(&mut self, message_id: &str, mailbox: &str) -> Result<(), ProviderError>;
}

/// One failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub message_id: String,
    pub mailbox: String,
    pub error: ProviderError,
}

/// Outcome of a batch of actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: MailAction,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ActionFailure>,
}

impl ActionReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Apply `action` once per entry, in order.
///
/// Never aborts early: provider errors are recorded, logged, and skipped.
pub fn run_actions<P: MailActionProvider + ?Sized>(
    provider: &mut P,
    action: MailAction,
    entries: &[LogEntry],
) -> ActionReport {
    let mut report = ActionReport {
        action,
        attempted: 0,
        succeeded: 0,
        failures: Vec::new(),
    };

    tracing::info!(%action, entries = entries.len(), "Starting mailbox actions");

    for entry in entries {
        report.attempted += 1;
        let result = match action {
            MailAction::Delete => provider.delete_message(&entry.message_id, &entry.recipient),
            MailAction::MarkAsSpam => provider.mark_as_spam(&entry.message_id, &entry.recipient),
        };

        match result {
            Ok(()) => {
                report.succeeded += 1;
                tracing::info!(
                    message_id = %entry.message_id,
                    mailbox = %entry.recipient,
                    "{}",
                    action.past_tense()
                );
            }
            Err(error) => {
                tracing::error!(
                    message_id = %entry.message_id,
                    mailbox = %entry.recipient,
                    %action,
                    error = %error,
                    "Mailbox action failed; continuing"
                );
                report.failures.push(ActionFailure {
                    message_id: entry.message_id.clone(),
                    mailbox: entry.recipient.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        %action,
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed(),
        "Mailbox actions finished"
    );

    report
}

// =============================================================================
// Dry-run provider
// =============================================================================

/// A planned call recorded by `DryRunProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub action: MailAction,
    pub message_id: String,
    pub mailbox: String,
}

/// Provider that performs nothing and records what it was asked to do.
///
/// Lets an operator review the exact set of mailbox calls a run would make.
#[derive(Debug, Default)]
pub struct DryRunProvider {
    planned: Vec<PlannedAction>,
}

impl DryRunProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn planned(&self) -> &[PlannedAction] {
        &self.planned
    }

    fn record(&mut self, action: MailAction, message_id: &str, mailbox: &str) {
        tracing::debug!(%action, message_id, mailbox, "Dry run: call recorded");
        self.planned.push(PlannedAction {
            action,
            message_id: message_id.to_string(),
            mailbox: mailbox.to_string(),
        });
    }
}

impl MailActionProvider for DryRunProvider {
    fn delete_message(&mut self, message_id: &str, mailbox: &str) -> Result<(), ProviderError> {
        self.record(MailAction::Delete, message_id, mailbox);
        Ok(())
    }

    fn mark_as_spam(&mut self, message_id: &str, mailbox: &str) -> Result<(), ProviderError> {
        self.record(MailAction::MarkAsSpam, message_id, mailbox);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_reader;
    use std::path::Path;

    fn entries() -> Vec<LogEntry> {
        let content = "Message ID,Start date,End date,Recipient address,Event status\n\
                       <m1>,2024/03/05 09:00:00 UTC,2024/03/05 09:00:00 UTC,a@owned.com,DELIVERED\n\
                       <m1>,2024/03/05 09:00:00 UTC,2024/03/05 09:00:00 UTC,gone@owned.com,DELIVERED\n\
                       <m1>,2024/03/05 09:00:00 UTC,2024/03/05 09:00:00 UTC,locked@owned.com,DELIVERED\n\
                       <m1>,2024/03/05 09:00:00 UTC,2024/03/05 09:00:00 UTC,b@owned.com,VIEWED\n";
        parse_reader(content.as_bytes(), Path::new("actions.csv")).unwrap()
    }

    /// Fails for specific mailboxes, succeeds otherwise.
    struct FlakyProvider {
        calls: Vec<String>,
    }

    impl FlakyProvider {
        fn outcome(&mut self, message_id: &str, mailbox: &str) -> Result<(), ProviderError> {
            self.calls.push(mailbox.to_string());
            match mailbox {
                "gone@owned.com" => Err(ProviderError::MessageNotFound {
                    message_id: message_id.to_string(),
                    mailbox: mailbox.to_string(),
                }),
                "locked@owned.com" => Err(ProviderError::DelegationDenied {
                    mailbox: mailbox.to_string(),
                }),
                _ => Ok(()),
            }
        }
    }

    impl MailActionProvider for FlakyProvider {
        fn delete_message(&mut self, message_id: &str, mailbox: &str) -> Result<(), ProviderError> {
            self.outcome(message_id, mailbox)
        }

        fn mark_as_spam(&mut self, message_id: &str, mailbox: &str) -> Result<(), ProviderError> {
            self.outcome(message_id, mailbox)
        }
    }

    #[test]
    fn test_failures_do_not_stop_the_batch() {
        let mut provider = FlakyProvider { calls: Vec::new() };
        let report = run_actions(&mut provider, MailAction::Delete, &entries());

        assert_eq!(provider.calls.len(), 4);
        assert_eq!(provider.calls.last().map(String::as_str), Some("b@owned.com"));
        assert_eq!(report.attempted, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.failures[0].mailbox, "gone@owned.com");
        assert!(matches!(
            report.failures[1].error,
            ProviderError::DelegationDenied { .. }
        ));
    }

    #[test]
    fn test_dry_run_records_every_call() {
        let mut provider = DryRunProvider::new();
        let report = run_actions(&mut provider, MailAction::MarkAsSpam, &entries());

        assert_eq!(report.succeeded, 4);
        assert_eq!(provider.planned().len(), 4);
        assert_eq!(
            provider.planned()[0],
            PlannedAction {
                action: MailAction::MarkAsSpam,
                message_id: "<m1>".to_string(),
                mailbox: "a@owned.com".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_batch() {
        let mut provider = DryRunProvider::new();
        let report = run_actions(&mut provider, MailAction::Delete, &[]);
        assert_eq!(report.attempted, 0);
        assert!(provider.planned().is_empty());
    }
}
