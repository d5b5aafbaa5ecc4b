// PRISM - app/context.rs
//
// Explicit run context. Holds the validated configuration and drives the
// pipeline for one command invocation:
//
//   export file(s) -> LogCollection -> summarize            (report)
//                                    -> deduplicate -> filter -> act
//                                    -> deduplicate -> CSV    (dedupe)
//
// Loading failures propagate to the caller (fatal for the run); per-entry
// action failures are absorbed by `app::actions::run_actions`.

use crate::app::actions::{self, ActionReport, MailAction, MailActionProvider};
use crate::core::aggregate::{self, IncidentSummary, OwnedDomains};
use crate::core::export;
use crate::core::filter::EntryFilter;
use crate::core::model::LogEntry;
use crate::core::parser::LogCollection;
use crate::platform::config::AppConfig;
use crate::util::error::{ReportError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// State shared by every step of a single run.
#[derive(Debug)]
pub struct RunContext {
    config: AppConfig,
    collection: LogCollection,
}

impl RunContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            collection: LogCollection::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Everything loaded so far, duplicates included.
    pub fn entries(&self) -> &[LogEntry] {
        self.collection.entries()
    }

    /// Load every export and return the deduplicated entries.
    pub fn load_unique<P: AsRef<Path>>(&mut self, logfiles: &[P]) -> Result<Vec<LogEntry>> {
        self.collection.parse_multiple(logfiles)?;
        let unique = self.collection.deduplicate();
        tracing::info!(
            loaded = self.collection.len(),
            unique = unique.len(),
            "Removed duplicate entries with matching recipients and message IDs"
        );
        Ok(unique)
    }

    /// Load every export and return all entries, duplicates included.
    pub fn load_all<P: AsRef<Path>>(&mut self, logfiles: &[P]) -> Result<Vec<LogEntry>> {
        self.collection.parse_multiple(logfiles)?;
        Ok(self.collection.entries().to_vec())
    }

    /// Owned domains from config; fails if none are configured.
    pub fn owned_domains(&self) -> Result<OwnedDomains> {
        let domains = self.config.require_owned_domains()?;
        Ok(OwnedDomains::new(domains.iter().cloned()))
    }

    /// Classify recipients across `entries`.
    pub fn summarize(&self, entries: &[LogEntry]) -> Result<IncidentSummary> {
        let owned = self.owned_domains()?;
        Ok(aggregate::summarize(entries, &owned)?)
    }

    /// Summarise the exports and write the Markdown report (and optionally
    /// the JSON summary).
    ///
    /// Classification runs over every row, not the deduplicated set: later
    /// events for the same message and recipient (e.g. VIEWED after
    /// DELIVERED) decide the outcome.
    pub fn generate_report<P: AsRef<Path>>(
        &mut self,
        logfiles: &[P],
        report_path: &Path,
        json_path: Option<&Path>,
    ) -> Result<IncidentSummary> {
        let entries = self.load_all(logfiles)?;
        let summary = self.summarize(&entries)?;

        // Render before creating the file so a failed render leaves no
        // empty report behind.
        let report = export::render_report(&summary, &self.config.report_title_suffix)?;
        let mut file = create(report_path)?;
        file.write_all(report.as_bytes()).map_err(|e| ReportError::Io {
            path: report_path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(path = %report_path.display(), "Report written");

        if let Some(json_path) = json_path {
            let file = create(json_path)?;
            export::export_summary_json(&summary, BufWriter::new(file), json_path)?;
            tracing::info!(path = %json_path.display(), "Summary JSON written");
        }

        Ok(summary)
    }

    /// Load, deduplicate, and write the unique entries as CSV.
    pub fn export_unique<P: AsRef<Path>>(
        &mut self,
        logfiles: &[P],
        output: &Path,
    ) -> Result<usize> {
        let entries = self.load_unique(logfiles)?;
        let file = create(output)?;
        let count = export::export_csv(&entries, BufWriter::new(file), output)?;
        tracing::info!(path = %output.display(), entries = count, "Unique entries exported");
        Ok(count)
    }

    /// Load, deduplicate, filter, then apply `action` through `provider`.
    pub fn remediate<P, M>(
        &mut self,
        logfiles: &[P],
        filter: &EntryFilter,
        action: MailAction,
        provider: &mut M,
    ) -> Result<ActionReport>
    where
        P: AsRef<Path>,
        M: MailActionProvider + ?Sized,
    {
        let entries = filter.apply(self.load_unique(logfiles)?);
        Ok(actions::run_actions(provider, action, &entries))
    }
}

fn create(path: &Path) -> std::result::Result<File, ReportError> {
    File::create(path).map_err(|e| ReportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
