// PRISM - core/export.rs
//
// Output writers: entries as CSV, the incident summary as JSON, and the
// Markdown incident report.
// Core layer: writes to any Write trait object; the path is used only for
// error context.

use crate::core::aggregate::IncidentSummary;
use crate::core::model::{DeliveryOutcome, LogEntry};
use crate::util::error::ReportError;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

/// Export entries to CSV using the export's own column names, so the output
/// can be fed back into the parser.
///
/// Every column an entry carries is written. Timestamps keep the offset and
/// zone abbreviation they were read with.
pub fn export_csv<W: Write>(
    entries: &[LogEntry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ReportError> {
    use crate::util::constants::*;

    let csv_err = |e: csv::Error| ReportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record([
            COL_MESSAGE_ID,
            COL_START_DATE,
            COL_END_DATE,
            COL_SENDER,
            COL_MESSAGE_SIZE,
            COL_SUBJECT,
            COL_DIRECTION,
            COL_ATTACHMENTS,
            COL_RECIPIENT,
            COL_EVENT_TARGET,
            COL_EVENT_DATE,
            COL_EVENT_STATUS,
            COL_EVENT_TARGET_IP,
            COL_HAS_ENCRYPTION,
            COL_SMTP_REPLY_CODE,
            COL_EVENT_DESCRIPTION,
            COL_CLIENT_TYPE,
            COL_DEVICE_SESSION_ID,
        ])
        .map_err(csv_err)?;

    let mut count = 0;
    for entry in entries {
        let encryption = if entry.encrypted { ENCRYPTED_MARKER } else { "" };
        csv_writer
            .write_record([
                entry.message_id.as_str(),
                format_export_date(entry.start_date, &entry.start_zone).as_str(),
                format_export_date(entry.end_date, &entry.end_zone).as_str(),
                entry.sender.as_str(),
                entry.message_size.to_string().as_str(),
                opt(&entry.subject),
                opt(&entry.direction),
                entry.attachments.to_string().as_str(),
                entry.recipient.as_str(),
                opt(&entry.event_target),
                opt(&entry.event_date),
                entry.event_status.as_export_str(),
                opt(&entry.event_target_ip),
                encryption,
                opt(&entry.smtp_reply_code),
                opt(&entry.event_description),
                opt(&entry.client_type),
                opt(&entry.device_session_id),
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ReportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Render a timestamp back into the export layout, in the zone it was read
/// with.
fn format_export_date(ts: chrono::DateTime<chrono::FixedOffset>, zone: &str) -> String {
    format!("{} {zone}", ts.format(crate::util::constants::EXPORT_DATE_FORMAT))
}

/// Export the summary as pretty-printed JSON.
pub fn export_summary_json<W: Write>(
    summary: &IncidentSummary,
    writer: W,
    export_path: &Path,
) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(writer, summary).map_err(|e| ReportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })
}

/// Render the incident report as Markdown: title, executive summary, and a
/// distribution table listing only outcomes that occurred.
pub fn render_report(summary: &IncidentSummary, title_suffix: &str) -> Result<String, ReportError> {
    let title = summary.title(title_suffix)?;
    let narrative = summary.summary_text()?;

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "# {title}\n");
    let _ = writeln!(out, "## Executive Summary\n");
    let _ = writeln!(out, "{narrative}\n");
    let _ = writeln!(out, "## Email Distribution Overview\n");
    let _ = writeln!(out, "| Outcome | Recipients |");
    let _ = writeln!(out, "|---|---:|");
    for outcome in DeliveryOutcome::reportable() {
        let count = summary.count(*outcome);
        if count > 0 {
            let _ = writeln!(out, "| {} | {count} |", outcome.label());
        }
    }
    let _ = writeln!(out, "\nTotal Emails Delivered: {}", summary.total_recipients);

    Ok(out)
}
