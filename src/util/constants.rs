// PRISM - util/constants.rs
//
// Single source of truth for named constants, export column names, and
// defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "PRISM";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "prism";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Export columns (Google Workspace email log search)
// =============================================================================
//
// The parser is header-driven: columns may appear in any order and unknown
// columns are ignored.

pub const COL_MESSAGE_ID: &str = "Message ID";
pub const COL_START_DATE: &str = "Start date";
pub const COL_END_DATE: &str = "End date";
pub const COL_SENDER: &str = "Sender";
pub const COL_MESSAGE_SIZE: &str = "Message size";
pub const COL_SUBJECT: &str = "Subject";
pub const COL_DIRECTION: &str = "Direction";
pub const COL_ATTACHMENTS: &str = "Attachments";
pub const COL_RECIPIENT: &str = "Recipient address";
pub const COL_EVENT_TARGET: &str = "Event target";
pub const COL_EVENT_DATE: &str = "Event date";
pub const COL_EVENT_STATUS: &str = "Event status";
pub const COL_EVENT_TARGET_IP: &str = "Event target IP address";
pub const COL_HAS_ENCRYPTION: &str = "Has encryption";
pub const COL_SMTP_REPLY_CODE: &str = "Event SMTP reply code";
pub const COL_EVENT_DESCRIPTION: &str = "Event description";
pub const COL_CLIENT_TYPE: &str = "Client Type";
pub const COL_DEVICE_SESSION_ID: &str = "Device User Session ID";

/// Value of the "Has encryption" column for encrypted messages.
pub const ENCRYPTED_MARKER: &str = "Encrypted";

/// chrono format for the date/time part of export timestamps. The trailing
/// zone abbreviation is handled separately.
pub const EXPORT_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Human-readable form of the export timestamp layout, used in error text.
pub const EXPORT_DATE_LAYOUT: &str = "YYYY/MM/DD hh:mm:ss ZONE";

// =============================================================================
// Reporting
// =============================================================================

/// Default suffix appended to the report title date.
pub const DEFAULT_REPORT_TITLE_SUFFIX: &str = "Phishing Incident";

/// Sender text used in the narrative when more than one sender is involved.
pub const MULTIPLE_SENDERS_TEXT: &str = "multiple users";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log levels accepted in `[logging] level`.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
