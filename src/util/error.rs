// PRISM - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Each subsystem owns its error enum; `PrismError` wraps them for the
// binary and the orchestration layer.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all PRISM operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum PrismError {
    /// Export file loading or parsing failed.
    Parse(ParseError),

    /// A recipient address could not be split into local part and domain.
    Address(AddressError),

    /// Report generation or export failed.
    Report(ReportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Entry filter could not be built.
    Filter(FilterError),
}

impl fmt::Display for PrismError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Address(e) => write!(f, "Address error: {e}"),
            Self::Report(e) => write!(f, "Report error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
        }
    }
}

impl std::error::Error for PrismError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Address(e) => Some(e),
            Self::Report(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Filter(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors related to reading an email log export.
///
/// Every variant is fatal to the parse of the file that produced it; there
/// is no row-level recovery.
#[derive(Debug)]
pub enum ParseError {
    /// The export file does not exist.
    FileNotFound { file: PathBuf },

    /// I/O error while opening or reading the export.
    Io { file: PathBuf, source: io::Error },

    /// The CSV layer rejected the file (bad quoting, invalid UTF-8, ...).
    Csv { file: PathBuf, source: csv::Error },

    /// A required date column is absent or empty on a row.
    MissingDate {
        file: PathBuf,
        line_number: u64,
        column: &'static str,
    },

    /// A date cell does not match `YYYY/MM/DD hh:mm:ss ZONE`.
    InvalidDate {
        file: PathBuf,
        line_number: u64,
        column: &'static str,
        raw: String,
        reason: String,
    },

    /// A numeric cell contains something other than a non-negative integer.
    InvalidNumber {
        file: PathBuf,
        line_number: u64,
        column: &'static str,
        raw: String,
    },
}

impl ParseError {
    /// True for the malformed-content variants (as opposed to file access).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Csv { .. }
                | Self::MissingDate { .. }
                | Self::InvalidDate { .. }
                | Self::InvalidNumber { .. }
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound { file } => {
                write!(f, "Log file '{}' does not exist", file.display())
            }
            Self::Io { file, source } => {
                write!(f, "'{}': I/O error: {source}", file.display())
            }
            Self::Csv { file, source } => {
                write!(f, "'{}': malformed CSV: {source}", file.display())
            }
            Self::MissingDate {
                file,
                line_number,
                column,
            } => write!(
                f,
                "'{}' line {line_number}: required column '{column}' is missing or empty",
                file.display()
            ),
            Self::InvalidDate {
                file,
                line_number,
                column,
                raw,
                reason,
            } => write!(
                f,
                "'{}' line {line_number}: cannot parse '{column}' value '{raw}': {reason}",
                file.display()
            ),
            Self::InvalidNumber {
                file,
                line_number,
                column,
                raw,
            } => write!(
                f,
                "'{}' line {line_number}: '{column}' value '{raw}' is not a non-negative integer",
                file.display()
            ),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ParseError> for PrismError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Address errors
// ---------------------------------------------------------------------------

/// Errors related to recipient address handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The address has no `@`, so no domain can be determined.
    MissingAt { address: String },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAt { address } => {
                write!(f, "'{address}' is not an email address (no '@')")
            }
        }
    }
}

impl std::error::Error for AddressError {}

impl From<AddressError> for PrismError {
    fn from(e: AddressError) -> Self {
        Self::Address(e)
    }
}

// ---------------------------------------------------------------------------
// Report errors
// ---------------------------------------------------------------------------

/// Errors related to report rendering and export.
#[derive(Debug)]
pub enum ReportError {
    /// The summary has no start timestamp (no entries were aggregated).
    NoTimestamp,

    /// I/O error writing an output file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTimestamp => write!(
                f,
                "Cannot describe an incident with no log entries (no start time)"
            ),
            Self::Io { path, source } => {
                write!(f, "Report I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::NoTimestamp => None,
        }
    }
}

impl From<ReportError> for PrismError {
    fn from(e: ReportError) -> Self {
        Self::Report(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file does not exist.
    NotFound { path: PathBuf },

    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// No usable owned domain is configured but the operation needs one.
    NoOwnedDomains { path: PathBuf },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(
                f,
                "Config file '{}' does not exist. Pass --config or create it.",
                path.display()
            ),
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::NoOwnedDomains { path } => write!(
                f,
                "Config '{}' lists no owned domains. Add `domains = [...]` to a \
                 [[google_service_accounts]] entry.",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for PrismError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to entry filters.
#[derive(Debug)]
pub enum FilterError {
    /// User-provided subject regex is invalid.
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { pattern, source } => {
                write!(f, "Invalid subject regex '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
        }
    }
}

impl From<FilterError> for PrismError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Mail provider errors
// ---------------------------------------------------------------------------

/// Failures reported by a mail-action provider for a single message.
///
/// These are per-entry and non-fatal: the action runner logs them and moves
/// on to the next entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The mailbox holds no message with this export message ID.
    MessageNotFound { message_id: String, mailbox: String },

    /// Domain-wide delegation was refused for this mailbox.
    DelegationDenied { mailbox: String },

    /// The credentials lack the scope needed for the action.
    InsufficientPermission { mailbox: String },

    /// Any other provider-side failure.
    Provider { message: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageNotFound {
                message_id,
                mailbox,
            } => write!(f, "Message '{message_id}' not found in mailbox '{mailbox}'"),
            Self::DelegationDenied { mailbox } => {
                write!(f, "Delegation denied for mailbox '{mailbox}'")
            }
            Self::InsufficientPermission { mailbox } => write!(
                f,
                "Insufficient permission to act on mailbox '{mailbox}'"
            ),
            Self::Provider { message } => write!(f, "Provider error: {message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Convenience type alias for PRISM results.
pub type Result<T> = std::result::Result<T, PrismError>;
