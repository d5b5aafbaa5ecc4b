// PRISM - platform/config.rs
//
// Config directory resolution and config.toml loading with validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for PRISM configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/prism/ or %APPDATA%\prism\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined. Called before logging is initialised.
    pub fn resolve() -> Self {
        let config_dir = ProjectDirs::from("", "", constants::APP_ID)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config_dir }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so that a newer config file can be
/// used with an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[[google_service_accounts]]` array.
    pub google_service_accounts: Vec<ServiceAccountSection>,
    /// `[logging]` section.
    pub logging: LoggingSection,
    /// `[report]` section.
    pub report: ReportSection,
}

/// One `[[google_service_accounts]]` entry.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ServiceAccountSection {
    /// Path to the service account secret. Not read by PRISM itself.
    pub secret_file: Option<String>,
    /// Domains administered through this account.
    pub domains: Option<Vec<String>>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// `[report]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// Text following the date in the report title.
    pub title_suffix: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// File the configuration was read from.
    pub source: PathBuf,

    /// Owned domains across every service account, in file order, without
    /// duplicates.
    pub owned_domains: Vec<String>,

    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,

    /// Log file path.
    pub log_file: Option<String>,

    /// Report title suffix.
    pub report_title_suffix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            owned_domains: Vec::new(),
            log_level: None,
            log_file: None,
            report_title_suffix: constants::DEFAULT_REPORT_TITLE_SUFFIX.to_string(),
        }
    }
}

impl AppConfig {
    /// Owned domains, or an error if none are configured.
    pub fn require_owned_domains(&self) -> Result<&[String], ConfigError> {
        if self.owned_domains.is_empty() {
            Err(ConfigError::NoOwnedDomains {
                path: self.source.clone(),
            })
        } else {
            Ok(&self.owned_domains)
        }
    }
}

/// Load and validate the config file at `path`.
///
/// A missing, unreadable, or unparseable file is an error. Individually
/// invalid values are dropped and reported in the returned warning list.
///
/// Called before logging is initialised; the caller logs the outcome.
pub fn load_config(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    parse_config(&content, path)
}

/// Validate config text. `path` is used for error context only.
pub fn parse_config(content: &str, path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig {
        source: path.to_path_buf(),
        ..AppConfig::default()
    };

    // -- Service accounts: domains --
    for (idx, account) in raw.google_service_accounts.iter().enumerate() {
        let Some(ref domains) = account.domains else {
            continue;
        };
        for domain in domains {
            let domain = domain.trim();
            if domain.is_empty() {
                warnings.push(format!(
                    "[[google_service_accounts]] #{} has an empty domain. Ignored.",
                    idx + 1
                ));
            } else if domain.contains('@') || domain.contains(char::is_whitespace) {
                warnings.push(format!(
                    "[[google_service_accounts]] #{} domain \"{domain}\" is not a bare domain name. Ignored.",
                    idx + 1
                ));
            } else if !config.owned_domains.iter().any(|d| d == domain) {
                config.owned_domains.push(domain.to_string());
            }
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    // -- Report: title_suffix --
    if let Some(ref suffix) = raw.report.title_suffix {
        if suffix.trim().is_empty() {
            warnings.push(format!(
                "[report] title_suffix is empty. Using default (\"{}\").",
                constants::DEFAULT_REPORT_TITLE_SUFFIX
            ));
        } else {
            config.report_title_suffix = suffix.trim().to_string();
        }
    }

    Ok((config, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<(AppConfig, Vec<String>), ConfigError> {
        parse_config(content, Path::new("config.toml"))
    }

    #[test]
    fn test_domains_flattened_across_accounts() {
        let (config, warnings) = parse(
            r#"
[[google_service_accounts]]
secret_file = "a.json"
domains = ["owned.com", "owned.org"]

[[google_service_accounts]]
secret_file = "b.json"

[[google_service_accounts]]
domains = ["owned.org", "subsidiary.net"]
"#,
        )
        .unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(
            config.owned_domains,
            vec!["owned.com", "owned.org", "subsidiary.net"]
        );
        assert_eq!(config.report_title_suffix, "Phishing Incident");
    }

    #[test]
    fn test_invalid_values_warn_and_fall_back() {
        let (config, warnings) = parse(
            r#"
[[google_service_accounts]]
domains = ["user@owned.com", "", "owned.com"]

[logging]
level = "chatty"

[report]
title_suffix = "  "
"#,
        )
        .unwrap();
        assert_eq!(config.owned_domains, vec!["owned.com"]);
        assert_eq!(config.log_level, None);
        assert_eq!(config.report_title_suffix, "Phishing Incident");
        assert_eq!(warnings.len(), 4);
    }

    #[test]
    fn test_logging_and_report_sections() {
        let (config, _) = parse(
            r#"
[logging]
level = "DEBUG"
file = "prism.log"

[report]
title_suffix = "Credential Phish"
"#,
        )
        .unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_file.as_deref(), Some("prism.log"));
        assert_eq!(config.report_title_suffix, "Credential Phish");
    }

    #[test]
    fn test_no_domains_is_an_error_only_on_demand() {
        let (config, _) = parse("").unwrap();
        assert!(matches!(
            config.require_owned_domains(),
            Err(ConfigError::NoOwnedDomains { .. })
        ));
    }

    #[test]
    fn test_malformed_toml_is_fatal() {
        let err = parse("[[google_service_accounts]\ndomains = 3").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_default_config_file_name() {
        let paths = PlatformPaths::resolve();
        assert_eq!(
            paths.config_file(),
            paths.config_dir.join(constants::CONFIG_FILE_NAME)
        );
        assert!(paths.config_file().ends_with("config.toml"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_config(Path::new("/nonexistent/prism/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
