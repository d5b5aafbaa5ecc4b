// PRISM - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (fatal on failure)
// 3. Logging initialisation (debug mode support)
// 4. Dispatch to the requested command

use clap::{Parser, Subcommand};
use prism::app::actions::{DryRunProvider, MailAction};
use prism::app::context::RunContext;
use prism::core::filter::EntryFilter;
use prism::platform::config::{self, AppConfig, PlatformPaths};
use prism::util::{self, error::PrismError};
use std::path::PathBuf;
use std::process::ExitCode;

/// PRISM - incident response for Google Workspace email log exports.
///
/// Parses one or more email log search exports (CSV), removes duplicate
/// message/recipient rows, and either reports on the incident or drives
/// mailbox remediation.
#[derive(Parser, Debug)]
#[command(name = "prism", version, about)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a phishing incident report.
    Report {
        /// Email log search export(s) to process.
        #[arg(short = 'l', long = "logfile", required = true, num_args = 1..)]
        logfiles: Vec<PathBuf>,

        /// Markdown file where the report will be saved.
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Also write the raw summary as JSON.
        #[arg(long = "json")]
        json: Option<PathBuf>,
    },

    /// Delete every message listed in the export(s) from its recipient's mailbox.
    Delete {
        #[command(flatten)]
        selection: Selection,
    },

    /// Mark every message listed in the export(s) as spam.
    MarkSpam {
        #[command(flatten)]
        selection: Selection,
    },

    /// Write the deduplicated entries back out as CSV.
    Dedupe {
        /// Email log search export(s) to process.
        #[arg(short = 'l', long = "logfile", required = true, num_args = 1..)]
        logfiles: Vec<PathBuf>,

        /// CSV file for the unique entries.
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
}

/// Which entries a remediation command acts on.
#[derive(clap::Args, Debug)]
struct Selection {
    /// Email log search export(s) to process.
    #[arg(short = 'l', long = "logfile", required = true, num_args = 1..)]
    logfiles: Vec<PathBuf>,

    /// Only act on messages whose subject matches this regex.
    #[arg(long = "subject")]
    subject: Option<String>,

    /// Only act on messages from this exact sender address.
    #[arg(long = "sender")]
    sender: Option<String>,

    /// Only act on rows with this event status, as spelled in the export
    /// (e.g. DELIVERED, VIEWED, Quarantined). Repeatable.
    #[arg(long = "status")]
    statuses: Vec<String>,
}

impl Selection {
    fn filter(&self) -> Result<EntryFilter, PrismError> {
        let mut filter = EntryFilter {
            sender: self.sender.clone(),
            ..EntryFilter::default()
        };
        if let Some(ref pattern) = self.subject {
            filter.set_subject_regex(pattern)?;
        }
        filter.set_statuses(&self.statuses);
        Ok(filter)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());

    // Configuration is read before logging so that [logging] applies; a
    // load failure still initialises default logging to report it.
    let (app_config, warnings) = match config::load_config(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            util::logging::init(cli.debug, None, None);
            tracing::error!(error = %e, "Cannot load configuration");
            eprintln!("[-] {e}");
            return ExitCode::FAILURE;
        }
    };

    util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "{} starting",
        util::constants::APP_NAME
    );
    tracing::info!(
        path = %config_path.display(),
        owned_domains = app_config.owned_domains.len(),
        report_title_suffix = %app_config.report_title_suffix,
        warnings = warnings.len(),
        "Loaded config"
    );

    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config validation warning");
    }

    match run(cli.command, app_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("[-] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: AppConfig) -> Result<(), PrismError> {
    let mut ctx = RunContext::new(config);

    match command {
        Command::Report {
            logfiles,
            output,
            json,
        } => {
            let summary = ctx.generate_report(logfiles.as_slice(), &output, json.as_deref())?;
            println!(
                "[+] Report written to {} ({} recipients, {} viewed)",
                output.display(),
                summary.total_recipients,
                summary.viewed
            );
        }
        Command::Delete { selection } => remediate(&mut ctx, &selection, MailAction::Delete)?,
        Command::MarkSpam { selection } => {
            remediate(&mut ctx, &selection, MailAction::MarkAsSpam)?
        }
        Command::Dedupe { logfiles, output } => {
            let count = ctx.export_unique(logfiles.as_slice(), &output)?;
            println!("[+] Wrote {count} unique entries to {}", output.display());
        }
    }

    Ok(())
}

/// Run a remediation through the dry-run provider and print the plan.
fn remediate(
    ctx: &mut RunContext,
    selection: &Selection,
    action: MailAction,
) -> Result<(), PrismError> {
    let filter = selection.filter()?;
    let mut provider = DryRunProvider::new();
    let report = ctx.remediate(selection.logfiles.as_slice(), &filter, action, &mut provider)?;

    for planned in provider.planned() {
        println!(
            "[+] {} message {} for {} (dry run)",
            planned.action.past_tense(),
            planned.message_id,
            planned.mailbox
        );
    }
    for failure in &report.failures {
        println!(
            "[-] Failed to {} {} for {}: {}",
            action, failure.message_id, failure.mailbox, failure.error
        );
    }
    println!(
        "[+] {}: {} attempted, {} succeeded, {} failed",
        action,
        report.attempted,
        report.succeeded,
        report.failed()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism::core::model::EventStatus;

    fn selection(args: &[&str]) -> Selection {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Delete { selection } | Command::MarkSpam { selection } => selection,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_status_flag_reaches_filter() {
        let selection = selection(&[
            "prism", "delete", "-l", "a.csv", "--status", "DELIVERED", "--status", "VIEWED",
        ]);
        let filter = selection.filter().unwrap();
        assert_eq!(filter.statuses, vec![EventStatus::Delivered, EventStatus::Viewed]);
    }

    #[test]
    fn test_selection_without_criteria_is_empty() {
        let selection = selection(&["prism", "mark-spam", "--logfile", "a.csv", "b.csv"]);
        assert_eq!(selection.logfiles.len(), 2);
        assert!(selection.filter().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_subject_regex_is_an_error() {
        let selection = selection(&["prism", "delete", "-l", "a.csv", "--subject", "(oops"]);
        assert!(matches!(selection.filter(), Err(PrismError::Filter(_))));
    }
}
