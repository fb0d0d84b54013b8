//! Application startup
//!
//! Parses arguments, merges the config file, installs logging and signal
//! handling, then scans each repository in turn and prints the reports.

use super::cli::args::{Args, RunSettings};
use super::cli::config::load_config;
use super::display::render_reports;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::styles::help_styles;
use crate::core::version::long_version;
use crate::scanner::{ScanError, ScanReport, ScannerManager};
use clap::{CommandFactory, FromArgMatches};
use std::io::IsTerminal;

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_FINDINGS: i32 = 2;
pub const EXIT_CANCELLED: i32 = 130;

/// Parse the process arguments and run; returns the process exit code
pub async fn startup() -> i32 {
    let matches = Args::command()
        .styles(help_styles(std::io::stdout().is_terminal()))
        .get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };
    run(args).await
}

pub async fn run(args: Args) -> i32 {
    let settings = match resolve_settings(&args).await {
        Ok(settings) => settings,
        Err(message) => {
            eprintln!("Error: {}", message);
            return EXIT_ERROR;
        }
    };

    if let Err(e) = init_logging(&settings.log) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return EXIT_ERROR;
    }
    log::info!("phiscan {} starting", long_version());
    if settings.scan.dry_run {
        log::info!("Dry run: no requests will be sent to the detection service");
    }

    let manager = match ScannerManager::from_settings(settings.scan.clone()) {
        Ok(manager) => manager,
        Err(e) => {
            log_error_with_context(&e, "Scanner setup");
            return EXIT_ERROR;
        }
    };

    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();

    let outcome = scan_all(&manager, &settings.repositories, &shutdown).await;

    match render_reports(&outcome.reports, settings.output, settings.log.color) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => {
            log::error!("Failed to render reports: {}", e);
            return EXIT_ERROR;
        }
    }

    exit_code(&outcome, settings.fail_on_findings)
}

async fn resolve_settings(args: &Args) -> Result<RunSettings, String> {
    let (_, config) = load_config(args.config_file.as_deref())
        .await
        .map_err(|e| e.to_string())?;
    args.resolve(config).map_err(|e| e.to_string())
}

/// Reports of every repository scanned before the run ended
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub reports: Vec<ScanReport>,
    pub failed: usize,
    pub cancelled: bool,
}

/// Scan repositories one after another
///
/// A failed repository is logged and the run moves on; cancellation stops the
/// run and keeps the reports gathered so far.
pub async fn scan_all(
    manager: &ScannerManager,
    repositories: &[String],
    shutdown: &ShutdownCoordinator,
) -> RunOutcome {
    let mut outcome = RunOutcome::default();
    for repository in repositories {
        match manager.scan_repository(repository, shutdown).await {
            Ok(report) => {
                log::info!(
                    "{}: {} findings, {} errors in {:.1}s",
                    report.repository_path,
                    report.findings.len(),
                    report.errors.len(),
                    report.duration.as_secs_f64()
                );
                outcome.reports.push(report);
            }
            Err(ScanError::Cancelled) => {
                log::warn!("Scan of {} cancelled", repository);
                outcome.cancelled = true;
                break;
            }
            Err(e) => {
                log_error_with_context(&e, &format!("Scanning {}", repository));
                outcome.failed += 1;
            }
        }
    }
    outcome
}

pub fn exit_code(outcome: &RunOutcome, fail_on_findings: bool) -> i32 {
    if outcome.cancelled {
        EXIT_CANCELLED
    } else if outcome.failed > 0 {
        EXIT_ERROR
    } else if fail_on_findings && outcome.reports.iter().any(ScanReport::is_dirty) {
        EXIT_FINDINGS
    } else {
        EXIT_OK
    }
}
