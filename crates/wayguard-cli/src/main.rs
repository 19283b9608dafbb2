//! `wayguard` – command-line driver for the Wayguard engine.
//!
//! Runs the real perception and alert pipeline against synthetic depth
//! scenes, printing alerts to the terminal:
//!
//! ```text
//! wayguard simulate [scenario] [frames]   replay a walking scenario
//! wayguard config                         print the effective configuration
//! wayguard backend <classifier|detector>  persist the labeler backend
//! ```
//!
//! Configuration lives in `~/.wayguard/config.toml`.  Ctrl-C stops a running
//! simulation cleanly.

mod config;
mod console;
mod scenario;

use colored::Colorize;
use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use wayguard_labeler::sim::SimLabelerFactory;
use wayguard_runtime::config::SettingsStore;
use wayguard_runtime::frame_loop::{FrameLoop, FrameOutcome};
use wayguard_types::{ClassifierBackend, HazardState, Label, WayError};

use crate::config::VaultStore;
use crate::console::ConsoleSink;
use crate::scenario::Scenario;

const DEFAULT_FRAMES: usize = 60;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Simulate { scenario: Scenario, frames: usize },
    ShowConfig,
    Backend(ClassifierBackend),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut it = args.iter().map(String::as_str);
    match it.next() {
        None | Some("help" | "--help" | "-h") => Ok(Command::Help),
        Some("simulate") => {
            let scenario = match it.next() {
                Some(name) => name.parse::<Scenario>()?,
                None => Scenario::Mixed,
            };
            let frames = match it.next() {
                Some(n) => n
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("frame count must be a positive integer, got '{n}'"))?,
                None => DEFAULT_FRAMES,
            };
            Ok(Command::Simulate { scenario, frames })
        }
        Some("config") => Ok(Command::ShowConfig),
        Some("backend") => {
            let name = it
                .next()
                .ok_or_else(|| "backend requires 'classifier' or 'detector'".to_string())?;
            name.parse::<ClassifierBackend>()
                .map(Command::Backend)
                .map_err(|e| e.to_string())
        }
        Some(other) => Err(format!("unknown command '{other}'")),
    }
}

fn main() -> ExitCode {
    let _telemetry = wayguard_runtime::init_tracing("wayguard");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            print_usage();
            return ExitCode::from(2);
        }
    };

    let result = match command {
        Command::Simulate { scenario, frames } => simulate(scenario, frames),
        Command::ShowConfig => show_config(),
        Command::Backend(backend) => set_backend(backend),
        Command::Help => {
            print_usage();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn simulate(scenario: Scenario, frames: usize) -> Result<(), WayError> {
    let cfg = config::load_or_default()?;
    print_banner();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping simulation …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    // ── Engine wiring ─────────────────────────────────────────────────────
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| WayError::ResourceUnavailable(format!("failed to start labeler runtime: {e}")))?;
    let factory = SimLabelerFactory::new()
        .with_label(Label::new(cfg.scenario.label.clone(), 0.9))
        .with_detector_tuning(cfg.engine.labeler.detector);
    let store: Arc<dyn SettingsStore> = Arc::new(VaultStore::new(config::config_path()));
    let mut engine = FrameLoop::new(cfg.engine.clone(), cfg.settings, ConsoleSink::stdout())?
        .with_settings_store(store)
        .with_labeler(Arc::new(factory), runtime.handle().clone());

    let mut source = scenario.source(cfg.scenario.width, cfg.scenario.height, frames);
    let interval = Duration::from_millis(cfg.scenario.frame_interval_ms);

    println!(
        "  Scenario {} · {}×{} depth · backend {}\n",
        scenario.to_string().bold(),
        cfg.scenario.width,
        cfg.scenario.height,
        cfg.settings.classifier_backend.to_string().bold()
    );
    info!(%scenario, frames, "simulation started");

    // ── Frame loop ────────────────────────────────────────────────────────
    engine.start();
    let mut active = None;
    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    let mut skipped = 0usize;
    while source.remaining() > 0 && !shutdown.load(Ordering::SeqCst) {
        match engine.run_once(&mut source) {
            FrameOutcome::Processed(report) => {
                *tally.entry(hazard_name(&report.hazard)).or_default() += 1;
                active = engine.active_backend().or(active);
            }
            FrameOutcome::Unavailable(_) => skipped += 1,
            FrameOutcome::Stopped => break,
        }
        std::thread::sleep(interval);
    }
    engine.stop();

    // ── Summary ───────────────────────────────────────────────────────────
    println!();
    println!("  {}", "Summary".bold().underline());
    for (hazard, count) in &tally {
        println!("    {hazard:<16} {count}");
    }
    println!("    {:<16} {skipped}", "skipped");
    let labeler = active.map_or_else(|| "never started".to_string(), |b| b.to_string());
    println!("    {:<16} {labeler}", "labeler");
    println!(
        "    {:<16} {} pulses, {} phrases",
        "alerts",
        engine.sink().haptic_pulses,
        engine.sink().phrases
    );
    Ok(())
}

fn show_config() -> Result<(), WayError> {
    let cfg = config::load_or_default()?;
    let raw = toml::to_string_pretty(&cfg)
        .map_err(|e| WayError::Config(format!("failed to serialize config: {e}")))?;
    println!("# {}", config::config_path().display());
    println!("{raw}");
    Ok(())
}

fn set_backend(backend: ClassifierBackend) -> Result<(), WayError> {
    let store = VaultStore::new(config::config_path());
    let mut settings = store.load()?;
    settings.classifier_backend = backend;
    store.save(&settings)?;
    println!(
        "  {} Labeler backend set to {} in {}",
        "✓".green().bold(),
        backend.to_string().bold(),
        store.path().display()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn hazard_name(hazard: &HazardState) -> String {
    match hazard {
        HazardState::Clear => "clear".to_string(),
        HazardState::ObstacleClose(Some(label)) => format!("obstacle ({label})"),
        HazardState::ObstacleClose(None) => "obstacle".to_string(),
        HazardState::TiltTooHigh => "tilt too high".to_string(),
        HazardState::TiltTooLow => "tilt too low".to_string(),
        HazardState::Staircase => "staircase".to_string(),
        HazardState::DeepDropOff => "deep drop-off".to_string(),
    }
}

fn print_banner() {
    println!();
    println!("  {} {}", "Wayguard".bold().cyan(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Depth-sensing mobility aid – simulator");
    println!();
}

fn print_usage() {
    println!("{}", "Usage:".bold());
    println!("  wayguard simulate [scenario] [frames]");
    println!("  wayguard config");
    println!("  wayguard backend <classifier|detector>");
    println!();
    let names: Vec<String> = Scenario::ALL.iter().map(|s| s.to_string()).collect();
    println!("Scenarios: {}", names.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_prints_help() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn simulate_defaults() {
        assert_eq!(
            parse_args(&args(&["simulate"])).unwrap(),
            Command::Simulate {
                scenario: Scenario::Mixed,
                frames: DEFAULT_FRAMES
            }
        );
    }

    #[test]
    fn simulate_with_scenario_and_frames() {
        assert_eq!(
            parse_args(&args(&["simulate", "stairs", "12"])).unwrap(),
            Command::Simulate {
                scenario: Scenario::Stairs,
                frames: 12
            }
        );
        assert!(parse_args(&args(&["simulate", "stairs", "0"])).is_err());
        assert!(parse_args(&args(&["simulate", "volcano"])).is_err());
    }

    #[test]
    fn backend_accepts_legacy_names() {
        assert_eq!(
            parse_args(&args(&["backend", "yolo"])).unwrap(),
            Command::Backend(ClassifierBackend::Detector)
        );
        assert!(parse_args(&args(&["backend"])).is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(parse_args(&args(&["fly"])).is_err());
    }

    #[test]
    fn hazard_names_include_label() {
        assert_eq!(
            hazard_name(&HazardState::ObstacleClose(Some("chair".to_string()))),
            "obstacle (chair)"
        );
    }
}
