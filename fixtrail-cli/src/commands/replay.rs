//! Trace replay command.
//!
//! Drives a full tracking session over a recorded JSON fix trace: the fixes
//! are fed through a scripted platform into a real engine backed by the
//! configured store, so they pass the same filter, stats and lifecycle
//! hand-over as live fixes would.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use fixtrail::tracking::{
    KeyValueStore, LifecycleHub, LocationFix, LocationPlatform, Notifier, RecordingNotifier,
    ReplayPlatform, TrackingEngine, TrackingMode,
};
use tracing::info;

use super::common::print_stats;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for `fixtrail replay`.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON file holding an array of fixes
    pub trace: PathBuf,

    /// Suspend the app just before the fix at this index
    #[arg(long, value_name = "N")]
    pub background_at: Option<usize>,

    /// Resume the app just before the fix at this index
    #[arg(long, value_name = "N")]
    pub foreground_at: Option<usize>,

    /// Store directory (defaults to [storage] directory from config.ini)
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,
}

/// Outcome of a replayed session.
#[derive(Debug, Default)]
struct ReplaySummary {
    fixes: usize,
    delivered: usize,
    accepted: usize,
    modes: Vec<TrackingMode>,
}

impl ReplaySummary {
    fn rejected(&self) -> usize {
        self.delivered.saturating_sub(self.accepted)
    }
}

/// Run the replay command.
pub async fn run(args: ReplayArgs, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(verbose)?;
    runner.log_startup("replay");

    let fixes = load_trace(&args.trace)?;
    check_index("--background-at", args.background_at, fixes.len())?;
    check_index("--foreground-at", args.foreground_at, fixes.len())?;

    let platform = Arc::new(ReplayPlatform::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let lifecycle = LifecycleHub::new();
    let engine = TrackingEngine::start(
        Arc::clone(&platform),
        runner.open_store(args.store.as_deref()),
        Arc::clone(&notifier),
        &lifecycle,
        runner.config().engine_config(),
    )
    .await;

    let was_enabled = engine.settings().tracking_enabled;
    let history_before = engine.history().len();
    let mut modes = engine.subscribe_mode();

    if let Err(e) = engine.start_tracking().await {
        engine.shutdown().await;
        return Err(e.into());
    }

    let mut summary = ReplaySummary {
        fixes: fixes.len(),
        ..Default::default()
    };
    for (index, fix) in fixes.into_iter().enumerate() {
        apply_app_state(&engine, &args, index).await;
        if platform.emit(fix) > 0 {
            summary.delivered += 1;
        }
    }
    apply_app_state(&engine, &args, summary.fixes).await;
    engine.flush().await;

    summary.accepted = engine.history().len().saturating_sub(history_before);
    while let Some(mode) = modes.try_recv() {
        summary.modes.push(mode);
    }
    info!(
        fixes = summary.fixes,
        accepted = summary.accepted,
        rejected = summary.rejected(),
        "Replay complete"
    );

    print_summary(&args.trace, &summary);
    println!();
    println!("Trip:");
    print_stats(&engine.stats(), engine.history().len());

    let alerts = notifier.alerts();
    if !alerts.is_empty() {
        println!();
        println!("Alerts:");
        for alert in alerts {
            println!("  {}: {}", alert.title, alert.body);
        }
    }

    engine.shutdown().await;
    if !was_enabled {
        // Leave the stored switch as the user had it
        engine.stop_tracking().await;
    }
    Ok(())
}

async fn apply_app_state<P, S, N>(engine: &TrackingEngine<P, S, N>, args: &ReplayArgs, index: usize)
where
    P: LocationPlatform,
    S: KeyValueStore,
    N: Notifier,
{
    if args.background_at == Some(index) {
        engine.handle_app_state(false).await;
    }
    if args.foreground_at == Some(index) {
        engine.handle_app_state(true).await;
    }
}

/// Read a JSON array of fixes.
fn load_trace(path: &Path) -> Result<Vec<LocationFix>, CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Trace {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| CliError::Trace {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn check_index(flag: &str, index: Option<usize>, len: usize) -> Result<(), CliError> {
    match index {
        Some(i) if i > len => Err(CliError::Config(format!(
            "{} {} is past the end of a {}-fix trace",
            flag, i, len
        ))),
        _ => Ok(()),
    }
}

fn print_summary(trace: &Path, summary: &ReplaySummary) {
    println!("Replayed {}", trace.display());
    println!("  Fixes in trace: {}", summary.fixes);
    println!("  Delivered:      {}", summary.delivered);
    println!("  Accepted:       {}", summary.accepted);
    println!("  Rejected:       {}", summary.rejected());

    let modes: Vec<String> = summary.modes.iter().map(ToString::to_string).collect();
    println!("  Modes:          {}", modes.join(" -> "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_trace() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.json");
        std::fs::write(
            &path,
            r#"[
                {"latitude": 43.6, "longitude": 1.44, "accuracy": 5, "timestamp": 1000},
                {"latitude": 43.601, "longitude": 1.44, "accuracy": 5, "timestamp": 41000,
                 "speed": 2.5}
            ]"#,
        )
        .unwrap();

        let fixes = load_trace(&path).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[1].timestamp_ms, 41_000);
        assert_eq!(fixes[1].speed_mps, Some(2.5));
    }

    #[test]
    fn test_load_trace_rejects_malformed_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.json");
        std::fs::write(&path, r#"{"latitude": 43.6}"#).unwrap();

        let err = load_trace(&path).unwrap_err();
        assert!(matches!(err, CliError::Trace { .. }));
    }

    #[test]
    fn test_load_trace_missing_file() {
        let err = load_trace(Path::new("/nonexistent/trace.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/trace.json"));
    }

    #[test]
    fn test_check_index() {
        assert!(check_index("--background-at", None, 0).is_ok());
        assert!(check_index("--background-at", Some(3), 3).is_ok());
        assert!(check_index("--background-at", Some(4), 3).is_err());
    }

    #[test]
    fn test_rejected_count() {
        let summary = ReplaySummary {
            fixes: 10,
            delivered: 8,
            accepted: 5,
            modes: Vec::new(),
        };
        assert_eq!(summary.rejected(), 3);
    }
}
