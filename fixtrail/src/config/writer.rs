//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[monitor]
; How often location services are probed while the app is active (default: 5000)
probe_interval_ms = {}
; Probes slower than this are inconclusive and change nothing (default: 3000)
probe_timeout_ms = {}

[tracking]
; Timeout for foreground watch and current-position requests (default: 10000)
watch_timeout_ms = {}
; Fixes timestamped before the last recorded fix:
;   reject - drop them (default)
;   accept - evaluate them with the usual distance rules
stale_fix_policy = {}

[storage]
; Directory for locationSettings.json and locationHistory.json
directory = {}

[logging]
; Log file (cleared at the start of every session)
file = {}
"#,
        config.monitor.probe_interval_ms,
        config.monitor.probe_timeout_ms,
        config.tracking.watch_timeout_ms,
        config.tracking.stale_fix_policy,
        path_to_string(&config.storage.directory),
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
