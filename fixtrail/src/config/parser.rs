//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::defaults::MIN_PROBE_INTERVAL_MS;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [monitor] section
    if let Some(section) = ini.section(Some("monitor")) {
        if let Some(v) = section.get("probe_interval_ms") {
            let interval = parse_millis("monitor", "probe_interval_ms", v)?;
            if interval < MIN_PROBE_INTERVAL_MS {
                return Err(invalid(
                    "monitor",
                    "probe_interval_ms",
                    v,
                    &format!("must be at least {}", MIN_PROBE_INTERVAL_MS),
                ));
            }
            config.monitor.probe_interval_ms = interval;
        }
        if let Some(v) = section.get("probe_timeout_ms") {
            config.monitor.probe_timeout_ms = parse_millis("monitor", "probe_timeout_ms", v)?;
        }
    }

    // [tracking] section
    if let Some(section) = ini.section(Some("tracking")) {
        if let Some(v) = section.get("watch_timeout_ms") {
            config.tracking.watch_timeout_ms = parse_millis("tracking", "watch_timeout_ms", v)?;
        }
        if let Some(v) = section.get("stale_fix_policy") {
            config.tracking.stale_fix_policy = v.parse().map_err(|_| {
                invalid("tracking", "stale_fix_policy", v, "must be 'reject' or 'accept'")
            })?;
        }
    }

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.storage.directory = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parse a positive millisecond value.
fn parse_millis(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(invalid(
            section,
            key,
            value,
            "must be a positive integer (milliseconds)",
        )),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::tracking::StaleFixPolicy;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[monitor]
probe_interval_ms = 2000
"#,
        )
        .unwrap();

        assert_eq!(config.monitor.probe_interval_ms, 2000);
        assert_eq!(config.monitor.probe_timeout_ms, DEFAULT_PROBE_TIMEOUT_MS);
        assert_eq!(config.tracking.watch_timeout_ms, DEFAULT_WATCH_TIMEOUT_MS);
    }

    #[test]
    fn test_stale_fix_policy() {
        let config = load(
            r#"
[tracking]
stale_fix_policy = Accept
"#,
        )
        .unwrap();
        assert_eq!(config.tracking.stale_fix_policy, StaleFixPolicy::Accept);

        let err = load(
            r#"
[tracking]
stale_fix_policy = maybe
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("stale_fix_policy"));
    }

    #[test]
    fn test_invalid_millis() {
        let err = load(
            r#"
[tracking]
watch_timeout_ms = soon
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("milliseconds"));

        let err = load(
            r#"
[monitor]
probe_timeout_ms = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("probe_timeout_ms"));
    }

    #[test]
    fn test_probe_interval_floor() {
        let err = load(
            r#"
[monitor]
probe_interval_ms = 10
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("at least"));
    }

    #[test]
    fn test_paths() {
        let config = load(
            r#"
[storage]
directory = /var/lib/fixtrail

[logging]
file =
"#,
        )
        .unwrap();
        assert_eq!(config.storage.directory, PathBuf::from("/var/lib/fixtrail"));
        assert_eq!(config.logging.file, ConfigFile::default().logging.file);
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }
}
