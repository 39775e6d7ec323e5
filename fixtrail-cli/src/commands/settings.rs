//! Tracking settings CLI commands.
//!
//! Reads and edits the `locationSettings` record in the tracking store, the
//! same record a running engine loads at start.

use std::path::PathBuf;

use clap::Subcommand;
use fixtrail::config::ConfigFile;
use fixtrail::tracking::{load_settings, save_settings, Coordinate, ReferenceUpdate, SettingsPatch};

use super::common::{open_store, print_settings, AccuracyArg};
use crate::error::CliError;

/// Settings subcommands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommands {
    /// Show the stored tracking settings
    Show {
        /// Store directory (defaults to [storage] directory from config.ini)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,
    },

    /// Change one or more tracking settings
    Set {
        /// Store directory (defaults to [storage] directory from config.ini)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,

        /// Minimum distance between recorded fixes, in meters
        #[arg(long, value_name = "METERS")]
        radius: Option<f64>,

        /// Requested positioning accuracy
        #[arg(long, value_enum)]
        accuracy: Option<AccuracyArg>,

        /// Keep tracking while the app is suspended (true/false)
        #[arg(long, value_name = "BOOL")]
        background: Option<bool>,

        /// Show alerts and the tracking indicator (true/false)
        #[arg(long, value_name = "BOOL")]
        notify: Option<bool>,

        /// Nominal tracking interval, in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<u32>,

        /// Reference point latitude
        #[arg(long, requires = "reference_lon", allow_negative_numbers = true)]
        reference_lat: Option<f64>,

        /// Reference point longitude
        #[arg(long, requires = "reference_lat", allow_negative_numbers = true)]
        reference_lon: Option<f64>,

        /// Remove the reference point
        #[arg(long, conflicts_with_all = ["reference_lat", "reference_lon"])]
        clear_reference: bool,
    },
}

/// Run a settings subcommand.
pub async fn run(command: SettingsCommands) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();

    match command {
        SettingsCommands::Show { store } => {
            let store = open_store(&config, store.as_deref());
            let settings = load_settings(&store).await?;

            println!("Tracking settings ({})", store.dir().display());
            print_settings(&settings);
            Ok(())
        }
        SettingsCommands::Set {
            store,
            radius,
            accuracy,
            background,
            notify,
            interval,
            reference_lat,
            reference_lon,
            clear_reference,
        } => {
            let reference = match (reference_lat, reference_lon) {
                (Some(lat), Some(lon)) => Some(parse_reference(lat, lon)?),
                _ => None,
            };
            let patch = SettingsPatch {
                min_radius_meters: radius.map(check_radius).transpose()?,
                accuracy_tier: accuracy.map(Into::into),
                background_tracking_enabled: background,
                notify,
                tracking_interval_secs: interval,
                reference_point: reference_update(reference, clear_reference),
                ..Default::default()
            };
            if patch.is_empty() {
                return Err(CliError::Config(
                    "Nothing to change. Use 'fixtrail settings set --help' to list options."
                        .to_string(),
                ));
            }

            let store = open_store(&config, store.as_deref());
            let updated = load_settings(&store).await?.merged(&patch);
            save_settings(&store, &updated).await?;

            println!("Updated tracking settings ({})", store.dir().display());
            print_settings(&updated);
            Ok(())
        }
    }
}

fn check_radius(meters: f64) -> Result<f64, CliError> {
    if meters.is_finite() && meters > 0.0 {
        Ok(meters)
    } else {
        Err(CliError::Config(format!(
            "--radius must be a positive number of meters, got {}",
            meters
        )))
    }
}

fn parse_reference(latitude: f64, longitude: f64) -> Result<Coordinate, CliError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(CliError::Config(format!(
            "Reference point {}, {} is outside the valid range",
            latitude, longitude
        )));
    }
    Ok(Coordinate::new(latitude, longitude))
}

fn reference_update(point: Option<Coordinate>, clear: bool) -> ReferenceUpdate {
    match (point, clear) {
        (Some(point), _) => ReferenceUpdate::Set(point),
        (None, true) => ReferenceUpdate::Clear,
        (None, false) => ReferenceUpdate::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_radius() {
        assert_eq!(check_radius(25.0).unwrap(), 25.0);
        assert!(check_radius(0.0).is_err());
        assert!(check_radius(-3.0).is_err());
        assert!(check_radius(f64::NAN).is_err());
    }

    #[test]
    fn test_parse_reference_range() {
        assert!(parse_reference(43.6, 1.44).is_ok());
        assert!(parse_reference(-90.0, 180.0).is_ok());
        assert!(parse_reference(91.0, 0.0).is_err());
        assert!(parse_reference(0.0, -181.0).is_err());
    }

    #[test]
    fn test_reference_update() {
        let point = Coordinate::new(1.0, 2.0);
        assert_eq!(reference_update(Some(point), false), ReferenceUpdate::Set(point));
        assert_eq!(reference_update(None, true), ReferenceUpdate::Clear);
        assert_eq!(reference_update(None, false), ReferenceUpdate::Unchanged);
    }
}
