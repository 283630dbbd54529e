//! Command-line interface parsing for ecodash
//!
//! Handles parsing of CLI arguments with clap and validates them into a
//! `StartupConfig`: a location (coordinates or a city name to geocode), plus
//! the refresh and quota-inspection flags.

use clap::Parser;
use thiserror::Error;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Neither coordinates nor a city name was provided
    #[error("No location given. Pass --lat/--lon or --city (not needed with --quota).")]
    MissingLocation,

    /// Only one of --lat/--lon was provided
    #[error("Both --lat and --lon are required when using coordinates.")]
    IncompleteCoordinates,

    /// Coordinates and a city name were both provided
    #[error("Use either --lat/--lon or --city, not both.")]
    ConflictingLocation,

    /// Latitude outside [-90, 90]
    #[error("Latitude {0} is out of range (-90 to 90).")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180]
    #[error("Longitude {0} is out of range (-180 to 180).")]
    LongitudeOutOfRange(f64),
}

/// ecodash - local weather, air quality and environmental alerts
#[derive(Parser, Debug)]
#[command(name = "ecodash")]
#[command(about = "Local weather, air quality and AI-generated environmental alerts")]
#[command(version)]
pub struct Cli {
    /// Latitude of the location to report on
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the location to report on
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// City name to geocode instead of coordinates
    #[arg(long)]
    pub city: Option<String>,

    /// Bypass cached responses and fetch fresh data
    #[arg(long)]
    pub force_refresh: bool,

    /// Skip AI alert generation
    #[arg(long)]
    pub no_alerts: bool,

    /// Print remaining API quota and exit
    #[arg(long)]
    pub quota: bool,
}

/// Where to fetch conditions for
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates { lat: f64, lon: f64 },
    City(String),
}

/// Validated configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Location to report on (`None` only when `show_quota` is set)
    pub location: Option<Location>,
    /// Bypass cached responses
    pub force_refresh: bool,
    /// Skip alert generation
    pub skip_alerts: bool,
    /// Print quota status instead of fetching
    pub show_quota: bool,
}

impl StartupConfig {
    /// Validates parsed CLI arguments into a StartupConfig.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let location = match (cli.lat, cli.lon, &cli.city) {
            (Some(_), Some(_), Some(_)) => return Err(CliError::ConflictingLocation),
            (Some(lat), Some(lon), None) => {
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(CliError::LatitudeOutOfRange(lat));
                }
                if !(-180.0..=180.0).contains(&lon) {
                    return Err(CliError::LongitudeOutOfRange(lon));
                }
                Some(Location::Coordinates { lat, lon })
            }
            (None, None, Some(city)) => Some(Location::City(city.clone())),
            (None, None, None) => None,
            _ => return Err(CliError::IncompleteCoordinates),
        };

        // --quota works without a location; everything else needs one
        if location.is_none() && !cli.quota {
            return Err(CliError::MissingLocation);
        }

        Ok(Self {
            location,
            force_refresh: cli.force_refresh,
            skip_alerts: cli.no_alerts,
            show_quota: cli.quota,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_coordinates() {
        let cli = Cli::parse_from(["ecodash", "--lat", "49.28", "--lon", "-123.12"]);
        assert_eq!(cli.lat, Some(49.28));
        assert_eq!(cli.lon, Some(-123.12));
        assert!(cli.city.is_none());
    }

    #[test]
    fn test_cli_parse_city() {
        let cli = Cli::parse_from(["ecodash", "--city", "Vancouver"]);
        assert_eq!(cli.city.as_deref(), Some("Vancouver"));
    }

    #[test]
    fn test_cli_parse_flags() {
        let cli = Cli::parse_from(["ecodash", "--city", "Lima", "--force-refresh", "--no-alerts"]);
        assert!(cli.force_refresh);
        assert!(cli.no_alerts);
        assert!(!cli.quota);
    }

    #[test]
    fn test_startup_config_coordinates() {
        let cli = Cli::parse_from(["ecodash", "--lat", "49.28", "--lon", "-123.12"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.location,
            Some(Location::Coordinates {
                lat: 49.28,
                lon: -123.12
            })
        );
        assert!(!config.force_refresh);
    }

    #[test]
    fn test_startup_config_city() {
        let cli = Cli::parse_from(["ecodash", "--city", "Vancouver"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.location, Some(Location::City("Vancouver".to_string())));
    }

    #[test]
    fn test_startup_config_missing_location() {
        let cli = Cli::parse_from(["ecodash"]);
        let result = StartupConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::MissingLocation)));
    }

    #[test]
    fn test_startup_config_quota_needs_no_location() {
        let cli = Cli::parse_from(["ecodash", "--quota"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert!(config.show_quota);
        assert!(config.location.is_none());
    }

    #[test]
    fn test_startup_config_half_coordinates() {
        let cli = Cli::parse_from(["ecodash", "--lat", "49.28"]);
        let result = StartupConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::IncompleteCoordinates)));
    }

    #[test]
    fn test_startup_config_city_and_coordinates_conflict() {
        let cli = Cli::parse_from([
            "ecodash", "--lat", "49.28", "--lon", "-123.12", "--city", "Vancouver",
        ]);
        let result = StartupConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::ConflictingLocation)));
    }

    #[test]
    fn test_startup_config_latitude_out_of_range() {
        let cli = Cli::parse_from(["ecodash", "--lat", "91.0", "--lon", "0.0"]);
        let result = StartupConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::LatitudeOutOfRange(_))));
    }

    #[test]
    fn test_startup_config_longitude_out_of_range() {
        let cli = Cli::parse_from(["ecodash", "--lat", "0.0", "--lon", "-181.0"]);
        let result = StartupConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::LongitudeOutOfRange(_))));
    }
}
