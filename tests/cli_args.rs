//! Integration tests for CLI argument handling
//!
//! Drives the binary for flag parsing and exercises the StartupConfig
//! validation through the library.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ecodash"))
        .args(args)
        .output()
        .expect("Failed to execute ecodash")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ecodash"), "Help should mention ecodash");
    assert!(stdout.contains("--lat"), "Help should mention --lat");
    assert!(stdout.contains("--city"), "Help should mention --city");
    assert!(
        stdout.contains("--force-refresh"),
        "Help should mention --force-refresh"
    );
}

#[test]
fn test_no_location_prints_error_and_exits() {
    let output = run_cli(&[]);
    assert!(!output.status.success(), "Expected missing location to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("location") || stderr.contains("Location"),
        "Should print error message about missing location: {}",
        stderr
    );
}

#[test]
fn test_half_coordinates_rejected() {
    let output = run_cli(&["--lat", "49.28"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("--lat") && stderr.contains("--lon"),
        "Should explain that both coordinates are required: {}",
        stderr
    );
}

#[test]
fn test_city_and_coordinates_rejected() {
    let output = run_cli(&["--lat", "49.28", "--lon", "-123.12", "--city", "Vancouver"]);
    assert!(!output.status.success());
}

#[test]
fn test_quota_flag_runs_without_location() {
    let output = run_cli(&["--quota"]);
    assert!(
        output.status.success(),
        "Expected --quota to run without a location"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("remaining"),
        "Quota status should report remaining calls: {}",
        stdout
    );
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use ecodash::cli::{Cli, CliError, Location, StartupConfig};

    #[test]
    fn test_cli_negative_coordinates_parse() {
        let cli = Cli::parse_from(["ecodash", "--lat", "-33.87", "--lon", "151.21"]);
        assert_eq!(cli.lat, Some(-33.87));
        assert_eq!(cli.lon, Some(151.21));
    }

    #[test]
    fn test_startup_config_round_trip() {
        let cli = Cli::parse_from([
            "ecodash",
            "--lat",
            "-33.87",
            "--lon",
            "151.21",
            "--force-refresh",
        ]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.location,
            Some(Location::Coordinates {
                lat: -33.87,
                lon: 151.21
            })
        );
        assert!(config.force_refresh);
        assert!(!config.skip_alerts);
    }

    #[test]
    fn test_startup_config_city_with_no_alerts() {
        let cli = Cli::parse_from(["ecodash", "--city", "Lima", "--no-alerts"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.location, Some(Location::City("Lima".to_string())));
        assert!(config.skip_alerts);
    }

    #[test]
    fn test_startup_config_out_of_range_latitude() {
        let cli = Cli::parse_from(["ecodash", "--lat", "120.0", "--lon", "10.0"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::LatitudeOutOfRange(_))
        ));
    }

    #[test]
    fn test_startup_config_quota_only() {
        let cli = Cli::parse_from(["ecodash", "--quota"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert!(config.show_quota);
        assert!(config.location.is_none());
    }
}
