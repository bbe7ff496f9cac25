//! Configuration management for Solmate
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. The configuration is collected once at
//! setup and is immutable thereafter.

use crate::error::{Result, SolmateError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External point identifiers (sensors, switch, numbers)
    pub points: PointsConfig,

    /// Charge-control constants and debounce durations
    pub control: ControlConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Identifiers of the external points the controller reads and writes.
///
/// These are opaque names owned by the host platform; the core never
/// holds the underlying values, only snapshots and commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Home consumption power sensor (W)
    pub home_consumption: String,

    /// PV production power sensor (W)
    pub pv_production: String,

    /// Battery state-of-charge sensor (%)
    pub battery_soc: String,

    /// Charger on/off switch
    pub charger_switch: String,

    /// Requested charging amps setpoint
    pub requested_amps: String,

    /// Reported current charging amps sensor
    pub current_amps: String,
}

/// Charge-control constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Power margin subtracted from raw surplus (W)
    pub power_buffer_w: f64,

    /// Debounce before acting on sufficient surplus (milliseconds)
    pub charge_start_delay_ms: u64,

    /// Debounce before acting on insufficient surplus (milliseconds)
    pub charge_stop_delay_ms: u64,

    /// Pause between charge sessions after cooldown completes (milliseconds)
    pub session_pause_ms: u64,

    /// Minimum viable charging current. Below this the charger would
    /// oscillate, so it is also the warmup setpoint.
    pub min_viable_amps: i32,

    /// Single-phase grid voltage assumption (V)
    pub grid_voltage_v: f64,

    /// Derating factor applied to surplus before converting to amps (0..1)
    pub derating_factor: f64,

    /// Assumed car presence at startup when no live presence source is
    /// wired in. See `CarPresence` in the controller module.
    pub assume_car_present: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file or log directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            home_consumption: "sensor.home_consumption".to_string(),
            pv_production: "sensor.pv_production".to_string(),
            battery_soc: "sensor.battery_soc".to_string(),
            charger_switch: "switch.charger".to_string(),
            requested_amps: "number.charger_requested_amps".to_string(),
            current_amps: "sensor.charger_current_amps".to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            power_buffer_w: 500.0,
            charge_start_delay_ms: 3_000,
            charge_stop_delay_ms: 3_000,
            session_pause_ms: 10_000,
            min_viable_amps: 5,
            grid_voltage_v: 240.0,
            derating_factor: 0.9,
            assume_car_present: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/solmate.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            points: PointsConfig::default(),
            control: ControlConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from default locations, falling back to defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            "solmate_config.yaml",
            "/data/solmate_config.yaml",
            "/etc/solmate/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("points.home_consumption", &self.points.home_consumption),
            ("points.pv_production", &self.points.pv_production),
            ("points.battery_soc", &self.points.battery_soc),
            ("points.charger_switch", &self.points.charger_switch),
            ("points.requested_amps", &self.points.requested_amps),
            ("points.current_amps", &self.points.current_amps),
        ] {
            if value.is_empty() {
                return Err(SolmateError::validation(
                    field,
                    "point identifier cannot be empty",
                ));
            }
        }

        if self.control.min_viable_amps <= 0 {
            return Err(SolmateError::validation(
                "control.min_viable_amps",
                "must be positive",
            ));
        }

        if self.control.grid_voltage_v <= 0.0 {
            return Err(SolmateError::validation(
                "control.grid_voltage_v",
                "must be positive",
            ));
        }

        if !(0.0..=1.0).contains(&self.control.derating_factor) {
            return Err(SolmateError::validation(
                "control.derating_factor",
                "must be within 0..=1",
            ));
        }

        if self.control.power_buffer_w < 0.0 {
            return Err(SolmateError::validation(
                "control.power_buffer_w",
                "must not be negative",
            ));
        }

        Ok(())
    }
}
