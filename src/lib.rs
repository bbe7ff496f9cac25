//! # Solmate - solar-surplus EV charge controller
//!
//! Solmate decides, from real-time solar surplus and battery-state
//! signals, when to start, ramp, hold, and stop an EV charging session,
//! driving an external charger's on/off switch and requested-amperage
//! setpoint.
//!
//! ## Features
//!
//! - **Debounced control**: a finite-state machine with debounce timers
//!   arbitrates between noisy power measurements and the charger's slow
//!   physical response, avoiding relay chatter
//! - **Pure surplus evaluation**: `surplus = production - consumption -
//!   buffer`, converted to a derated single-phase amperage target
//! - **Injected boundaries**: sensors, switch and setpoint are abstract
//!   points provided by the host platform, never ambient globals
//! - **Observability**: every transition is logged and published to an
//!   event channel without influencing control behavior
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `points`: External point boundary and in-memory implementation
//! - `machine`: The charge-control state machine
//! - `timer`: Single-shot debounce timers
//! - `evaluator`: Pure surplus/target-amps arithmetic
//! - `controller`: Event loop wiring sensors, machine and charger
//! - `listeners`: Transition logging and event publication

pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod listeners;
pub mod logging;
pub mod machine;
pub mod points;
pub mod timer;

// Re-export commonly used types
pub use config::Config;
pub use controller::{Controller, ControllerHandle};
pub use error::{Result, SolmateError};
