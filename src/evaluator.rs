//! Surplus evaluation for Solmate
//!
//! Pure arithmetic over a consumption/production snapshot: no state, no
//! I/O, every call independent. The controller feeds the result into the
//! state machine as a surplus event; a failed evaluation never reaches the
//! machine.

use crate::config::ControlConfig;
use crate::error::{Result, SolmateError};
use crate::machine::MachineEvent;

/// Outcome of one surplus evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct SurplusEvaluation {
    /// Signed surplus after the configured buffer (W)
    pub surplus_w: f64,

    /// Derived charging target, floor of the derated single-phase current.
    /// Negative when the household draws more than the panels produce.
    pub target_amps: i32,
}

impl SurplusEvaluation {
    /// Map the evaluation onto the machine's event vocabulary: a viable
    /// target requests a start, anything below asks for a stop.
    pub fn to_event(&self, min_viable_amps: i32) -> MachineEvent {
        if self.target_amps >= min_viable_amps {
            MachineEvent::StartChargeOnSurplus {
                surplus_w: self.surplus_w,
                target_amps: self.target_amps,
            }
        } else {
            MachineEvent::StopChargeOnSurplus {
                surplus_w: self.surplus_w,
                target_amps: self.target_amps,
            }
        }
    }
}

/// Compute surplus and target amps from a sensor snapshot.
///
/// `surplus = production - consumption - buffer`;
/// `target_amps = floor(surplus * derating / voltage)`.
pub fn evaluate(
    consumption: Option<f64>,
    production: Option<f64>,
    control: &ControlConfig,
) -> Result<SurplusEvaluation> {
    let consumption = numeric("home_consumption", consumption)?;
    let production = numeric("pv_production", production)?;

    let surplus_w = production - consumption - control.power_buffer_w;
    let target_amps = (surplus_w * control.derating_factor / control.grid_voltage_v).floor();

    Ok(SurplusEvaluation {
        surplus_w,
        target_amps: target_amps as i32,
    })
}

fn numeric(point: &str, value: Option<f64>) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(SolmateError::invalid_reading(point, "value is not finite")),
        None => Err(SolmateError::invalid_reading(point, "no numeric value")),
    }
}
