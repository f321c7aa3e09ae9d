//! Demands passed into SwerveCtrl and the state reported back out

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The state the caller wants the module to achieve this cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Wheel speed over the ground. May be negative.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Module heading, in any range.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// The measured state of the module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ModuleState {
    /// Distance travelled by the wheel since the encoders were last reset.
    ///
    /// Units: meters
    pub drv_pos_m: f64,

    /// Units: meters/second
    pub drv_vel_ms: f64,

    /// Module heading, in (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Units: radians/second
    pub str_vel_rads: f64,
}

impl DesiredState {
    pub fn new(speed_ms: f64, heading_rad: f64) -> Self {
        Self { speed_ms, heading_rad }
    }
}
