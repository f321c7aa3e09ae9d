//! Swerve module control
//!
//! Closed-loop control of a single swerve module: one drive axis run open
//! loop against the module's maximum speed, and one steer axis closed around
//! a heading estimate seeded from an absolute encoder.
//!
//! Each cycle the caller passes a [`DesiredState`] to
//! [`SwerveCtrl::set_desired_state`], which reads the current heading,
//! optimises the demand so the wheel never turns more than a quarter turn,
//! and writes both actuator commands.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod abs_sensor;
mod angle;
mod cmd;
mod drive_servo;
mod params;
mod state;
mod turn_servo;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use abs_sensor::*;
pub use angle::*;
pub use cmd::*;
pub use drive_servo::*;
pub use params::*;
pub use state::*;
pub use turn_servo::*;

use crate::hal::HalError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Speeds with a magnitude below this are treated as a stop demand.
///
/// Units: meters/second
pub const DEFAULT_DEADBAND_MS: f64 = 0.001;

/// Default bound on the steer controller's integral accumulator.
///
/// Units: radians*seconds
pub const DEFAULT_STR_INTEGRAL_LIMIT: f64 = 1.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during SwerveCtrl operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SwerveCtrlError {
    #[error("Could not read a sensor: {0}")]
    SensorFault(HalError),

    #[error("Could not command an actuator: {0}")]
    ActuatorFault(HalError),

    #[error("The module has not been calibrated against its absolute encoder")]
    NotCalibrated,

    #[error("Cannot {op} while the module is {mode:?}")]
    InvalidStateTransition {
        mode: ModuleMode,
        op: &'static str
    },

    #[error("Invalid module configuration: {0}")]
    ConfigurationError(String),
}
