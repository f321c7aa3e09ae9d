//! # Hardware capability interfaces
//!
//! The swerve controller never talks to a concrete motor controller or
//! encoder. Instead each piece of hardware is reached through one of the
//! narrow capability traits in this module, so the control logic can run
//! against real drivers, the simulation in [`crate::sim`], or test fakes.
//!
//! Implementations are responsible for bounding the latency of every call:
//! a bus that does not answer within its deadline shall return
//! [`HalError::Timeout`] rather than block the control cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A relative encoder reporting a position and a velocity.
///
/// Units are whatever the implementation is configured for. Raw motor
/// encoders report rotations and RPM, wrapping one in [`Scaled`] converts
/// these into meters or radians.
pub trait PositionVelocitySource {
    /// Get the current position of the encoder.
    fn position(&mut self) -> Result<f64, HalError>;

    /// Get the current velocity of the encoder.
    fn velocity(&mut self) -> Result<f64, HalError>;

    /// Overwrite the encoder's position accumulator.
    fn set_position(&mut self, position: f64) -> Result<(), HalError>;
}

/// An actuator accepting a normalised command.
pub trait NormalizedActuator {
    /// Set the actuator output.
    ///
    /// ## Arguments
    /// - `command` - The demanded output, between -1.0 and +1.0.
    fn set(&mut self, command: f64) -> Result<(), HalError>;
}

/// An analog sensor whose sample is interpreted relative to a reference voltage.
pub trait RatioSensor {
    /// Get the sampled voltage.
    fn sample_v(&mut self) -> Result<f64, HalError>;

    /// Get the reference (supply) voltage the sample is relative to.
    fn reference_v(&mut self) -> Result<f64, HalError>;

    /// Get the sample as a fraction of the reference voltage.
    ///
    /// Fails with [`HalError::OutOfRange`] if the reference is not positive or
    /// the ratio is not within [0, 1]. A sample equal to the reference is
    /// accepted, it is a full turn and so the same angle as a ratio of 0.
    fn ratio(&mut self) -> Result<f64, HalError> {
        let sample = self.sample_v()?;
        let reference = self.reference_v()?;

        if !reference.is_finite() || reference <= 0.0 {
            return Err(HalError::OutOfRange(reference));
        }

        let ratio = sample / reference;

        if !(0.0..=1.0).contains(&ratio) {
            return Err(HalError::OutOfRange(ratio));
        }

        Ok(ratio)
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Wraps a motor so that its commands and encoder readings are negated when
/// the axis is mounted reversed.
#[derive(Debug)]
pub struct Directed<T> {
    inner: T,
    reversed: bool,
}

/// Wraps a raw encoder to apply unit conversion factors.
#[derive(Debug)]
pub struct Scaled<T> {
    inner: T,
    position_factor: f64,
    velocity_factor: f64,
}

/// Conversion factors from raw motor encoder units into module units.
///
/// These are robot-wide constants which depend on gearing and wheel size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EncoderConversion {
    /// Drive encoder rotations to wheel travel.
    ///
    /// Units: meters/rotation
    pub drv_rot_to_m: f64,

    /// Drive encoder RPM to wheel speed.
    ///
    /// Units: (meters/second)/RPM
    pub drv_rpm_to_ms: f64,

    /// Steer encoder rotations to module heading.
    ///
    /// Units: radians/rotation
    pub str_rot_to_rad: f64,

    /// Steer encoder RPM to module heading rate.
    ///
    /// Units: (radians/second)/RPM
    pub str_rpm_to_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors reported by hardware capability implementations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HalError {
    #[error("The device is not connected")]
    Disconnected,

    #[error("The device did not respond before its deadline")]
    Timeout,

    #[error("The device returned an out of range value ({0})")]
    OutOfRange(f64),

    #[error("Bus error: {0}")]
    Bus(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> Directed<T> {
    pub fn new(inner: T, reversed: bool) -> Self {
        Self { inner, reversed }
    }

    fn sign(&self) -> f64 {
        if self.reversed { -1.0 } else { 1.0 }
    }

    /// Borrow the wrapped device.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: NormalizedActuator> NormalizedActuator for Directed<T> {
    fn set(&mut self, command: f64) -> Result<(), HalError> {
        let sign = self.sign();
        self.inner.set(sign * command)
    }
}

impl<T: PositionVelocitySource> PositionVelocitySource for Directed<T> {
    fn position(&mut self) -> Result<f64, HalError> {
        let sign = self.sign();
        self.inner.position().map(|p| sign * p)
    }

    fn velocity(&mut self) -> Result<f64, HalError> {
        let sign = self.sign();
        self.inner.velocity().map(|v| sign * v)
    }

    fn set_position(&mut self, position: f64) -> Result<(), HalError> {
        let sign = self.sign();
        self.inner.set_position(sign * position)
    }
}

impl<T> Scaled<T> {
    pub fn new(inner: T, position_factor: f64, velocity_factor: f64) -> Self {
        Self { inner, position_factor, velocity_factor }
    }

    /// Wrap a drive motor using the drive factors from `conv`.
    pub fn drive(inner: T, conv: &EncoderConversion) -> Self {
        Self::new(inner, conv.drv_rot_to_m, conv.drv_rpm_to_ms)
    }

    /// Wrap a steer motor using the steer factors from `conv`.
    pub fn steer(inner: T, conv: &EncoderConversion) -> Self {
        Self::new(inner, conv.str_rot_to_rad, conv.str_rpm_to_rads)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: PositionVelocitySource> PositionVelocitySource for Scaled<T> {
    fn position(&mut self) -> Result<f64, HalError> {
        self.inner.position().map(|p| p * self.position_factor)
    }

    fn velocity(&mut self) -> Result<f64, HalError> {
        self.inner.velocity().map(|v| v * self.velocity_factor)
    }

    fn set_position(&mut self, position: f64) -> Result<(), HalError> {
        self.inner.set_position(position / self.position_factor)
    }
}

impl<T: NormalizedActuator> NormalizedActuator for Scaled<T> {
    fn set(&mut self, command: f64) -> Result<(), HalError> {
        self.inner.set(command)
    }
}

impl EncoderConversion {
    /// Check that all factors are finite and non-zero.
    pub fn is_valid(&self) -> bool {
        [
            self.drv_rot_to_m,
            self.drv_rpm_to_ms,
            self.str_rot_to_rad,
            self.str_rpm_to_rads,
        ]
        .iter()
        .all(|f| f.is_finite() && *f != 0.0)
    }
}
