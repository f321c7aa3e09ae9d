//! Absolute heading sensor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::{PI, TAU};

use crate::hal::RatioSensor;
use super::{wrap_pi, SwerveCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts the raw reading of an analog absolute encoder into a calibrated
/// module heading.
#[derive(Debug)]
pub struct AbsHeadingSensor<A> {
    sensor: A,

    /// Heading reading when the wheel points straight ahead.
    ///
    /// Units: radians
    offset_rad: f64,

    reversed: bool,
}

/// A single reading from the absolute sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsReading {
    /// Fraction of a full rotation measured by the sensor, between 0 and 1.
    pub ratio: f64,

    /// Calibrated heading, in (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<A: RatioSensor> AbsHeadingSensor<A> {

    /// Create a new sensor with the given calibration.
    ///
    /// The offset must be in (-pi, pi].
    pub fn new(sensor: A, offset_rad: f64, reversed: bool) -> Result<Self, SwerveCtrlError> {
        if !(offset_rad > -PI && offset_rad <= PI) {
            return Err(SwerveCtrlError::ConfigurationError(format!(
                "Absolute encoder offset must be in (-pi, pi], found {}", offset_rad
            )));
        }

        Ok(Self { sensor, offset_rad, reversed })
    }

    /// Read the calibrated heading.
    ///
    /// Any failure to get a valid sample is a `SensorFault`, a stale or zero
    /// heading is never returned.
    pub fn read(&mut self) -> Result<f64, SwerveCtrlError> {
        self.read_full().map(|r| r.heading_rad)
    }

    /// Read the calibrated heading along with the raw ratio it was derived from.
    pub fn read_full(&mut self) -> Result<AbsReading, SwerveCtrlError> {
        let ratio = self.sensor.ratio().map_err(SwerveCtrlError::SensorFault)?;

        let mut angle_rad = ratio * TAU - self.offset_rad;

        if self.reversed {
            angle_rad = -angle_rad;
        }

        Ok(AbsReading {
            ratio,
            heading_rad: wrap_pi(angle_rad),
        })
    }
}
