//! Drive axis open loop speed command

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{clamp, lin_map};

use super::SwerveCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts a wheel speed into a normalised drive command.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct DriveServo {
    /// Units: meters/second
    max_speed_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveServo {
    pub fn new(max_speed_ms: f64) -> Result<Self, SwerveCtrlError> {
        if !max_speed_ms.is_finite() || max_speed_ms <= 0.0 {
            return Err(SwerveCtrlError::ConfigurationError(format!(
                "Maximum speed must be positive, found {}", max_speed_ms
            )));
        }

        Ok(Self { max_speed_ms })
    }

    /// Get the normalised command, between -1 and +1, for the given speed.
    ///
    /// Speeds beyond the maximum saturate.
    pub fn command(&self, speed_ms: f64) -> f64 {
        let norm = lin_map(
            (-self.max_speed_ms, self.max_speed_ms),
            (-1f64, 1f64),
            speed_ms
        );

        clamp(&norm, &-1.0, &1.0)
    }
}
