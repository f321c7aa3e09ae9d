//! # Steer axis controller
//!
//! A PID controller operating on the circular heading domain. The error is
//! always the shortest signed angle from the current heading to the target,
//! so a target just across the +/-pi boundary gives a small error rather than
//! one of nearly a full turn.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{get_ang_dist_pi, SwerveCtrlError};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A heading PID controller producing a normalised steer command.
#[derive(Debug, Serialize, Clone)]
pub struct TurnServo {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Bound on the magnitude of the integral accumulation
    ///
    /// Units: radians*seconds
    integral_limit: f64,

    /// Previous error, `None` after construction or a reset
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TurnServo {

    /// Create a new controller with the given gains.
    pub fn new(
        k_p: f64, k_i: f64, k_d: f64, integral_limit: f64
    ) -> Result<Self, SwerveCtrlError> {
        if ![k_p, k_i, k_d].iter().all(|k| k.is_finite()) {
            return Err(SwerveCtrlError::ConfigurationError(format!(
                "Steer gains must be finite, found ({}, {}, {})", k_p, k_i, k_d
            )));
        }
        if !integral_limit.is_finite() || integral_limit < 0.0 {
            return Err(SwerveCtrlError::ConfigurationError(format!(
                "Steer integral limit must be finite and non-negative, found {}",
                integral_limit
            )));
        }

        Ok(Self {
            k_p, k_i, k_d,
            integral_limit,
            integral: 0f64,
            prev_error: None
        })
    }

    /// Get the steer command to move from the current heading to the target.
    ///
    /// `dt_s` is the time since the last call. If it is not a positive finite
    /// number only the proportional term is updated.
    ///
    /// The output is between -1 and +1. A non-finite heading gives a zero
    /// output and leaves the integral and derivative state untouched.
    pub fn compute(&mut self, current_rad: f64, target_rad: f64, dt_s: f64) -> f64 {
        let error = get_ang_dist_pi(current_rad, target_rad);

        if !error.is_finite() {
            return 0f64;
        }

        let dt = if dt_s.is_finite() && dt_s > 0.0 {
            Some(dt_s)
        }
        else {
            None
        };

        // Accumulate the integral term, bounded to prevent windup while the
        // steer motor is saturated.
        if let Some(t) = dt {
            self.integral = clamp(
                &(self.integral + error * t),
                &-self.integral_limit,
                &self.integral_limit
            );
        }

        // Calculate the derivative.
        //
        // With no previous error (first cycle after a reset) the derivative
        // is taken as zero so resuming doesn't kick the steer axis.
        let deriv = match (self.prev_error, dt) {
            (Some(e), Some(t)) => get_ang_dist_pi(e, error) / t,
            _ => 0f64
        };

        let out =
            self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv;

        self.prev_error = Some(error);

        clamp(&out, &-1.0, &1.0)
    }

    /// Clear the integral and derivative state.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }

    /// The error used in the most recent computation.
    ///
    /// Units: radians
    pub fn last_error(&self) -> Option<f64> {
        self.prev_error
    }

    /// Units: radians*seconds
    pub fn integral(&self) -> f64 {
        self.integral
    }
}
