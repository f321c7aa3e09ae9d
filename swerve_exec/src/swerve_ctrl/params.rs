//! Parameters structure for SwerveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use super::{SwerveCtrlError, DEFAULT_DEADBAND_MS, DEFAULT_STR_INTEGRAL_LIMIT};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for a single swerve module.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Params {

    // ---- HARDWARE ----

    /// Bus identifier of the drive motor controller.
    pub drv_act_id: u32,

    /// Bus identifier of the steer motor controller.
    pub str_act_id: u32,

    /// True if positive drive commands move the wheel backwards.
    pub drv_reversed: bool,

    /// True if positive steer commands decrease the heading.
    pub str_reversed: bool,

    /// Analog channel of the absolute encoder.
    pub abs_enc_id: u32,

    /// Absolute encoder reading when the module points straight ahead, in
    /// (-pi, pi].
    ///
    /// Units: radians
    pub abs_enc_offset_rad: f64,

    /// True if the absolute encoder counts against the heading direction.
    pub abs_enc_reversed: bool,

    // ---- CAPABILITIES ----

    /// Wheel speed at full drive output.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Speeds smaller than this are treated as stopped.
    ///
    /// Units: meters/second
    #[serde(default = "default_deadband_ms")]
    pub deadband_ms: f64,

    // ---- STEER CONTROL ----

    /// Steer proportional gain
    pub str_k_p: f64,

    /// Steer integral gain
    #[serde(default)]
    pub str_k_i: f64,

    /// Steer derivative gain
    #[serde(default)]
    pub str_k_d: f64,

    /// Bound on the steer integral accumulation.
    ///
    /// Units: radians*seconds
    #[serde(default = "default_str_integral_limit")]
    pub str_integral_limit: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {

    /// Determines if the parameters are valid.
    ///
    /// Checks the fields no component validates itself. The encoder offset,
    /// maximum speed and steer gains are checked by the components they
    /// configure when [`super::SwerveCtrl`] builds them.
    pub fn are_valid(&self) -> Result<(), SwerveCtrlError> {
        if self.drv_act_id == self.str_act_id {
            return Err(SwerveCtrlError::ConfigurationError(format!(
                "Drive and steer actuators share the id {}", self.drv_act_id
            )));
        }

        if !self.deadband_ms.is_finite() || self.deadband_ms < 0.0 {
            return Err(SwerveCtrlError::ConfigurationError(format!(
                "Deadband must be non-negative, found {}", self.deadband_ms
            )));
        }

        Ok(())
    }
}

fn default_deadband_ms() -> f64 {
    DEFAULT_DEADBAND_MS
}

fn default_str_integral_limit() -> f64 {
    DEFAULT_STR_INTEGRAL_LIMIT
}

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS_TOML: &str = r#"
        drv_act_id = 1
        str_act_id = 2
        drv_reversed = false
        str_reversed = true
        abs_enc_id = 0
        abs_enc_offset_rad = 0.25
        abs_enc_reversed = false
        max_speed_ms = 4.5
        str_k_p = 0.5
    "#;

    #[test]
    fn test_defaults() {
        let p: Params = util::params::parse(PARAMS_TOML).unwrap();

        assert_eq!(p.deadband_ms, DEFAULT_DEADBAND_MS);
        assert_eq!(p.str_integral_limit, DEFAULT_STR_INTEGRAL_LIMIT);
        assert_eq!(p.str_k_i, 0.0);
        assert_eq!(p.str_k_d, 0.0);
        assert!(p.str_reversed);
        assert!(p.are_valid().is_ok());
    }

    #[test]
    fn test_invalid() {
        let base: Params = util::params::parse(PARAMS_TOML).unwrap();

        let mut p = base.clone();
        p.str_act_id = p.drv_act_id;
        assert!(p.are_valid().is_err());

        let mut p = base;
        p.deadband_ms = -0.1;
        assert!(p.are_valid().is_err());
    }
}
