//! # Swerve executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{hal::EncoderConversion, swerve_ctrl::DesiredState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SwerveExecParams {

    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Conversion factors from raw motor encoder units
    pub conversion: EncoderConversion,

    /// Simulated drive motor speed at full output.
    ///
    /// Units: RPM
    pub sim_drv_free_speed_rpm: f64,

    /// Simulated steer motor speed at full output.
    ///
    /// Units: RPM
    pub sim_str_free_speed_rpm: f64,

    /// Simulated absolute encoder supply voltage.
    ///
    /// Units: volts
    pub sim_abs_reference_v: f64,

    /// Raw angle the simulated absolute encoder reads at startup.
    ///
    /// Units: radians
    pub sim_abs_initial_rad: f64,

    /// Timed sequence of demands to execute
    pub script: Vec<ScriptedDemand>,
}

/// A demand held from `start_s` until the next demand starts.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ScriptedDemand {
    /// Time from the start of the loop.
    ///
    /// Units: seconds
    pub start_s: f64,

    #[serde(flatten)]
    pub demand: DesiredState,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SwerveExecParams {

    /// Check the parameters are usable.
    pub fn are_valid(&self) -> Result<(), String> {
        if !self.cycle_period_s.is_finite() || self.cycle_period_s <= 0.0 {
            return Err(format!("Cycle period must be positive, found {}", self.cycle_period_s));
        }

        if !self.conversion.is_valid() {
            return Err(format!("Invalid encoder conversion factors: {:?}", self.conversion));
        }

        if self.script.windows(2).any(|w| w[1].start_s < w[0].start_s) {
            return Err("Script demands must be in start time order".into());
        }

        Ok(())
    }

    /// Get the demand active at time `t_s`, or `None` if the script has not started.
    pub fn demand_at(&self, t_s: f64) -> Option<DesiredState> {
        self.script
            .iter()
            .take_while(|d| d.start_s <= t_s)
            .last()
            .map(|d| d.demand)
    }

    /// Time at which the last demand starts.
    ///
    /// Units: seconds
    pub fn script_end_s(&self) -> f64 {
        self.script.last().map(|d| d.start_s).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EXEC_TOML: &str = r#"
        cycle_period_s = 0.02
        sim_drv_free_speed_rpm = 5676.0
        sim_str_free_speed_rpm = 300.0
        sim_abs_reference_v = 5.0
        sim_abs_initial_rad = 0.4

        [conversion]
        drv_rot_to_m = 0.0479
        drv_rpm_to_ms = 0.000798
        str_rot_to_rad = 0.3491
        str_rpm_to_rads = 0.005818

        [[script]]
        start_s = 0.0
        speed_ms = 1.0
        heading_rad = 0.0

        [[script]]
        start_s = 2.0
        speed_ms = 0.0
        heading_rad = 0.0
    "#;

    #[test]
    fn test_load_and_script() {
        let p: SwerveExecParams = util::params::parse(EXEC_TOML).unwrap();
        assert!(p.are_valid().is_ok());

        assert_eq!(p.demand_at(-1.0), None);
        assert_eq!(p.demand_at(1.0), Some(DesiredState::new(1.0, 0.0)));
        assert_eq!(p.demand_at(5.0), Some(DesiredState::new(0.0, 0.0)));
        assert_eq!(p.script_end_s(), 2.0);
    }

    #[test]
    fn test_unordered_script_invalid() {
        let mut p: SwerveExecParams = util::params::parse(EXEC_TOML).unwrap();
        p.script.reverse();
        assert!(p.are_valid().is_err());
    }
}
