//! Implementations for the SwerveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    optimise, wrap_pi,
    AbsHeadingSensor, DesiredState, DriveServo, ModuleState, Params, SwerveCtrlError, TurnServo,
};
use crate::hal::{Directed, HalError, NormalizedActuator, PositionVelocitySource, RatioSensor};
use util::session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Swerve module controller.
///
/// Owns the module's drive motor `D`, steer motor `S` (both with integrated
/// relative encoders) and absolute encoder `A`.
pub struct SwerveCtrl<D, S, A> {
    params: Params,

    mode: ModuleMode,

    drv: Directed<D>,
    str: Directed<S>,
    abs_sensor: AbsHeadingSensor<A>,

    drive_servo: DriveServo,
    turn_servo: TurnServo,

    calibration: Option<CalibrationSnapshot>,

    telemetry: ModuleTelemetry,
}

/// The absolute heading used to seed the steer encoder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CalibrationSnapshot {
    /// Units: radians
    pub heading_rad: f64,

    /// Raw fraction of a rotation read from the absolute encoder
    pub ratio: f64,

    /// Session time the snapshot was taken at, if a session is running.
    ///
    /// Units: seconds
    pub time_s: Option<f64>,
}

/// Observation of one control cycle, for external telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ModuleTelemetry {
    /// Mode at the end of the cycle
    pub mode: ModuleMode,

    /// Speed demand after optimisation.
    ///
    /// Units: meters/second
    pub target_speed_ms: f64,

    /// Heading demand after optimisation.
    ///
    /// Units: radians
    pub target_heading_rad: f64,

    /// Normalised drive command issued
    pub drv_cmd: f64,

    /// Normalised steer command issued
    pub str_cmd: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating mode of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ModuleMode {
    /// The absolute encoder has not been read successfully, no motion is
    /// possible.
    Uninitialised,

    /// Encoders seeded, no demand received yet.
    Calibrated,

    /// Following demands.
    Active,

    /// Stopped, with the steer controller reset.
    Idle,
}

impl Default for ModuleMode {
    fn default() -> Self {
        ModuleMode::Uninitialised
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D, S, A> SwerveCtrl<D, S, A>
where
    D: NormalizedActuator + PositionVelocitySource,
    S: NormalizedActuator + PositionVelocitySource,
    A: RatioSensor,
{
    /// Create a new controller and calibrate it against the absolute encoder.
    ///
    /// Invalid parameters are an error. A failed calibration is not: the
    /// controller is returned `Uninitialised` and rejects demands until
    /// [`SwerveCtrl::reset_encoders`] succeeds.
    pub fn new(params: Params, drv: D, str: S, abs: A) -> Result<Self, SwerveCtrlError> {
        params.are_valid()?;

        let drive_servo = DriveServo::new(params.max_speed_ms)?;
        let turn_servo = TurnServo::new(
            params.str_k_p,
            params.str_k_i,
            params.str_k_d,
            params.str_integral_limit,
        )?;
        let abs_sensor = AbsHeadingSensor::new(
            abs,
            params.abs_enc_offset_rad,
            params.abs_enc_reversed,
        )?;

        let mut ctrl = Self {
            drv: Directed::new(drv, params.drv_reversed),
            str: Directed::new(str, params.str_reversed),
            abs_sensor,
            drive_servo,
            turn_servo,
            mode: ModuleMode::Uninitialised,
            calibration: None,
            telemetry: ModuleTelemetry::default(),
            params,
        };

        if let Err(e) = ctrl.calibrate() {
            warn!(
                "Module (abs enc {}) failed initial calibration, it will remain uninitialised: {}",
                ctrl.params.abs_enc_id, e
            );
        }

        Ok(ctrl)
    }

    /// Get the measured state of the module.
    ///
    /// No actuator is commanded.
    pub fn get_state(&mut self) -> Result<ModuleState, SwerveCtrlError> {
        Ok(ModuleState {
            drv_pos_m: finite(self.drv.position())?,
            drv_vel_ms: finite(self.drv.velocity())?,
            heading_rad: self.heading()?,
            str_vel_rads: finite(self.str.velocity())?,
        })
    }

    /// Execute one control cycle towards the desired state.
    ///
    /// `dt_s` is the time since the previous cycle.
    ///
    /// Demands below the deadband stop the module. If the heading cannot be
    /// read both actuators are commanded to zero for this cycle and the mode
    /// is unchanged.
    pub fn set_desired_state(
        &mut self,
        desired: DesiredState,
        dt_s: f64,
    ) -> Result<ModuleTelemetry, SwerveCtrlError> {
        if self.mode == ModuleMode::Uninitialised {
            return Err(SwerveCtrlError::NotCalibrated);
        }

        if !desired.speed_ms.is_finite() || !desired.heading_rad.is_finite() {
            warn!("Non-finite demand {:?} treated as a stop", desired);
            self.stop()?;
            return Ok(self.telemetry);
        }

        if desired.speed_ms.abs() < self.params.deadband_ms {
            self.stop()?;
            return Ok(self.telemetry);
        }

        let current_rad = match self.heading() {
            Ok(h) => h,
            Err(e) => {
                warn!("Cannot read the module heading, commanding zero output: {}", e);
                self.zero_telemetry();
                if let Err(ae) = self.command_zero() {
                    warn!("Could not zero the actuators: {}", ae);
                }
                return Err(e);
            }
        };

        let target = optimise(desired, current_rad);

        let drv_cmd = self.drive_servo.command(target.speed_ms);
        let str_cmd = self.turn_servo.compute(current_rad, target.heading_rad, dt_s);

        self.drv.set(drv_cmd).map_err(SwerveCtrlError::ActuatorFault)?;

        // Don't leave the wheel driving with the steer axis out of control
        if let Err(e) = self.str.set(str_cmd) {
            self.zero_telemetry();
            if let Err(de) = self.drv.set(0.0) {
                warn!("Could not zero the drive after a steer fault: {}", de);
            }
            return Err(SwerveCtrlError::ActuatorFault(e));
        }

        self.set_mode(ModuleMode::Active);

        self.telemetry = ModuleTelemetry {
            mode: self.mode,
            target_speed_ms: target.speed_ms,
            target_heading_rad: target.heading_rad,
            drv_cmd,
            str_cmd,
        };

        trace!(
            "SwerveCtrl[{}] target: {:?}, drv: {:.4}, str: {:.4}",
            self.params.abs_enc_id, target, drv_cmd, str_cmd
        );

        Ok(self.telemetry)
    }

    /// Stop the module.
    ///
    /// Both actuators are commanded to zero and the steer controller is reset
    /// so no integral is carried into the next demand. Calling stop on a
    /// stopped module is harmless.
    pub fn stop(&mut self) -> Result<(), SwerveCtrlError> {
        self.turn_servo.reset();

        if self.mode != ModuleMode::Uninitialised {
            self.set_mode(ModuleMode::Idle);
        }

        self.zero_telemetry();

        self.command_zero()
    }

    /// Re-read the absolute encoder, re-seed the steer encoder and zero the
    /// drive position.
    ///
    /// Not allowed while `Active`, as the heading estimate would jump under a
    /// moving module. From `Uninitialised` this retries the calibration.
    pub fn reset_encoders(&mut self) -> Result<(), SwerveCtrlError> {
        if self.mode == ModuleMode::Active {
            return Err(SwerveCtrlError::InvalidStateTransition {
                mode: self.mode,
                op: "reset encoders",
            });
        }

        self.calibrate()
    }

    pub fn mode(&self) -> ModuleMode {
        self.mode
    }

    /// The observation from the most recent cycle.
    pub fn telemetry(&self) -> ModuleTelemetry {
        self.telemetry
    }

    /// The most recent successful calibration, if any.
    pub fn calibration(&self) -> Option<CalibrationSnapshot> {
        self.calibration
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Seed the encoders from the absolute encoder.
    ///
    /// The steer encoder is seeded first. If zeroing the drive position then
    /// fails the heading is still calibrated and the snapshot updated, only
    /// the drive position keeps its old value.
    fn calibrate(&mut self) -> Result<(), SwerveCtrlError> {
        let reading = self.abs_sensor.read_full()?;

        self.str
            .set_position(reading.heading_rad)
            .map_err(SwerveCtrlError::SensorFault)?;

        let snapshot = CalibrationSnapshot {
            heading_rad: reading.heading_rad,
            ratio: reading.ratio,
            time_s: session::try_get_elapsed_seconds(),
        };

        info!(
            "Module (abs enc {}) calibrated, heading {:.4} rad (ratio {:.4})",
            self.params.abs_enc_id, snapshot.heading_rad, snapshot.ratio
        );

        self.calibration = Some(snapshot);

        if self.mode == ModuleMode::Uninitialised {
            self.set_mode(ModuleMode::Calibrated);
        }

        self.drv.set_position(0.0).map_err(SwerveCtrlError::SensorFault)
    }

    /// Heading from the steer encoder, wrapped to (-pi, pi].
    fn heading(&mut self) -> Result<f64, SwerveCtrlError> {
        finite(self.str.position()).map(wrap_pi)
    }

    /// Record that no output is being issued this cycle, keeping the mode and
    /// the last heading target.
    fn zero_telemetry(&mut self) {
        self.telemetry = ModuleTelemetry {
            mode: self.mode,
            target_speed_ms: 0.0,
            target_heading_rad: self.telemetry.target_heading_rad,
            drv_cmd: 0.0,
            str_cmd: 0.0,
        };
    }

    /// Command both actuators to zero, attempting both even if the first fails.
    fn command_zero(&mut self) -> Result<(), SwerveCtrlError> {
        let drv = self.drv.set(0.0);
        let str = self.str.set(0.0);

        drv.and(str).map_err(SwerveCtrlError::ActuatorFault)
    }

    fn set_mode(&mut self, mode: ModuleMode) {
        if self.mode != mode {
            debug!(
                "Module (abs enc {}) {:?} -> {:?}",
                self.params.abs_enc_id, self.mode, mode
            );
            self.mode = mode;
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Map an encoder reading to a `SensorFault` if it failed or is not finite.
fn finite(reading: Result<f64, HalError>) -> Result<f64, SwerveCtrlError> {
    match reading {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(v) => Err(SwerveCtrlError::SensorFault(HalError::OutOfRange(v))),
        Err(e) => Err(SwerveCtrlError::SensorFault(e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{SimAbsEncoder, SimMotor};
    use std::f64::consts::{FRAC_PI_2, PI};

    const DT_S: f64 = 0.02;

    type SimCtrl = SwerveCtrl<SimMotor, SimMotor, SimAbsEncoder>;

    struct Rig {
        ctrl: SimCtrl,
        drv: SimMotor,
        str: SimMotor,
        abs: SimAbsEncoder,
    }

    fn params() -> Params {
        Params {
            drv_act_id: 1,
            str_act_id: 2,
            drv_reversed: false,
            str_reversed: false,
            abs_enc_id: 0,
            abs_enc_offset_rad: 0.0,
            abs_enc_reversed: false,
            max_speed_ms: 4.0,
            deadband_ms: 0.001,
            str_k_p: 0.5,
            str_k_i: 0.0,
            str_k_d: 0.0,
            str_integral_limit: 1.0,
        }
    }

    fn rig_with(params: Params, abs: SimAbsEncoder) -> Rig {
        let drv = SimMotor::new(5000.0);
        let str = SimMotor::new(100.0);
        let ctrl = SwerveCtrl::new(params, drv.clone(), str.clone(), abs.clone()).unwrap();

        Rig { ctrl, drv, str, abs }
    }

    /// Rig whose absolute encoder reads a quarter turn.
    fn rig() -> Rig {
        rig_with(params(), SimAbsEncoder::new(1.25, 5.0))
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_calibration_seeds_heading() {
        let mut r = rig();

        assert_eq!(r.ctrl.mode(), ModuleMode::Calibrated);
        assert_close(r.ctrl.get_state().unwrap().heading_rad, FRAC_PI_2);
        assert_eq!(r.ctrl.get_state().unwrap().drv_pos_m, 0.0);

        let snap = r.ctrl.calibration().unwrap();
        assert_eq!(snap.ratio, 0.25);
        assert_close(snap.heading_rad, FRAC_PI_2);
    }

    #[test]
    fn test_calibration_fault_leaves_uninitialised() {
        let abs = SimAbsEncoder::new(1.25, 5.0);
        abs.set_fault(Some(HalError::Disconnected));
        let mut r = rig_with(params(), abs);

        assert_eq!(r.ctrl.mode(), ModuleMode::Uninitialised);
        assert!(r.ctrl.calibration().is_none());
        assert_eq!(
            r.ctrl.set_desired_state(DesiredState::new(1.0, 0.0), DT_S),
            Err(SwerveCtrlError::NotCalibrated)
        );
        assert_eq!(r.drv.num_writes(), 0);
        assert_eq!(r.str.num_writes(), 0);

        // Still failing
        assert!(r.ctrl.reset_encoders().is_err());
        assert_eq!(r.ctrl.mode(), ModuleMode::Uninitialised);

        // Retry once the sensor is back
        r.abs.set_fault(None);
        r.ctrl.reset_encoders().unwrap();
        assert_eq!(r.ctrl.mode(), ModuleMode::Calibrated);
        assert!(r.ctrl.set_desired_state(DesiredState::new(1.0, FRAC_PI_2), DT_S).is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.max_speed_ms = 0.0;
        let e = SwerveCtrl::new(p, SimMotor::new(1.0), SimMotor::new(1.0), SimAbsEncoder::new(0.0, 5.0));
        assert!(matches!(e, Err(SwerveCtrlError::ConfigurationError(_))));

        let mut p = params();
        p.abs_enc_offset_rad = 3.5;
        let e = SwerveCtrl::new(p, SimMotor::new(1.0), SimMotor::new(1.0), SimAbsEncoder::new(0.0, 5.0));
        assert!(matches!(e, Err(SwerveCtrlError::ConfigurationError(_))));
    }

    #[test]
    fn test_set_desired_state_commands() {
        let mut r = rig();

        // Heading is pi/2, demand pi/2 + 0.2 at 2 m/s
        let t = r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2 + 0.2), DT_S).unwrap();

        assert_eq!(r.ctrl.mode(), ModuleMode::Active);
        assert_eq!(t.mode, ModuleMode::Active);
        assert_eq!(t.drv_cmd, 0.5);
        assert_close(t.str_cmd, 0.1);
        assert_eq!(r.drv.output(), 0.5);
        assert_close(r.str.output(), 0.1);
        assert_eq!(r.ctrl.telemetry(), t);
    }

    #[test]
    fn test_set_desired_state_optimises() {
        let mut r = rig();

        // Demand the opposite way to the current heading: drive backwards, no steer
        let t = r.ctrl.set_desired_state(DesiredState::new(2.0, -FRAC_PI_2), DT_S).unwrap();

        assert_eq!(t.target_speed_ms, -2.0);
        assert_close(t.target_heading_rad, FRAC_PI_2);
        assert_eq!(r.drv.output(), -0.5);
        assert_close(r.str.output(), 0.0);
    }

    #[test]
    fn test_deadband_stops() {
        let mut r = rig();

        r.ctrl.set_desired_state(DesiredState::new(2.0, 0.3), DT_S).unwrap();
        assert_ne!(r.drv.output(), 0.0);
        assert_ne!(r.str.output(), 0.0);

        for &heading in [0.0, 1.0, -2.5, 100.0].iter() {
            let t = r.ctrl.set_desired_state(DesiredState::new(0.0005, heading), DT_S).unwrap();
            assert_eq!(r.ctrl.mode(), ModuleMode::Idle);
            assert_eq!(t.drv_cmd, 0.0);
            assert_eq!(t.str_cmd, 0.0);
            assert_eq!(r.drv.output(), 0.0);
            assert_eq!(r.str.output(), 0.0);
        }
    }

    #[test]
    fn test_idle_to_active() {
        let mut r = rig();

        r.ctrl.stop().unwrap();
        assert_eq!(r.ctrl.mode(), ModuleMode::Idle);

        // Stop is idempotent
        r.ctrl.stop().unwrap();
        assert_eq!(r.ctrl.mode(), ModuleMode::Idle);

        r.ctrl.set_desired_state(DesiredState::new(-1.0, FRAC_PI_2), DT_S).unwrap();
        assert_eq!(r.ctrl.mode(), ModuleMode::Active);
    }

    #[test]
    fn test_stop_clears_windup() {
        let mut p = params();
        p.str_k_p = 0.0;
        p.str_k_i = 1.0;
        p.str_integral_limit = 10.0;

        let mut r = rig_with(p.clone(), SimAbsEncoder::new(1.25, 5.0));
        let mut fresh = rig_with(p, SimAbsEncoder::new(1.25, 5.0));

        // Wind up the integral with the steer motor held still
        for _ in 0..50 {
            r.ctrl.set_desired_state(DesiredState::new(1.0, FRAC_PI_2 + 0.5), DT_S).unwrap();
        }
        assert!(r.str.output() > 0.4);

        r.ctrl.stop().unwrap();

        let demand = DesiredState::new(1.0, FRAC_PI_2 + 0.5);
        let resumed = r.ctrl.set_desired_state(demand, DT_S).unwrap();
        let first = fresh.ctrl.set_desired_state(demand, DT_S).unwrap();

        assert_eq!(resumed.str_cmd, first.str_cmd);
        assert_close(resumed.str_cmd, 0.5 * DT_S);
    }

    #[test]
    fn test_get_state_fault_leaves_outputs() {
        let mut r = rig();

        r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2 + 0.2), DT_S).unwrap();
        let drv_out = r.drv.output();
        let str_out = r.str.output();
        let drv_writes = r.drv.num_writes();

        r.str.set_read_fault(Some(HalError::Timeout));
        assert_eq!(
            r.ctrl.get_state(),
            Err(SwerveCtrlError::SensorFault(HalError::Timeout))
        );

        assert_eq!(r.drv.output(), drv_out);
        assert_eq!(r.str.output(), str_out);
        assert_eq!(r.drv.num_writes(), drv_writes);
        assert_eq!(r.ctrl.mode(), ModuleMode::Active);
    }

    #[test]
    fn test_set_desired_state_sensor_fault_fails_safe() {
        let mut r = rig();

        r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2 + 0.2), DT_S).unwrap();
        r.str.set_read_fault(Some(HalError::Timeout));

        assert_eq!(
            r.ctrl.set_desired_state(DesiredState::new(2.0, 0.0), DT_S),
            Err(SwerveCtrlError::SensorFault(HalError::Timeout))
        );
        assert_eq!(r.drv.output(), 0.0);
        assert_eq!(r.str.output(), 0.0);
        assert_eq!(r.ctrl.mode(), ModuleMode::Active);

        // Telemetry reports what was actually issued
        let t = r.ctrl.telemetry();
        assert_eq!(t.mode, ModuleMode::Active);
        assert_eq!(t.target_speed_ms, 0.0);
        assert_eq!(t.drv_cmd, 0.0);
        assert_eq!(t.str_cmd, 0.0);

        // Recovers next cycle
        r.str.set_read_fault(None);
        assert!(r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2), DT_S).is_ok());
        assert_eq!(r.drv.output(), 0.5);
    }

    #[test]
    fn test_non_finite_steer_reading_fails_safe() {
        let mut r = rig();
        let demand = DesiredState::new(2.0, FRAC_PI_2 + 0.2);

        r.ctrl.set_desired_state(demand, DT_S).unwrap();
        assert_eq!(r.drv.output(), 0.5);

        let mut str_enc = r.str.clone();
        str_enc.set_position(f64::NAN).unwrap();

        assert!(matches!(
            r.ctrl.get_state(),
            Err(SwerveCtrlError::SensorFault(HalError::OutOfRange(_)))
        ));
        assert!(matches!(
            r.ctrl.set_desired_state(demand, DT_S),
            Err(SwerveCtrlError::SensorFault(HalError::OutOfRange(_)))
        ));
        assert_eq!(r.drv.output(), 0.0);
        assert_eq!(r.str.output(), 0.0);
        assert_eq!(r.ctrl.telemetry().drv_cmd, 0.0);

        str_enc.set_position(f64::INFINITY).unwrap();
        assert!(r.ctrl.set_desired_state(demand, DT_S).is_err());

        // The steer servo is not left holding a bad value once the encoder recovers
        str_enc.set_position(FRAC_PI_2).unwrap();
        let t = r.ctrl.set_desired_state(demand, DT_S).unwrap();
        assert!(t.str_cmd.is_finite());
        assert_close(t.str_cmd, 0.1);
        assert_eq!(r.drv.output(), 0.5);
    }

    #[test]
    fn test_steer_write_fault_zeroes_drive() {
        let mut r = rig();

        r.str.set_write_fault(Some(HalError::Disconnected));
        assert_eq!(
            r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2 + 0.2), DT_S),
            Err(SwerveCtrlError::ActuatorFault(HalError::Disconnected))
        );

        assert_eq!(r.drv.output(), 0.0);
        assert_eq!(r.ctrl.mode(), ModuleMode::Calibrated);
        assert_eq!(r.ctrl.telemetry().drv_cmd, 0.0);
    }

    #[test]
    fn test_calibration_drive_fault_seeds_heading() {
        let mut r = rig();

        r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2), DT_S).unwrap();
        r.drv.step(1.0);
        r.ctrl.stop().unwrap();

        r.abs.set_raw_angle(PI / 4.0);
        r.drv.set_write_fault(Some(HalError::Timeout));
        assert_eq!(
            r.ctrl.reset_encoders(),
            Err(SwerveCtrlError::SensorFault(HalError::Timeout))
        );

        // Heading and snapshot agree, the drive position is not zeroed
        let state = r.ctrl.get_state().unwrap();
        assert_close(state.heading_rad, PI / 4.0);
        assert_close(r.ctrl.calibration().unwrap().heading_rad, PI / 4.0);
        assert!(state.drv_pos_m > 0.0);
    }

    #[test]
    fn test_actuator_fault_propagates() {
        let mut r = rig();

        r.drv.set_write_fault(Some(HalError::Bus("CAN error".into())));
        assert_eq!(
            r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2), DT_S),
            Err(SwerveCtrlError::ActuatorFault(HalError::Bus("CAN error".into())))
        );

        // Stop still zeroes the steer motor and reports the fault
        assert!(matches!(r.ctrl.stop(), Err(SwerveCtrlError::ActuatorFault(_))));
        assert_eq!(r.str.output(), 0.0);
        assert_eq!(r.ctrl.mode(), ModuleMode::Idle);
    }

    #[test]
    fn test_reset_encoders() {
        let mut r = rig();

        // Drive the wheel forward a little, then move the module by hand
        r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2), DT_S).unwrap();
        r.drv.step(1.0);
        assert!(r.ctrl.get_state().unwrap().drv_pos_m > 0.0);

        assert_eq!(
            r.ctrl.reset_encoders(),
            Err(SwerveCtrlError::InvalidStateTransition {
                mode: ModuleMode::Active,
                op: "reset encoders"
            })
        );

        r.ctrl.stop().unwrap();
        r.abs.set_raw_angle(PI / 4.0);
        r.ctrl.reset_encoders().unwrap();

        let state = r.ctrl.get_state().unwrap();
        assert_eq!(r.ctrl.mode(), ModuleMode::Idle);
        assert_eq!(state.drv_pos_m, 0.0);
        assert_close(state.heading_rad, PI / 4.0);
    }

    #[test]
    fn test_reversed_axes() {
        let mut p = params();
        p.drv_reversed = true;
        p.str_reversed = true;
        let mut r = rig_with(p, SimAbsEncoder::new(1.25, 5.0));

        // The raw steer encoder is seeded negated, the module still reads pi/2
        assert_close(r.ctrl.get_state().unwrap().heading_rad, FRAC_PI_2);

        let t = r.ctrl.set_desired_state(DesiredState::new(2.0, FRAC_PI_2 + 0.2), DT_S).unwrap();
        assert_eq!(t.drv_cmd, 0.5);
        assert_close(t.str_cmd, 0.1);
        assert_eq!(r.drv.output(), -0.5);
        assert_close(r.str.output(), -0.1);
    }

    #[test]
    fn test_non_finite_demand_stops() {
        let mut r = rig();

        r.ctrl.set_desired_state(DesiredState::new(2.0, 0.3), DT_S).unwrap();
        r.ctrl.set_desired_state(DesiredState::new(f64::NAN, 0.3), DT_S).unwrap();

        assert_eq!(r.ctrl.mode(), ModuleMode::Idle);
        assert_eq!(r.drv.output(), 0.0);
    }
}
