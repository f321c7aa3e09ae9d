//! # Simulated hardware
//!
//! Simple stand-ins for a brushless motor controller with an integrated
//! encoder and an analog absolute encoder. Handles are cheap to clone and all
//! clones share one device, so a test (or the executable) can keep a handle
//! to inspect outputs and inject faults after the controller has taken
//! ownership of its own copy.
//!
//! The simulation is single threaded, matching the control loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, rc::Rc};

use crate::hal::{HalError, NormalizedActuator, PositionVelocitySource, RatioSensor};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated motor controller with an integrated relative encoder.
///
/// The encoder reports rotations and RPM.
#[derive(Clone, Debug, Default)]
pub struct SimMotor {
    dev: Rc<RefCell<SimMotorState>>,
}

/// A simulated analog absolute encoder.
#[derive(Clone, Debug)]
pub struct SimAbsEncoder {
    dev: Rc<RefCell<SimAbsEncoderState>>,
}

#[derive(Debug, Default)]
struct SimMotorState {
    /// Last commanded output, between -1 and +1
    output: f64,

    /// Number of successful writes
    num_writes: u64,

    /// Speed at full output.
    ///
    /// Units: RPM
    free_speed_rpm: f64,

    /// Units: rotations
    position_rot: f64,

    /// Units: RPM
    velocity_rpm: f64,

    read_fault: Option<HalError>,
    write_fault: Option<HalError>,
}

#[derive(Debug)]
struct SimAbsEncoderState {
    sample_v: f64,
    reference_v: f64,
    fault: Option<HalError>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimMotor {
    /// Create a new motor which turns at `free_speed_rpm` at full output.
    pub fn new(free_speed_rpm: f64) -> Self {
        Self {
            dev: Rc::new(RefCell::new(SimMotorState {
                free_speed_rpm,
                ..Default::default()
            })),
        }
    }

    /// The last command written to the motor.
    pub fn output(&self) -> f64 {
        self.dev.borrow().output
    }

    /// The number of commands successfully written to the motor.
    pub fn num_writes(&self) -> u64 {
        self.dev.borrow().num_writes
    }

    /// Make every subsequent encoder read fail with `fault`, or clear the fault with `None`.
    pub fn set_read_fault(&self, fault: Option<HalError>) {
        self.dev.borrow_mut().read_fault = fault;
    }

    /// Make every subsequent write fail with `fault`, or clear the fault with `None`.
    pub fn set_write_fault(&self, fault: Option<HalError>) {
        self.dev.borrow_mut().write_fault = fault;
    }

    /// Advance the motor by `dt_s` seconds at its current output.
    pub fn step(&self, dt_s: f64) {
        let mut dev = self.dev.borrow_mut();
        let velocity_rpm = dev.output * dev.free_speed_rpm;
        let position_rot = dev.position_rot + velocity_rpm / 60.0 * dt_s;
        dev.velocity_rpm = velocity_rpm;
        dev.position_rot = position_rot;
    }
}

impl NormalizedActuator for SimMotor {
    fn set(&mut self, command: f64) -> Result<(), HalError> {
        let mut dev = self.dev.borrow_mut();

        if let Some(ref e) = dev.write_fault {
            return Err(e.clone());
        }
        if !(-1.0..=1.0).contains(&command) {
            return Err(HalError::OutOfRange(command));
        }

        dev.output = command;
        dev.num_writes += 1;

        Ok(())
    }
}

impl PositionVelocitySource for SimMotor {
    fn position(&mut self) -> Result<f64, HalError> {
        let dev = self.dev.borrow();
        match dev.read_fault {
            Some(ref e) => Err(e.clone()),
            None => Ok(dev.position_rot),
        }
    }

    fn velocity(&mut self) -> Result<f64, HalError> {
        let dev = self.dev.borrow();
        match dev.read_fault {
            Some(ref e) => Err(e.clone()),
            None => Ok(dev.velocity_rpm),
        }
    }

    fn set_position(&mut self, position: f64) -> Result<(), HalError> {
        let mut dev = self.dev.borrow_mut();

        if let Some(ref e) = dev.write_fault {
            return Err(e.clone());
        }

        dev.position_rot = position;

        Ok(())
    }
}

impl SimAbsEncoder {
    /// Create an encoder reading `sample_v` volts against a `reference_v` supply.
    pub fn new(sample_v: f64, reference_v: f64) -> Self {
        Self {
            dev: Rc::new(RefCell::new(SimAbsEncoderState {
                sample_v,
                reference_v,
                fault: None,
            })),
        }
    }

    /// Set the sampled voltage.
    pub fn set_sample_v(&self, sample_v: f64) {
        self.dev.borrow_mut().sample_v = sample_v;
    }

    /// Set the sampled voltage so that the sensor reads the given raw angle, in radians.
    pub fn set_raw_angle(&self, angle_rad: f64) {
        let mut dev = self.dev.borrow_mut();
        let ratio = util::maths::rem_euclid(angle_rad, std::f64::consts::TAU)
            / std::f64::consts::TAU;
        let sample_v = ratio * dev.reference_v;
        dev.sample_v = sample_v;
    }

    /// Make every subsequent read fail with `fault`, or clear the fault with `None`.
    pub fn set_fault(&self, fault: Option<HalError>) {
        self.dev.borrow_mut().fault = fault;
    }
}

impl RatioSensor for SimAbsEncoder {
    fn sample_v(&mut self) -> Result<f64, HalError> {
        let dev = self.dev.borrow();
        match dev.fault {
            Some(ref e) => Err(e.clone()),
            None => Ok(dev.sample_v),
        }
    }

    fn reference_v(&mut self) -> Result<f64, HalError> {
        Ok(self.dev.borrow().reference_v)
    }
}
