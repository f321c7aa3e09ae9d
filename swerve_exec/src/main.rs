//! Swerve module executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single swerve module against simulated hardware at a
//! fixed rate:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the simulated motors and absolute encoder, and the module
//!       controller (which calibrates itself on construction)
//!     - Main loop:
//!         - Get the demand for this cycle from the script
//!         - Module state acquisition
//!         - Module control processing
//!         - Simulation step
//!         - Archive writing
//!     - Stop the module once the script has finished

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use swerve_lib::{
    hal::Scaled,
    params::SwerveExecParams,
    sim::{SimAbsEncoder, SimMotor},
    swerve_ctrl::{self, ModuleMode, ModuleState, ModuleTelemetry, SwerveCtrl, SwerveCtrlError},
};
use util::{
    archive::{Archived, Archiver},
    logger::{logger_init, parse_level},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time to keep running after the last scripted demand starts.
const SCRIPT_HOLD_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "swerve_exec", about = "Run a swerve module against simulated hardware")]
struct Args {
    /// Executable parameter file, relative to the params directory
    #[structopt(long, default_value = "swerve_exec.toml")]
    exec_params: String,

    /// Module parameter file, relative to the params directory
    #[structopt(long, default_value = "swerve_module.toml")]
    module_params: String,

    /// Sessions directory, relative to the software root
    #[structopt(long, default_value = "sessions")]
    sessions_dir: String,

    /// Minimum log level (info, debug or trace)
    #[structopt(long, default_value = "debug")]
    log_level: String,
}

/// Per-cycle record written to the archive.
///
/// Kept flat as the CSV writer cannot serialise nested structs.
#[derive(Serialize)]
struct CycleRecord {
    time_s: f64,
    cycle: u64,
    mode: ModuleMode,
    drv_pos_m: f64,
    drv_vel_ms: f64,
    heading_rad: f64,
    str_vel_rads: f64,
    target_speed_ms: f64,
    target_heading_rad: f64,
    drv_cmd: f64,
    str_cmd: f64,
}

/// Archives written by the executable.
struct CycleArchive {
    arch_cycle: Archiver,
    record: Option<CycleRecord>,
}

impl CycleRecord {
    fn new(cycle: u64, state: &ModuleState, telemetry: &ModuleTelemetry) -> Self {
        Self {
            time_s: session::get_elapsed_seconds(),
            cycle,
            mode: telemetry.mode,
            drv_pos_m: state.drv_pos_m,
            drv_vel_ms: state.drv_vel_ms,
            heading_rad: state.heading_rad,
            str_vel_rads: state.str_vel_rads,
            target_speed_ms: telemetry.target_speed_ms,
            target_heading_rad: telemetry.target_heading_rad,
            drv_cmd: telemetry.drv_cmd,
            str_cmd: telemetry.str_cmd,
        }
    }
}

impl Archived for CycleArchive {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(record) = self.record.take() {
            self.arch_cycle.serialise(record)?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("swerve_exec", &args.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level = parse_level(&args.log_level)
        .wrap_err("Invalid log level")?;
    logger_init(log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Swerve Module Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let exec_params: SwerveExecParams = util::params::load(&args.exec_params)
        .wrap_err("Could not load exec params")?;
    exec_params.are_valid()
        .map_err(|e| eyre!(e))
        .wrap_err("Invalid exec params")?;

    let module_params: swerve_ctrl::Params = util::params::load(&args.module_params)
        .wrap_err("Could not load module params")?;

    info!("Parameters loaded");

    // ---- INITIALISE HARDWARE ----

    let drv_motor = SimMotor::new(exec_params.sim_drv_free_speed_rpm);
    let str_motor = SimMotor::new(exec_params.sim_str_free_speed_rpm);
    let abs_enc = SimAbsEncoder::new(0.0, exec_params.sim_abs_reference_v);
    abs_enc.set_raw_angle(exec_params.sim_abs_initial_rad);

    info!("Simulated hardware initialised");

    // ---- INITIALISE MODULE ----

    let mut ctrl = SwerveCtrl::new(
        module_params,
        Scaled::drive(drv_motor.clone(), &exec_params.conversion),
        Scaled::steer(str_motor.clone(), &exec_params.conversion),
        abs_enc,
    ).wrap_err("Failed to initialise SwerveCtrl")?;

    session.save_json("module_params.json", ctrl.params())
        .wrap_err("Could not save the module params")?;
    if let Some(cal) = ctrl.calibration() {
        session.save_json("calibration.json", &cal)
            .wrap_err("Could not save the calibration snapshot")?;
    }

    let mut archive = CycleArchive {
        arch_cycle: Archiver::from_path(&session, "cycle.csv")
            .map_err(|e| eyre!("{}", e))
            .wrap_err("Could not create the cycle archive")?,
        record: None,
    };

    info!("SwerveCtrl init complete, mode {:?}\n", ctrl.mode());

    // ---- MAIN LOOP ----

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let end_s = exec_params.script_end_s() + SCRIPT_HOLD_S;
    let mut num_cycles: u64 = 0;
    let mut num_consec_cycle_overruns: u64 = 0;

    info!("Begining main loop ({:.02} s)\n", end_s);

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let t_s = num_cycles as f64 * exec_params.cycle_period_s;
        if t_s > end_s {
            info!("End of script reached, stopping");
            break
        }

        // ---- DATA INPUT ----

        let demand = exec_params.demand_at(t_s).unwrap_or_default();

        let state = match ctrl.get_state() {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Could not get the module state: {}", e);
                None
            }
        };

        // ---- CONTROL PROCESSING ----

        match ctrl.set_desired_state(demand, exec_params.cycle_period_s) {
            Ok(_) => (),
            Err(SwerveCtrlError::NotCalibrated) => {
                warn!("Module not calibrated, retrying");
                if let Err(e) = ctrl.reset_encoders() {
                    warn!("Calibration retry failed: {}", e);
                }
            },
            Err(SwerveCtrlError::SensorFault(e)) => {
                // Outputs have already been zeroed, try again next cycle
                warn!("Sensor fault during SwerveCtrl processing: {}", e)
            },
            Err(e) => {
                error!("SwerveCtrl processing error: {}", e);
                if let Err(se) = ctrl.stop() {
                    error!("Could not stop the module: {}", se);
                }
                return Err(e).wrap_err("Module control failed");
            }
        }

        // ---- SIMULATION ----

        drv_motor.step(exec_params.cycle_period_s);
        str_motor.step(exec_params.cycle_period_s);

        // ---- WRITE ARCHIVES ----

        if let Some(state) = state {
            archive.record = Some(CycleRecord::new(num_cycles, &state, &ctrl.telemetry()));
        }

        if let Err(e) = archive.write() {
            warn!("Could not write the cycle archive: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                num_consec_cycle_overruns += 1;
                warn!(
                    "Cycle overran by {:.06} s ({} consecutive)",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64(),
                    num_consec_cycle_overruns
                );
            }
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    ctrl.stop().wrap_err("Failed to stop the module")?;

    match ctrl.get_state() {
        Ok(s) => info!(
            "Final state: position {:.3} m, heading {:.3} rad",
            s.drv_pos_m, s.heading_rad
        ),
        Err(e) => warn!("Could not get the final module state: {}", e)
    }

    info!("End of execution ({} cycles)", num_cycles);

    Ok(())
}
