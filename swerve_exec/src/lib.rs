//! # Swerve module library.
//!
//! This library allows other crates in the workspace (and the benches) to access items defined
//! inside the swerve executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Hardware capability interfaces - the narrow traits the controller drives hardware through
pub mod hal;

/// Executable parameters
pub mod params;

/// Simulated hardware - motors and an absolute encoder for running without a robot
pub mod sim;

/// Swerve module control - converts a desired speed and heading into drive and steer commands
pub mod swerve_ctrl;
