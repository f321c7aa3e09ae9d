//! Angle optimisation of module demands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};

pub use util::maths::{get_ang_dist_pi, wrap_pi};

use super::DesiredState;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Optimise a demand against the module's current heading.
///
/// If reaching the demanded heading needs more than a quarter turn the wheel
/// is instead pointed the opposite way and driven backwards, so no demand
/// ever needs more than pi/2 of steering travel. A demand exactly a quarter
/// turn away is not flipped.
///
/// The returned heading is always in (-pi, pi].
pub fn optimise(desired: DesiredState, current_heading_rad: f64) -> DesiredState {
    let heading_rad = wrap_pi(desired.heading_rad);
    let delta_rad = get_ang_dist_pi(current_heading_rad, heading_rad);

    if delta_rad.abs() > FRAC_PI_2 {
        DesiredState {
            speed_ms: -desired.speed_ms,
            heading_rad: wrap_pi(heading_rad + PI),
        }
    }
    else {
        DesiredState {
            speed_ms: desired.speed_ms,
            heading_rad,
        }
    }
}
