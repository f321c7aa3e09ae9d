//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle into the range (-pi, pi].
///
/// Angles already inside the range are returned untouched, so wrapping is exactly idempotent.
/// Non-finite angles are returned as NaN.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    if angle > -pi_t && angle <= pi_t {
        return angle;
    }

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    if wrapped <= -pi_t {
        wrapped + tau_t
    }
    else {
        wrapped
    }
}

/// Get the shortest signed angular distance from `from` to `to`.
///
/// The result is in (-pi, pi], so two angles exactly half a turn apart give a distance of +pi.
/// Inputs may be in any range.
pub fn get_ang_dist_pi<T>(from: T, to: T) -> T
where
    T: Float
{
    wrap_pi(to - from)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
/// This result is not an element of the function's codomain, but it is the
/// closest floating point number in the real numbers and thus fulfills the
/// property `self == self.div_euclid(rhs) * rhs + self.rem_euclid(rhs)`
/// approximatively.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() { r + rhs.abs() } else { r }
}
