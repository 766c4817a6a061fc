//! Scalar potential terms used by the reference evaluator.
//!
//! Each function returns the energy together with its derivative with respect
//! to the distance argument, so callers can assemble Cartesian gradients by
//! the chain rule.

/// Harmonic distance restraint `k·(r − r0)²`.
#[inline]
pub fn harmonic(dist: f64, ideal: f64, force_constant: f64) -> (f64, f64) {
    let delta = dist - ideal;
    (force_constant * delta * delta, 2.0 * force_constant * delta)
}

/// One-sided wall `k·(r_c − r)²` active only below the contact distance.
#[inline]
pub fn repulsive_wall(dist: f64, contact: f64, force_constant: f64) -> (f64, f64) {
    if dist >= contact {
        return (0.0, 0.0);
    }
    let overlap = contact - dist;
    (
        force_constant * overlap * overlap,
        -2.0 * force_constant * overlap,
    )
}

/// Flat-bottom spring `½·k·(d − d_max)²`, zero while `d ≤ d_max`.
#[inline]
pub fn flat_bottom_spring(displacement: f64, max_displacement: f64, force_constant: f64) -> (f64, f64) {
    if displacement <= max_displacement {
        return (0.0, 0.0);
    }
    let excess = displacement - max_displacement;
    (
        0.5 * force_constant * excess * excess,
        force_constant * excess,
    )
}
