//! Condensed storage of a strict lower-triangular pairwise matrix.
//!
//! Pairs `(row, col)` with `row > col` are laid out row by row:
//! `(1,0), (2,0), (2,1), (3,0), (3,1), (3,2), ...`, so an `n × n` matrix
//! needs `n·(n−1)/2` slots.

/// Length of the condensed form for `n` items.
#[inline]
pub fn condensed_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Recovers `(row, col)` from a condensed index.
///
/// `t = floor((sqrt(8k+1) − 1) / 2)` is the largest `t` with
/// `t·(t+1)/2 ≤ k`; then `row = t + 1` and `col = k − t·(t+1)/2`. The
/// floating-point estimate is corrected with exact integer arithmetic so
/// large indices cannot land in the wrong row.
pub fn condensed_to_pair(k: usize) -> (usize, usize) {
    let mut t = ((((8 * k + 1) as f64).sqrt() - 1.0) / 2.0).floor() as usize;
    while t > 0 && triangle(t) > k {
        t -= 1;
    }
    while triangle(t + 1) <= k {
        t += 1;
    }
    (t + 1, k - triangle(t))
}

#[inline]
fn triangle(t: usize) -> usize {
    t * (t + 1) / 2
}
