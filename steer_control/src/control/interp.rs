//! Piecewise-linear interpolation over a breakpoint table.
//!
//! Clamps outside the breakpoint range (no extrapolation).

/// Linear interpolation of `x` over the table `(xp, fp)`.
///
/// `xp` must be ascending. Values below `xp[0]` return `fp[0]`, values
/// above the last breakpoint return the last `fp`. An empty table yields 0.
#[inline]
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return 0.0;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }

    // First breakpoint strictly above x; always in 1..n here.
    let hi = xp[..n].partition_point(|&b| b <= x);
    let lo = hi - 1;
    let span = xp[hi] - xp[lo];
    if span <= 0.0 {
        return fp[hi];
    }
    let slope = (fp[hi] - fp[lo]) / span;
    slope * (x - xp[lo]) + fp[lo]
}

// ─── Tests ──────────────────────────────────────────────────────────
