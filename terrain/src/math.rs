//! Order-statistic selection and windowed linear regression over evenly
//! spaced samples. Both propagation models lean on these for terrain
//! statistics, so they live here rather than in either model crate.

/// Selects the value with exactly `rank` strictly greater elements,
/// i.e. element `rank` of the buffer sorted in descending order.
///
/// Hoare-like partition in place; the buffer is permuted. `rank` is
/// clamped to the buffer bounds. The buffer must not be empty.
pub fn quantile(buf: &mut [f64], rank: usize) -> f64 {
    let last = buf.len() as isize - 1;
    let mut m: isize = 0;
    let mut n: isize = last;
    let k = (rank as isize).clamp(0, n);
    let mut q = buf[k as usize];
    let mut i0 = m;
    let mut j1 = n;
    let mut repartition = false;

    loop {
        if repartition {
            q = buf[k as usize];
            i0 = m;
            j1 = n;
        }
        let mut i = i0;
        while i <= n && buf[i as usize] >= q {
            i += 1;
        }
        if i > n {
            i = n;
        }
        let mut j = j1;
        while j >= m && buf[j as usize] <= q {
            j -= 1;
        }
        if j < m {
            j = m;
        }
        if i < j {
            buf.swap(i as usize, j as usize);
            i0 = i + 1;
            j1 = j - 1;
            repartition = false;
        } else if i < k {
            buf[k as usize] = buf[i as usize];
            buf[i as usize] = q;
            m = i + 1;
            repartition = true;
        } else if j > k {
            buf[k as usize] = buf[j as usize];
            buf[j as usize] = q;
            n = j - 1;
            repartition = true;
        } else {
            return q;
        }
    }
}

/// Least-squares line over the sample window `[x1, x2]` (same units as
/// `step`), returning the fitted values at sample 0 and at the last
/// sample.
///
/// Window endpoints snap to sample indices; a snapped window of zero or
/// negative length is widened by one sample on each side. The slope
/// uses the closed form for evenly spaced abscissae.
pub fn least_squares(step: f64, samples: &[f64], x1: f64, x2: f64) -> (f64, f64) {
    let xn = (samples.len() - 1) as f64;
    let mut xa = (x1 / step).max(0.0).trunc();
    let mut xb = xn - (xn - x2 / step).max(0.0).trunc();
    if xb <= xa {
        xa = (xa - 1.0).max(0.0);
        xb = xn - (xn - (xb + 1.0)).max(0.0);
    }

    let mut ja = xa as usize;
    let jb = xb as usize;
    let n = jb - ja;
    xa = xb - xa;
    let mut x = -0.5 * xa;
    xb += x;
    let mut a = 0.5 * (samples[ja] + samples[jb]);
    let mut b = 0.5 * (samples[ja] - samples[jb]) * x;
    for _ in 2..=n {
        ja += 1;
        x += 1.0;
        a += samples[ja];
        b += samples[ja] * x;
    }
    a /= xa;
    b = b * 12.0 / ((xa * xa + 2.0) * xa);

    (a - b * xb, a + b * (xn - xb))
}

#[cfg(test)]
mod tests {
    use super::{least_squares, quantile};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quantile_median() {
        let mut buf = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0];
        assert_eq!(quantile(&mut buf, 5), 4.0);
    }

    #[test]
    fn test_quantile_matches_descending_sort_at_every_rank() {
        let data = [7.0, -2.0, 3.5, 3.5, 0.0, 12.0, 8.25, -9.0, 1.0];
        let mut sorted = data;
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        for (rank, &expected) in sorted.iter().enumerate() {
            let mut buf = data;
            assert_eq!(quantile(&mut buf, rank), expected);
        }
    }

    #[test]
    fn test_quantile_extremes() {
        let mut buf = [2.0, -1.0, 7.0];
        assert_eq!(quantile(&mut buf, 0), 7.0);
        let mut buf = [2.0, -1.0, 7.0];
        assert_eq!(quantile(&mut buf, 2), -1.0);
        // Out-of-range ranks clamp.
        let mut buf = [2.0, -1.0, 7.0];
        assert_eq!(quantile(&mut buf, 99), -1.0);
    }

    #[test]
    fn test_least_squares_exact_on_linear_input() {
        let step = 25.0;
        let samples: Vec<f64> = (0..=40).map(|i| 3.0 + 0.5 * (i as f64)).collect();
        let (z0, zn) = least_squares(step, &samples, 0.0, 1000.0);
        assert_abs_diff_eq!(z0, 3.0, epsilon = 1e-9 * 20.0);
        assert_abs_diff_eq!(zn, 23.0, epsilon = 1e-9 * 20.0);
    }

    #[test]
    fn test_least_squares_partial_window_extrapolates_line() {
        // Fit only over [250, 750]; a linear profile still extrapolates
        // exactly to both endpoints.
        let step = 25.0;
        let samples: Vec<f64> = (0..=40).map(|i| 10.0 - 0.25 * (i as f64)).collect();
        let (z0, zn) = least_squares(step, &samples, 250.0, 750.0);
        assert_abs_diff_eq!(z0, 10.0, epsilon = 1e-9 * 20.0);
        assert_abs_diff_eq!(zn, 0.0, epsilon = 1e-9 * 20.0);
    }

    #[test]
    fn test_least_squares_degenerate_window_widens() {
        // x1 == x2 snaps to an empty window which must widen instead of
        // dividing by zero.
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (z0, zn) = least_squares(1.0, &samples, 2.0, 2.0);
        assert_abs_diff_eq!(z0, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(zn, 5.0, epsilon = 1e-9);
    }
}
