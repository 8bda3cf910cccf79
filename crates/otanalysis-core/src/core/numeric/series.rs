/// Arithmetic mean; `NaN` for an empty slice.
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (`n - 1` denominator); `NaN` below two samples.
pub fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

#[inline]
pub fn head(values: &[f64], n: usize) -> &[f64] {
    &values[..n.min(values.len())]
}

#[inline]
pub fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Index of the first maximum, ignoring `NaN`.
pub fn argmax(values: &[f64]) -> Option<usize> {
    extremum(values, |candidate, best| candidate > best)
}

/// Index of the first minimum, ignoring `NaN`.
pub fn argmin(values: &[f64]) -> Option<usize> {
    extremum(values, |candidate, best| candidate < best)
}

fn extremum(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// `n` evenly spaced samples over `[start, end]`, both ends included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Centered finite-difference derivative of `values` over `time`.
///
/// An even `window` is reduced by one; the half-width edges are padded with
/// the nearest computed value so the output has the input length.
pub fn derivative(values: &[f64], time: &[f64], window: usize) -> Vec<f64> {
    let n = values.len().min(time.len());
    let window = if window % 2 == 0 {
        window.saturating_sub(1)
    } else {
        window
    };
    let half = window / 2;
    if half == 0 || n <= 2 * half {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    for i in half..n - half {
        let dt = time[i + half] - time[i - half];
        let dv = values[i + half] - values[i - half];
        out.push(if dt != 0.0 { dv / dt } else { 0.0 });
    }
    let first = out[0];
    let last = out[out.len() - 1];
    let mut padded = vec![first; half];
    padded.extend(out);
    padded.extend(std::iter::repeat_n(last, half));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mean_and_sample_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(mean(&v), 5.0));
        assert!(approx(std_dev(&v), (32.0f64 / 7.0).sqrt()));
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[1.0]).is_nan());
    }

    #[test]
    fn head_and_tail_clamp_to_length() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(head(&v, 2), &[1.0, 2.0]);
        assert_eq!(head(&v, 10), &v);
        assert_eq!(tail(&v, 2), &[2.0, 3.0]);
        assert_eq!(tail(&v, 10), &v);
    }

    #[test]
    fn extrema_return_first_occurrence_and_skip_nan() {
        let v = [1.0, f64::NAN, 3.0, 3.0, -2.0, -2.0];
        assert_eq!(argmax(&v), Some(2));
        assert_eq!(argmin(&v), Some(4));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn linspace_includes_both_ends() {
        let v = linspace(0.0, 1.0, 5);
        assert_eq!(v.len(), 5);
        assert!(approx(v[0], 0.0));
        assert!(approx(v[4], 1.0));
        assert!(approx(v[1], 0.25));
    }

    #[test]
    fn derivative_of_a_line_is_constant_and_padded() {
        let t = linspace(0.0, 9.0, 10);
        let y: Vec<f64> = t.iter().map(|x| 3.0 * x + 1.0).collect();
        let d = derivative(&y, &t, 4);
        assert_eq!(d.len(), 10);
        assert!(d.iter().all(|v| approx(*v, 3.0)));
    }
}
