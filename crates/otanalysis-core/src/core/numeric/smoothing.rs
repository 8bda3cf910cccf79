use nalgebra::{DMatrix, DVector};

/// Savitzky–Golay smoothing.
///
/// Interior samples use the centered least-squares polynomial of degree
/// `order` over an odd `window`; the first and last half-windows are
/// evaluated on the polynomial fitted to the edge window. An even window is
/// widened by one and a window longer than the data is shrunk to the largest
/// odd length that fits. Series too short for the order are returned as-is.
pub fn savgol(values: &[f64], window: usize, order: usize) -> Vec<f64> {
    let n = values.len();
    let mut window = if window % 2 == 0 { window + 1 } else { window };
    if window > n {
        window = if n % 2 == 0 { n.saturating_sub(1) } else { n };
    }
    if window <= order || window < 3 {
        return values.to_vec();
    }

    let half = window / 2;
    let Some(projection) = polynomial_projection(window, order) else {
        return values.to_vec();
    };

    let center = projection.row(0).transpose();
    let mut out = vec![0.0; n];
    for i in half..n - half {
        let slice = &values[i - half..=i + half];
        out[i] = slice.iter().zip(center.iter()).map(|(v, c)| v * c).sum();
    }

    let edges = [(0usize, 0usize..half), (n - window, n - half..n)];
    for (start, targets) in edges {
        let y = DVector::from_column_slice(&values[start..start + window]);
        let coefficients = &projection * y;
        for target in targets {
            let u = target as f64 - (start + half) as f64;
            out[target] = evaluate(&coefficients, u);
        }
    }
    out
}

/// `(AᵀA)⁻¹Aᵀ` for the Vandermonde matrix of offsets `-half..=half`.
fn polynomial_projection(window: usize, order: usize) -> Option<DMatrix<f64>> {
    let half = (window / 2) as f64;
    let a = DMatrix::from_fn(window, order + 1, |r, c| (r as f64 - half).powi(c as i32));
    let normal = a.transpose() * &a;
    let inverse = normal.try_inverse()?;
    Some(inverse * a.transpose())
}

fn evaluate(coefficients: &DVector<f64>, u: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * u + c)
}
