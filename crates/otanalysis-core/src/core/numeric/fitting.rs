use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("Need more than {params} points to fit, got {points}")]
    InsufficientData { points: usize, params: usize },

    #[error("Abscissa and ordinate lengths differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },

    #[error("Model produced non-finite residuals")]
    NonFinite,

    #[error("Normal equations are singular")]
    Singular,

    #[error("Fit did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },
}

/// Outcome of a nonlinear least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub params: Vec<f64>,
    /// `(JᵀJ)⁻¹ · SSR / (n - p)` at the solution, when finite.
    pub covariance: Option<DMatrix<f64>>,
    pub residual_sum: f64,
    pub iterations: usize,
}

impl FitResult {
    /// One-sigma parameter errors from the covariance diagonal.
    pub fn errors(&self) -> Option<Vec<f64>> {
        let cov = self.covariance.as_ref()?;
        let errors: Vec<f64> = cov.diagonal().iter().map(|v| v.sqrt()).collect();
        errors.iter().all(|e| e.is_finite()).then_some(errors)
    }

    pub fn error(&self, index: usize) -> Option<f64> {
        self.errors().and_then(|e| e.get(index).copied())
    }
}

/// Damped Gauss–Newton solver with a forward-difference Jacobian.
#[derive(Debug, Clone, Copy)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub initial_damping: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
            initial_damping: 1e-3,
        }
    }
}

const MAX_DAMPING: f64 = 1e16;

impl LevenbergMarquardt {
    pub fn fit<F>(&self, model: F, x: &[f64], y: &[f64], p0: &[f64]) -> Result<FitResult, FitError>
    where
        F: Fn(f64, &[f64]) -> f64,
    {
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        let n = x.len();
        let m = p0.len();
        if n <= m {
            return Err(FitError::InsufficientData {
                points: n,
                params: m,
            });
        }

        let mut params = DVector::from_column_slice(p0);
        let mut current = residuals(&model, x, y, params.as_slice());
        let mut cost = current.norm_squared();
        if !cost.is_finite() {
            return Err(FitError::NonFinite);
        }

        let mut damping = self.initial_damping;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let jac = jacobian(&model, x, params.as_slice());
            let normal = jac.transpose() * &jac;
            let gradient = jac.transpose() * &current;

            let mut improved = false;
            while damping <= MAX_DAMPING {
                let mut damped = normal.clone();
                for j in 0..m {
                    damped[(j, j)] += damping * normal[(j, j)].max(1e-12);
                }
                let Some(step) = damped.lu().solve(&gradient) else {
                    damping *= 10.0;
                    continue;
                };

                let candidate = &params + &step;
                let candidate_residuals = residuals(&model, x, y, candidate.as_slice());
                let candidate_cost = candidate_residuals.norm_squared();

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let small_step =
                        step.norm() <= self.tolerance * (params.norm() + self.tolerance);
                    let small_gain = (cost - candidate_cost) <= self.tolerance * cost;
                    params = candidate;
                    current = candidate_residuals;
                    cost = candidate_cost;
                    damping = (damping / 10.0).max(1e-15);
                    improved = true;
                    converged = small_step || small_gain;
                    break;
                }
                damping *= 10.0;
            }

            if !improved {
                // No descent direction left at any damping: local minimum.
                converged = true;
            }
            if converged {
                break;
            }
        }

        if !converged {
            return Err(FitError::NoConvergence { iterations });
        }

        let jac = jacobian(&model, x, params.as_slice());
        let covariance = (jac.transpose() * &jac)
            .try_inverse()
            .map(|inv| inv * (cost / (n - m) as f64))
            .filter(|cov| cov.iter().all(|v| v.is_finite()));

        Ok(FitResult {
            params: params.iter().copied().collect(),
            covariance,
            residual_sum: cost,
            iterations,
        })
    }
}

/// Fits `model` to `(x, y)` from the initial guess `p0` with default settings.
pub fn curve_fit<F>(model: F, x: &[f64], y: &[f64], p0: &[f64]) -> Result<FitResult, FitError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    LevenbergMarquardt::default().fit(model, x, y, p0)
}

fn residuals<F>(model: &F, x: &[f64], y: &[f64], p: &[f64]) -> DVector<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    DVector::from_iterator(x.len(), x.iter().zip(y).map(|(&xi, &yi)| yi - model(xi, p)))
}

fn jacobian<F>(model: &F, x: &[f64], p: &[f64]) -> DMatrix<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut jac = DMatrix::zeros(x.len(), p.len());
    let mut shifted = p.to_vec();
    for j in 0..p.len() {
        let h = f64::EPSILON.sqrt() * p[j].abs().max(1.0);
        shifted[j] = p[j] + h;
        for (i, &xi) in x.iter().enumerate() {
            jac[(i, j)] = (model(xi, &shifted) - model(xi, p)) / h;
        }
        shifted[j] = p[j];
    }
    jac
}

/// Slope and intercept of an ordinary least-squares line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    #[inline]
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Abscissa where the line reaches `level`.
    pub fn crossing(&self, level: f64) -> Result<f64, FitError> {
        if self.slope == 0.0 || !self.slope.is_finite() {
            return Err(FitError::Singular);
        }
        Ok((self.intercept - level) / -self.slope)
    }
}

pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LineFit, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(FitError::InsufficientData {
            points: x.len(),
            params: 2,
        });
    }
    let a = DMatrix::from_fn(x.len(), 2, |r, c| if c == 0 { x[r] } else { 1.0 });
    let b = DVector::from_column_slice(y);
    let normal = a.transpose() * &a;
    let rhs = a.transpose() * b;
    let solution = normal
        .try_inverse()
        .map(|inv| inv * rhs)
        .ok_or(FitError::Singular)?;
    let (slope, intercept) = (solution[0], solution[1]);
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(FitError::NonFinite);
    }
    Ok(LineFit { slope, intercept })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_fit_recovers_exact_line() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|v| -2.0 * v + 7.0).collect();
        let line = linear_fit(&x, &y).unwrap();
        assert!((line.slope + 2.0).abs() < 1e-9);
        assert!((line.intercept - 7.0).abs() < 1e-9);
        assert!((line.crossing(7.0).unwrap()).abs() < 1e-9);
    }

    #[test]
    fn linear_fit_rejects_degenerate_abscissa() {
        let x = vec![1.0; 5];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(linear_fit(&x, &y).is_err());
        assert_eq!(
            LineFit { slope: 0.0, intercept: 1.0 }.crossing(0.0),
            Err(FitError::Singular)
        );
    }

    #[test]
    fn exponential_decay_is_fitted() {
        let x: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * (-1.5 * v).exp() + 0.5).collect();
        let model = |t: f64, p: &[f64]| p[0] * (-p[1] * t).exp() + p[2];

        let fit = curve_fit(model, &x, &y, &[1.0, 1.0, 0.0]).unwrap();

        assert!((fit.params[0] - 3.0).abs() < 1e-5);
        assert!((fit.params[1] - 1.5).abs() < 1e-5);
        assert!((fit.params[2] - 0.5).abs() < 1e-5);
        assert!(fit.residual_sum < 1e-12);
    }

    #[test]
    fn errors_are_reported_for_noisy_data() {
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 0.5 * v + 1.0 + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let fit = curve_fit(|t, p| p[0] * t + p[1], &x, &y, &[1.0, 0.0]).unwrap();
        let errors = fit.errors().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| *e > 0.0));
        assert!((fit.params[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let err = curve_fit(|t, p| p[0] * t, &[1.0], &[2.0], &[1.0]).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { points: 1, params: 1 });
    }
}
