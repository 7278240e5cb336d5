//! Bounded nonlinear least squares for the NHPP mean-value models.
//!
//! A Levenberg-Marquardt curve fitter over `y ≈ f(t; θ)` with lower bounds on
//! every parameter (enforced by projection after each step) and a hard
//! iteration ceiling. On top of it, [`fit_with_strategy`] runs an ordered list
//! of initial guesses and records why each failed rung was abandoned.

use crate::errors::{ReliabilityError, ReliabilityResult};
use finitediff::FiniteDiff;
use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Damping never drops below this value.
const MIN_DAMPING: f64 = 1e-15;
/// Damping above this value means no downhill step exists from the current point.
const MAX_DAMPING: f64 = 1e16;

/// How initial guesses for `(a, b)` are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialGuessStrategy {
    /// Only `(1.1 * max, 0.01)`
    Single,
    /// `(1.1 * max, 0.01)` followed by guesses of other magnitudes
    #[default]
    Ladder,
}

/// Solver settings shared by the Goel-Okumoto and S-shaped models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NhppFitConfig {
    /// Levenberg-Marquardt iteration ceiling per rung
    pub max_iterations: usize,
    /// Relative step / cost-change tolerance
    pub tolerance: f64,
    /// Initial-guess policy
    pub strategy: InitialGuessStrategy,
}

impl Default for NhppFitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            tolerance: 1e-10,
            strategy: InitialGuessStrategy::Ladder,
        }
    }
}

impl NhppFitConfig {
    /// One initial guess, no retries.
    pub fn single_guess() -> Self {
        Self {
            strategy: InitialGuessStrategy::Single,
            ..Self::default()
        }
    }

    /// Initial `(a, b)` guesses for a cumulative series with maximum `max_value`.
    pub fn initial_guesses(&self, max_value: f64) -> Vec<[f64; 2]> {
        let base = if max_value > 0.0 { max_value } else { 1.0 };
        let primary = [1.1 * base, 0.01];
        match self.strategy {
            InitialGuessStrategy::Single => vec![primary],
            InitialGuessStrategy::Ladder => vec![
                primary,
                [1.5 * base, 0.1],
                [2.0 * base, 0.001],
                [1.05 * base, 1.0],
                [5.0 * base, 0.0001],
            ],
        }
    }
}

/// Converged curve fit.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveFit {
    /// Fitted parameters
    pub params: Vec<f64>,
    /// Residual sum of squares at `params`
    pub cost: f64,
    /// Iterations used
    pub iterations: usize,
}

/// Outcome of a multi-start fit: the fit plus messages from the rungs that failed before it.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFit {
    /// Fit from the first successful rung
    pub fit: CurveFit,
    /// Failure messages of earlier rungs
    pub failed_attempts: Vec<String>,
}

fn residuals<F>(model: &F, t: &[f64], y: &[f64], params: &[f64]) -> DVector<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    DVector::from_iterator(t.len(), t.iter().zip(y).map(|(&ti, &yi)| model(ti, params) - yi))
}

fn project(params: &mut [f64], lower: &[f64]) {
    for (p, &lo) in params.iter_mut().zip(lower) {
        if *p < lo {
            *p = lo;
        }
    }
}

/// Forward-difference Jacobian of the residuals with respect to the parameters.
///
/// `finitediff` returns one row per parameter; the result is transposed into
/// the usual `m x k` layout.
fn jacobian<F>(model: &F, t: &[f64], params: &[f64], y: &[f64]) -> ReliabilityResult<DMatrix<f64>>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let m = t.len();
    let k = params.len();
    let residual_vec = |p: &Vec<f64>| -> Vec<f64> {
        t.iter().zip(y).map(|(&ti, &yi)| model(ti, p) - yi).collect()
    };
    let rows = params.to_vec().forward_jacobian(&residual_vec);
    if rows.len() != k || rows.iter().any(|row| row.len() != m) {
        return Err(ReliabilityError::NumericalError {
            reason: format!("jacobian shape mismatch: expected {} x {}", k, m),
            operation: Some("levenberg_marquardt".to_string()),
        });
    }
    Ok(DMatrix::from_fn(m, k, |i, j| rows[j][i]))
}

fn solve_damped(normal: &DMatrix<f64>, gradient: &DVector<f64>, damping: f64) -> Option<DVector<f64>> {
    let mut system = normal.clone();
    for d in 0..system.nrows() {
        let scale = normal[(d, d)].max(1e-12);
        system[(d, d)] += damping * scale;
    }
    let rhs = -gradient.clone();
    match Cholesky::new(system.clone()) {
        Some(chol) => Some(chol.solve(&rhs)),
        None => system.lu().solve(&rhs),
    }
}

/// Fit `model(t, θ)` to `y` by bounded Levenberg-Marquardt.
///
/// # Arguments
/// * `model` - Mean-value function `f(t; θ)`
/// * `t`, `y` - Observation times and values
/// * `initial` - Starting parameters (projected onto the bounds first)
/// * `lower` - Lower bound per parameter
/// * `config` - Iteration ceiling and tolerance
///
/// # Returns
/// * `Ok(CurveFit)` on convergence
/// * `Err(NonConvergence)` when the iteration ceiling is reached
/// * `Err(NumericalError)` when the model is non-finite at the start point
pub fn levenberg_marquardt<F>(
    model: F,
    t: &[f64],
    y: &[f64],
    initial: &[f64],
    lower: &[f64],
    config: &NhppFitConfig,
) -> ReliabilityResult<CurveFit>
where
    F: Fn(f64, &[f64]) -> f64,
{
    if t.len() != y.len() {
        return Err(ReliabilityError::ArrayAlignment {
            expected: t.len(),
            actual: y.len(),
        });
    }
    if t.len() < initial.len() {
        return Err(ReliabilityError::InsufficientData {
            required: initial.len(),
            actual: t.len(),
        });
    }

    let mut params = initial.to_vec();
    project(&mut params, lower);
    let mut r = residuals(&model, t, y, &params);
    let mut cost = r.norm_squared();
    if !cost.is_finite() {
        return Err(ReliabilityError::NumericalError {
            reason: format!("non-finite residuals at initial guess {:?}", params),
            operation: Some("levenberg_marquardt".to_string()),
        });
    }

    let tol = config.tolerance;
    let mut damping = 1e-3;
    for iteration in 1..=config.max_iterations {
        if cost <= f64::MIN_POSITIVE {
            return Ok(CurveFit { params, cost, iterations: iteration - 1 });
        }

        let jac = jacobian(&model, t, &params, y)?;
        let gradient = jac.transpose() * &r;
        if gradient.amax() <= tol * tol {
            return Ok(CurveFit { params, cost, iterations: iteration - 1 });
        }
        let normal = jac.transpose() * &jac;

        let mut accepted = false;
        while damping <= MAX_DAMPING {
            let Some(step) = solve_damped(&normal, &gradient, damping) else {
                damping *= 10.0;
                continue;
            };
            let mut candidate: Vec<f64> = params.iter().zip(step.iter()).map(|(p, s)| p + s).collect();
            project(&mut candidate, lower);
            let r_new = residuals(&model, t, y, &candidate);
            let cost_new = r_new.norm_squared();

            if cost_new.is_finite() && cost_new < cost {
                let step_norm = candidate
                    .iter()
                    .zip(&params)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();
                let relative_drop = (cost - cost_new) / cost;

                params = candidate;
                r = r_new;
                cost = cost_new;
                damping = (damping / 10.0).max(MIN_DAMPING);
                accepted = true;

                if step_norm <= tol * (param_norm + tol) || relative_drop <= tol {
                    return Ok(CurveFit { params, cost, iterations: iteration });
                }
                break;
            }
            damping *= 10.0;
        }

        if !accepted {
            // No downhill direction inside the bounds: a constrained minimum.
            return Ok(CurveFit { params, cost, iterations: iteration });
        }
    }

    Err(ReliabilityError::NonConvergence {
        operation: "levenberg_marquardt".to_string(),
        iterations: config.max_iterations,
        attempts: Vec::new(),
    })
}

/// Try each of `guesses` in order and return the first converged fit.
///
/// A rung fails when the solver errors or the fitted parameters are
/// non-finite. When every rung fails the error is `NonConvergence` carrying
/// one message per rung.
pub fn fit_with_strategy<F>(
    model_name: &str,
    model: F,
    t: &[f64],
    y: &[f64],
    guesses: &[[f64; 2]],
    config: &NhppFitConfig,
) -> ReliabilityResult<StrategyFit>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let lower = [0.0, 0.0];
    let mut failed_attempts = Vec::new();
    for guess in guesses {
        log::debug!("{}: trying initial guess a0={:.4}, b0={:.4}", model_name, guess[0], guess[1]);
        match levenberg_marquardt(&model, t, y, guess, &lower, config) {
            Ok(fit) if fit.params.iter().all(|p| p.is_finite()) => {
                if !failed_attempts.is_empty() {
                    log::warn!(
                        "{}: initial guess {:?} succeeded after {} failed attempt(s)",
                        model_name,
                        guess,
                        failed_attempts.len()
                    );
                }
                return Ok(StrategyFit { fit, failed_attempts });
            }
            Ok(fit) => failed_attempts.push(format!(
                "guess {:?}: non-finite parameters {:?}",
                guess, fit.params
            )),
            Err(err) => failed_attempts.push(format!("guess {:?}: {}", guess, err)),
        }
    }
    Err(ReliabilityError::NonConvergence {
        operation: model_name.to_string(),
        iterations: config.max_iterations,
        attempts: failed_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn exp_saturation(t: f64, p: &[f64]) -> f64 {
        p[0] * (1.0 - (-p[1] * t).exp())
    }

    #[test]
    fn test_recovers_exact_curve() {
        let t: Vec<f64> = (1..=10).map(|i| 10.0 * i as f64).collect();
        let y: Vec<f64> = t.iter().map(|&ti| exp_saturation(ti, &[50.0, 0.05])).collect();
        let fit = levenberg_marquardt(
            exp_saturation,
            &t,
            &y,
            &[55.0, 0.01],
            &[0.0, 0.0],
            &NhppFitConfig::default(),
        )
        .unwrap();
        assert_approx_eq!(fit.params[0], 50.0, 1e-4);
        assert_approx_eq!(fit.params[1], 0.05, 1e-6);
        assert!(fit.cost < 1e-10);
    }

    #[test]
    fn test_jacobian_matches_analytic_derivatives() {
        let t = [1.0, 5.0, 20.0];
        let y = [0.0, 0.0, 0.0];
        let p = [40.0, 0.1];
        let jac = jacobian(&exp_saturation, &t, &p, &y).unwrap();
        assert_eq!(jac.shape(), (3, 2));
        for (i, &ti) in t.iter().enumerate() {
            let decay = (-p[1] * ti).exp();
            assert_approx_eq!(jac[(i, 0)], 1.0 - decay, 1e-5);
            assert_approx_eq!(jac[(i, 1)], p[0] * ti * decay, 1e-4 * p[0] * ti);
        }
    }

    #[test]
    fn test_bounds_are_respected() {
        // Unconstrained optimum is slope -1; the bound holds it at zero
        let t = [1.0, 2.0, 3.0, 4.0];
        let y = [-1.0, -2.0, -3.0, -4.0];
        let ray = |t: f64, p: &[f64]| p[0] * t;
        let fit = levenberg_marquardt(ray, &t, &y, &[1.0], &[0.0], &NhppFitConfig::default())
            .unwrap();
        assert_eq!(fit.params[0], 0.0);
        assert_approx_eq!(fit.cost, 30.0, 1e-12);
    }

    #[test]
    fn test_iteration_ceiling_is_non_convergence() {
        let t: Vec<f64> = (1..=10).map(|i| 10.0 * i as f64).collect();
        let y: Vec<f64> = t.iter().map(|&ti| exp_saturation(ti, &[50.0, 0.05])).collect();
        let config = NhppFitConfig {
            max_iterations: 1,
            tolerance: 0.0,
            ..NhppFitConfig::default()
        };
        let err = levenberg_marquardt(exp_saturation, &t, &y, &[500.0, 0.0001], &[0.0, 0.0], &config)
            .unwrap_err();
        assert!(matches!(err, ReliabilityError::NonConvergence { iterations: 1, .. }));
    }

    #[test]
    fn test_ladder_collects_failures() {
        let t = [1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0];
        let never_finite = |_t: f64, _p: &[f64]| f64::NAN;
        let err = fit_with_strategy(
            "ladder",
            never_finite,
            &t,
            &y,
            &NhppFitConfig::default().initial_guesses(3.0),
            &NhppFitConfig::default(),
        )
        .unwrap_err();
        match err {
            ReliabilityError::NonConvergence { operation, attempts, .. } => {
                assert_eq!(operation, "ladder");
                assert_eq!(attempts.len(), 5);
            }
            other => panic!("expected NonConvergence, got {:?}", other),
        }
    }

    #[test]
    fn test_single_guess_strategy() {
        let guesses = NhppFitConfig::single_guess().initial_guesses(20.0);
        assert_eq!(guesses, vec![[22.0, 0.01]]);
        assert_eq!(NhppFitConfig::default().initial_guesses(20.0)[0], [22.0, 0.01]);
    }
}
