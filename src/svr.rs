//! Epsilon-insensitive support vector regression on a single feature (time).
//!
//! The input is standardized (population statistics); targets are centred and
//! scaled internally with `C` and `epsilon` rescaled so the solution matches
//! the unscaled problem. The dual
//!
//! ```text
//! min_β  ½ βᵀ(K + 1)β − yᵀβ + ε‖β‖₁   subject to  −C ≤ β_i ≤ C
//! ```
//!
//! is solved by cyclic coordinate descent, where the `+ 1` folds the intercept
//! into the kernel. Each coordinate update is a closed-form soft threshold.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::{validate_all_finite, validate_alignment, ReliabilityError, ReliabilityResult};
use crate::math_utils::{mean, std_dev};
use crate::reliability_model::{resolve_evaluation_times, ReliabilityModel, SeriesRequirement};
use crate::results::{Diagnostics, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Dual coefficients below this magnitude do not count as support vectors.
const SUPPORT_THRESHOLD: f64 = 1e-8;

/// Kernel function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvrKernel {
    /// `exp(-γ (a - b)²)`
    #[default]
    Rbf,
    /// `a b`
    Linear,
    /// `(γ a b + coef0)^degree`
    Poly,
    /// `tanh(γ a b + coef0)`
    Sigmoid,
}

impl SvrKernel {
    /// Lowercase kernel name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SvrKernel::Rbf => "rbf",
            SvrKernel::Linear => "linear",
            SvrKernel::Poly => "poly",
            SvrKernel::Sigmoid => "sigmoid",
        }
    }
}

impl fmt::Display for SvrKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SvrKernel {
    type Err = ReliabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rbf" => Ok(SvrKernel::Rbf),
            "linear" => Ok(SvrKernel::Linear),
            "poly" => Ok(SvrKernel::Poly),
            "sigmoid" => Ok(SvrKernel::Sigmoid),
            other => Err(ReliabilityError::InvalidParameter {
                parameter: format!("svr kernel '{}'", other),
                value: f64::NAN,
                constraint: "one of: rbf, linear, poly, sigmoid".to_string(),
            }),
        }
    }
}

/// Kernel coefficient γ.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvrGamma {
    /// `1 / (n_features · var(x))` on the standardized input
    #[default]
    Scale,
    /// `1 / n_features`
    Auto,
    /// Explicit value
    Value(f64),
}

/// Regressor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvrConfig {
    /// Kernel function
    pub kernel: SvrKernel,
    /// Box constraint on the dual coefficients
    pub c: f64,
    /// Half-width of the insensitive tube
    pub epsilon: f64,
    /// Kernel coefficient
    pub gamma: SvrGamma,
    /// Polynomial kernel degree
    pub degree: u32,
    /// Independent term of the poly and sigmoid kernels
    pub coef0: f64,
    /// Coordinate-descent sweep ceiling
    pub max_epochs: usize,
    /// Sweep stops once no coefficient moves more than this
    pub tolerance: f64,
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            kernel: SvrKernel::Rbf,
            c: 10.0,
            epsilon: 0.01,
            gamma: SvrGamma::Scale,
            degree: 3,
            coef0: 0.0,
            max_epochs: 10_000,
            tolerance: 1e-6,
        }
    }
}

impl SvrConfig {
    fn validate(&self) -> ReliabilityResult<()> {
        if !(self.c > 0.0) {
            return Err(ReliabilityError::InvalidParameter {
                parameter: "C".to_string(),
                value: self.c,
                constraint: "C > 0".to_string(),
            });
        }
        if !(self.epsilon >= 0.0) {
            return Err(ReliabilityError::InvalidParameter {
                parameter: "epsilon".to_string(),
                value: self.epsilon,
                constraint: "epsilon >= 0".to_string(),
            });
        }
        if let SvrGamma::Value(g) = self.gamma {
            if !(g > 0.0) {
                return Err(ReliabilityError::InvalidParameter {
                    parameter: "gamma".to_string(),
                    value: g,
                    constraint: "gamma > 0".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Trained regressor.
#[derive(Debug, Clone)]
pub struct SvrRegressor {
    kernel: SvrKernel,
    gamma: f64,
    degree: u32,
    coef0: f64,
    x_mean: f64,
    x_scale: f64,
    y_mean: f64,
    y_scale: f64,
    support: Vec<f64>,
    coefficients: Vec<f64>,
}

impl SvrRegressor {
    /// Train on `(x, y)` pairs.
    pub fn fit(x: &[f64], y: &[f64], config: &SvrConfig) -> ReliabilityResult<Self> {
        config.validate()?;
        validate_alignment(x, y)?;
        crate::errors::validate_data_length(x, 1)?;
        validate_all_finite(x, "svr inputs")?;
        validate_all_finite(y, "svr targets")?;

        let x_mean = mean(x);
        let x_scale = nonzero_scale(std_dev(x, 0));
        let y_mean = mean(y);
        let y_scale = nonzero_scale(std_dev(y, 0));

        let xs: Vec<f64> = x.iter().map(|v| (v - x_mean) / x_scale).collect();
        let ys: Vec<f64> = y.iter().map(|v| (v - y_mean) / y_scale).collect();
        let c = config.c / y_scale;
        let eps = config.epsilon / y_scale;

        let gamma = match config.gamma {
            SvrGamma::Scale => {
                let var = std_dev(&xs, 0).powi(2);
                if var > 0.0 {
                    1.0 / var
                } else {
                    1.0
                }
            }
            SvrGamma::Auto => 1.0,
            SvrGamma::Value(g) => g,
        };

        let mut model = Self {
            kernel: config.kernel,
            gamma,
            degree: config.degree,
            coef0: config.coef0,
            x_mean,
            x_scale,
            y_mean,
            y_scale,
            support: xs,
            coefficients: Vec::new(),
        };

        let n = ys.len();
        let q: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| model.kernel_value(model.support[i], model.support[j]) + 1.0)
                    .collect()
            })
            .collect();

        let mut beta = vec![0.0; n];
        // gradient of the smooth part: Qβ − y
        let mut grad: Vec<f64> = ys.iter().map(|v| -v).collect();
        let mut converged = false;
        for _ in 0..config.max_epochs {
            let mut max_change: f64 = 0.0;
            for i in 0..n {
                let qii = q[i][i];
                if !(qii > 1e-12) {
                    continue;
                }
                let z = qii * beta[i] - grad[i];
                let shrunk = z.signum() * (z.abs() - eps).max(0.0);
                let updated = (shrunk / qii).clamp(-c, c);
                let delta = updated - beta[i];
                if delta != 0.0 {
                    for (g, q_row) in grad.iter_mut().zip(&q) {
                        *g += q_row[i] * delta;
                    }
                    beta[i] = updated;
                    max_change = max_change.max(delta.abs());
                }
            }
            if max_change < config.tolerance {
                converged = true;
                break;
            }
        }
        if !converged {
            log::debug!(
                "SVR coordinate descent stopped at {} epochs without reaching tolerance {:e}",
                config.max_epochs,
                config.tolerance
            );
        }

        model.coefficients = beta;
        Ok(model)
    }

    fn kernel_value(&self, a: f64, b: f64) -> f64 {
        match self.kernel {
            SvrKernel::Rbf => (-self.gamma * (a - b) * (a - b)).exp(),
            SvrKernel::Linear => a * b,
            SvrKernel::Poly => (self.gamma * a * b + self.coef0).powi(self.degree as i32),
            SvrKernel::Sigmoid => (self.gamma * a * b + self.coef0).tanh(),
        }
    }

    /// Predict at one input value.
    pub fn predict_one(&self, x: f64) -> f64 {
        let xs = (x - self.x_mean) / self.x_scale;
        let scaled: f64 = self
            .support
            .iter()
            .zip(&self.coefficients)
            .map(|(&s, &beta)| beta * (self.kernel_value(s, xs) + 1.0))
            .sum();
        scaled * self.y_scale + self.y_mean
    }

    /// Predict at every input value.
    pub fn predict(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.predict_one(v)).collect()
    }

    /// Number of training points with a non-zero dual coefficient.
    pub fn support_vector_count(&self) -> usize {
        self.coefficients
            .iter()
            .filter(|b| b.abs() > SUPPORT_THRESHOLD)
            .count()
    }
}

fn nonzero_scale(sd: f64) -> f64 {
    if sd > 0.0 && sd.is_finite() {
        sd
    } else {
        1.0
    }
}

/// SVR model of the cumulative failure curve against time.
#[derive(Debug, Clone, Default)]
pub struct SupportVectorRegressionModel {
    config: SvrConfig,
}

impl SupportVectorRegressionModel {
    /// Model with explicit settings.
    pub fn new(config: SvrConfig) -> Self {
        Self { config }
    }
}

impl ReliabilityModel for SupportVectorRegressionModel {
    fn name(&self) -> &str {
        "SVR"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Only(FailureSeriesType::CumulativeFailures)
    }

    fn param_count(&self) -> usize {
        4
    }

    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        let time_axis = dataset.time_axis();
        let targets = dataset.cumulative_failures();
        let regressor = SvrRegressor::fit(time_axis, &targets, &self.config)?;

        let fitted = regressor.predict(time_axis);
        let metrics = self.compute_metrics(&targets, &fitted, None)?;
        let times = resolve_evaluation_times(dataset, evaluation_times);
        let predictions = regressor.predict(&times);

        let mut parameters = BTreeMap::new();
        parameters.insert("kernel".to_string(), self.config.kernel.as_str().into());
        parameters.insert("C".to_string(), self.config.c.into());
        parameters.insert("epsilon".to_string(), self.config.epsilon.into());
        parameters.insert(
            "support_vectors".to_string(),
            regressor.support_vector_count().into(),
        );

        Ok(ModelResult {
            model_name: self.name().to_string(),
            parameters,
            times,
            predictions,
            metrics,
            diagnostics: Diagnostics::new(),
        })
    }

    fn fresh(&self) -> Box<dyn ReliabilityModel> {
        Box::new(Self::new(self.config.clone()))
    }
}
