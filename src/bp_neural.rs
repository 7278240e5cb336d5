//! Back-propagation neural network regressor of the cumulative curve.
//!
//! One input (normalized time), one hidden layer of sigmoid units and a linear
//! output, trained full-batch on mean squared error with momentum SGD. Weights
//! are drawn from a seeded ChaCha stream so a given configuration always
//! produces the same fit.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::reliability_model::{resolve_evaluation_times, ReliabilityModel, SeriesRequirement};
use crate::results::{Diagnostic, Diagnostics, ModelResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of trailing epoch losses kept in the diagnostic.
const LOSS_CURVE_TAIL: usize = 50;

/// Network and training settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpConfig {
    /// Hidden units
    pub hidden_size: usize,
    /// Full-batch epochs
    pub epochs: usize,
    /// SGD step size
    pub learning_rate: f64,
    /// SGD momentum
    pub momentum: f64,
    /// Leading fraction of the series used for training
    pub train_split: f64,
    /// Weight initialization seed
    pub seed: u64,
}

impl Default for BpConfig {
    fn default() -> Self {
        Self {
            hidden_size: 16,
            epochs: 800,
            learning_rate: 0.01,
            momentum: 0.9,
            train_split: 0.8,
            seed: 42,
        }
    }
}

impl BpConfig {
    fn validate(&self) -> ReliabilityResult<()> {
        let checks = [
            ("hidden_size", self.hidden_size as f64, self.hidden_size >= 1, "hidden_size >= 1"),
            ("epochs", self.epochs as f64, self.epochs >= 1, "epochs >= 1"),
            ("learning_rate", self.learning_rate, self.learning_rate > 0.0, "learning_rate > 0"),
            (
                "momentum",
                self.momentum,
                (0.0..1.0).contains(&self.momentum),
                "0 <= momentum < 1",
            ),
            (
                "train_split",
                self.train_split,
                self.train_split > 0.0 && self.train_split <= 1.0,
                "0 < train_split <= 1",
            ),
        ];
        for (parameter, value, ok, constraint) in checks {
            if !ok {
                return Err(ReliabilityError::InvalidParameter {
                    parameter: parameter.to_string(),
                    value,
                    constraint: constraint.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Min-max scaling; a zero span maps everything to 0 and back to `min`.
#[derive(Debug, Clone, Copy)]
struct MinMax {
    min: f64,
    span: f64,
}

impl MinMax {
    fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { min, span: max - min }
    }

    fn forward(&self, v: f64) -> f64 {
        if self.span == 0.0 {
            0.0
        } else {
            (v - self.min) / self.span
        }
    }

    fn inverse(&self, v: f64) -> f64 {
        if self.span == 0.0 {
            self.min
        } else {
            v * self.span + self.min
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// 1-h-1 network parameters.
#[derive(Debug, Clone)]
struct Network {
    w1: Vec<f64>,
    b1: Vec<f64>,
    w2: Vec<f64>,
    b2: f64,
}

impl Network {
    fn initialize(hidden: usize, rng: &mut ChaCha20Rng) -> Self {
        // U(-1/sqrt(fan_in), 1/sqrt(fan_in)); fan_in is 1 for the hidden layer
        let bound2 = 1.0 / (hidden as f64).sqrt();
        Self {
            w1: (0..hidden).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            b1: (0..hidden).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            w2: (0..hidden).map(|_| rng.gen_range(-bound2..bound2)).collect(),
            b2: rng.gen_range(-bound2..bound2),
        }
    }

    fn hidden(&self, x: f64) -> Vec<f64> {
        self.w1
            .iter()
            .zip(&self.b1)
            .map(|(w, b)| sigmoid(w * x + b))
            .collect()
    }

    fn forward(&self, x: f64) -> f64 {
        self.hidden(x)
            .iter()
            .zip(&self.w2)
            .map(|(h, w)| h * w)
            .sum::<f64>()
            + self.b2
    }

    /// One momentum-SGD step on the batch; returns the pre-step loss.
    fn train_step(
        &mut self,
        xs: &[f64],
        ys: &[f64],
        velocity: &mut Network,
        learning_rate: f64,
        momentum: f64,
    ) -> f64 {
        let h = self.w1.len();
        let m = xs.len() as f64;
        let mut grad = Network {
            w1: vec![0.0; h],
            b1: vec![0.0; h],
            w2: vec![0.0; h],
            b2: 0.0,
        };
        let mut loss = 0.0;

        for (&x, &y) in xs.iter().zip(ys) {
            let hidden = self.hidden(x);
            let out: f64 = hidden.iter().zip(&self.w2).map(|(a, w)| a * w).sum::<f64>() + self.b2;
            let err = out - y;
            loss += err * err;
            let d_out = 2.0 * err / m;
            grad.b2 += d_out;
            for j in 0..h {
                grad.w2[j] += d_out * hidden[j];
                let d_hidden = d_out * self.w2[j] * hidden[j] * (1.0 - hidden[j]);
                grad.w1[j] += d_hidden * x;
                grad.b1[j] += d_hidden;
            }
        }

        let update = |param: &mut f64, vel: &mut f64, g: f64| {
            *vel = momentum * *vel + g;
            *param -= learning_rate * *vel;
        };
        for j in 0..h {
            update(&mut self.w1[j], &mut velocity.w1[j], grad.w1[j]);
            update(&mut self.b1[j], &mut velocity.b1[j], grad.b1[j]);
            update(&mut self.w2[j], &mut velocity.w2[j], grad.w2[j]);
        }
        update(&mut self.b2, &mut velocity.b2, grad.b2);

        loss / m
    }
}

/// BP network model over cumulative failure data.
#[derive(Debug, Clone, Default)]
pub struct BpNeuralNetworkModel {
    config: BpConfig,
}

impl BpNeuralNetworkModel {
    /// Model with explicit settings.
    pub fn new(config: BpConfig) -> Self {
        Self { config }
    }
}

impl ReliabilityModel for BpNeuralNetworkModel {
    fn name(&self) -> &str {
        "BP Neural Network"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Only(FailureSeriesType::CumulativeFailures)
    }

    fn param_count(&self) -> usize {
        3 * self.config.hidden_size + 1
    }

    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        self.config.validate()?;
        let time_axis = dataset.time_axis();
        let targets = dataset.cumulative_failures();
        let n = targets.len();
        if n < 2 {
            return Err(ReliabilityError::InsufficientData {
                required: 2,
                actual: n,
            });
        }

        let x_scale = MinMax::fit(time_axis);
        let y_scale = MinMax::fit(&targets);
        let xs: Vec<f64> = time_axis.iter().map(|&t| x_scale.forward(t)).collect();
        let ys: Vec<f64> = targets.iter().map(|&y| y_scale.forward(y)).collect();

        let split = ((n as f64 * self.config.train_split) as usize).max(2).min(n);

        let mut rng = ChaCha20Rng::seed_from_u64(self.config.seed);
        let mut network = Network::initialize(self.config.hidden_size, &mut rng);
        let h = self.config.hidden_size;
        let mut velocity = Network {
            w1: vec![0.0; h],
            b1: vec![0.0; h],
            w2: vec![0.0; h],
            b2: 0.0,
        };

        let mut losses = Vec::with_capacity(self.config.epochs);
        for _ in 0..self.config.epochs {
            losses.push(network.train_step(
                &xs[..split],
                &ys[..split],
                &mut velocity,
                self.config.learning_rate,
                self.config.momentum,
            ));
        }
        if losses.last().map_or(false, |l| !l.is_finite()) {
            return Err(ReliabilityError::NumericalError {
                reason: "training loss diverged".to_string(),
                operation: Some("bp_neural_train".to_string()),
            });
        }

        let predict = |t: f64| y_scale.inverse(network.forward(x_scale.forward(t)));
        let fitted: Vec<f64> = time_axis.iter().map(|&t| predict(t)).collect();
        let metrics = self.compute_metrics(&targets, &fitted, None)?;
        let times = resolve_evaluation_times(dataset, evaluation_times);
        let predictions = times.iter().map(|&t| predict(t)).collect();

        let mut parameters = BTreeMap::new();
        parameters.insert("hidden_size".to_string(), self.config.hidden_size.into());
        parameters.insert("epochs".to_string(), self.config.epochs.into());
        parameters.insert("lr".to_string(), self.config.learning_rate.into());

        let tail_start = losses.len().saturating_sub(LOSS_CURVE_TAIL);
        let mut diagnostics = Diagnostics::new();
        diagnostics.insert(Diagnostic::LossCurve {
            values: losses[tail_start..].to_vec(),
        });

        Ok(ModelResult {
            model_name: self.name().to_string(),
            parameters,
            times,
            predictions,
            metrics,
            diagnostics,
        })
    }

    fn fresh(&self) -> Box<dyn ReliabilityModel> {
        Box::new(Self::new(self.config.clone()))
    }
}
