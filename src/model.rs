//! Model families behind the three predictors.

use serde::{Deserialize, Serialize};

use crate::error::TrainingError;

const EPSILON: f64 = 1e-10;

/// Standardized features are clamped to this many deviations so that any
/// finite input yields finite scores.
pub const MAX_STANDARD_SCORE: f64 = 1e6;

/// Scalar prediction from an ordered feature vector. Output is unbounded.
pub trait Regressor {
    fn input_dim(&self) -> usize;
    fn predict(&self, features: &[f64]) -> f64;
    fn importances(&self) -> Vec<f64>;
}

/// Class distribution from an ordered feature vector.
pub trait Classifier {
    fn input_dim(&self) -> usize;
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;
    fn importances(&self) -> Vec<f64>;

    fn predict(&self, features: &[f64]) -> usize {
        argmax(&self.predict_proba(features))
    }
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    pub fn fit(rows: &[Vec<f64>], dim: usize) -> Self {
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; dim];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }
        let mut scales = vec![0.0; dim];
        for row in rows {
            for ((scale, value), mean) in scales.iter_mut().zip(row).zip(&means) {
                *scale += (value - mean).powi(2) / n;
            }
        }
        for scale in &mut scales {
            *scale = if *scale > EPSILON { scale.sqrt() } else { 1.0 };
        }
        Self { means, scales }
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Missing trailing features are treated as 0 before scaling.
    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        self.means
            .iter()
            .zip(&self.scales)
            .enumerate()
            .map(|(i, (mean, scale))| {
                let z = (features.get(i).copied().unwrap_or(0.0) - mean) / scale;
                if z.is_nan() {
                    0.0
                } else {
                    z.clamp(-MAX_STANDARD_SCORE, MAX_STANDARD_SCORE)
                }
            })
            .collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `a * x = b` for symmetric positive definite `a` (row-major, `n x n`).
fn solve_cholesky(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                l[i * n + i] = sum.max(EPSILON).sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }

    // L * y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i * n + j] * y[j];
        }
        y[i] = sum / l[i * n + i];
    }

    // L^T * x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j * n + i] * x[j];
        }
        x[i] = sum / l[i * n + i];
    }
    x
}

/// L2-regularized least squares on standardized features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegressor {
    standardizer: Standardizer,
    weights: Vec<f64>,
    intercept: f64,
}

impl RidgeRegressor {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], dim: usize, lambda: f64) -> Result<Self, TrainingError> {
        if rows.is_empty() {
            return Err(TrainingError::EmptySplit { rows: 0 });
        }
        let standardizer = Standardizer::fit(rows, dim);

        // Intercept is the last coordinate and is not regularized.
        let d = dim + 1;
        let mut xtx = vec![0.0; d * d];
        let mut xty = vec![0.0; d];
        for (row, target) in rows.iter().zip(targets) {
            let mut x = standardizer.transform(row);
            x.push(1.0);
            for i in 0..d {
                xty[i] += x[i] * target;
                for j in 0..d {
                    xtx[i * d + j] += x[i] * x[j];
                }
            }
        }
        for i in 0..dim {
            xtx[i * d + i] += lambda.max(EPSILON) * rows.len() as f64;
        }

        let mut solution = solve_cholesky(&xtx, &xty, d);
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(TrainingError::DegenerateFit("ridge solution is not finite".into()));
        }
        let intercept = solution.pop().unwrap_or(0.0);
        Ok(Self {
            standardizer,
            weights: solution,
            intercept,
        })
    }
}

impl Regressor for RidgeRegressor {
    fn input_dim(&self) -> usize {
        self.standardizer.dim()
    }

    fn predict(&self, features: &[f64]) -> f64 {
        dot(&self.weights, &self.standardizer.transform(features)) + self.intercept
    }

    fn importances(&self) -> Vec<f64> {
        self.weights.iter().map(|w| w.abs()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxParams {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
}

/// Multinomial logistic regression trained by full-batch gradient descent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    standardizer: Standardizer,
    /// One weight row per class.
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

/// Uniform when any logit is not finite.
fn softmax(logits: &[f64]) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }
    let uniform = || vec![1.0 / logits.len() as f64; logits.len()];
    if !logits.iter().all(|z| z.is_finite()) {
        return uniform();
    }
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return uniform();
    }
    exps.iter().map(|e| e / total).collect()
}

impl SoftmaxClassifier {
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        dim: usize,
        classes: usize,
        params: SoftmaxParams,
    ) -> Result<Self, TrainingError> {
        if rows.is_empty() {
            return Err(TrainingError::EmptySplit { rows: 0 });
        }
        let standardizer = Standardizer::fit(rows, dim);
        let inputs: Vec<Vec<f64>> = rows.iter().map(|row| standardizer.transform(row)).collect();
        let n = inputs.len() as f64;

        let mut model = Self {
            standardizer,
            weights: vec![vec![0.0; dim]; classes],
            biases: vec![0.0; classes],
        };

        for _ in 0..params.epochs {
            let mut grad_w = vec![vec![0.0; dim]; classes];
            let mut grad_b = vec![0.0; classes];
            for (x, label) in inputs.iter().zip(labels) {
                let probs = model.proba_standardized(x);
                for (class, p) in probs.iter().enumerate() {
                    let error = p - if class == *label { 1.0 } else { 0.0 };
                    grad_b[class] += error;
                    for (g, xi) in grad_w[class].iter_mut().zip(x) {
                        *g += error * xi;
                    }
                }
            }
            for class in 0..classes {
                model.biases[class] -= params.learning_rate * grad_b[class] / n;
                for (w, g) in model.weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= params.learning_rate * (g / n + params.l2 * *w);
                }
            }
        }

        let finite = model.biases.iter().chain(model.weights.iter().flatten()).all(|v| v.is_finite());
        if !finite {
            return Err(TrainingError::DegenerateFit("softmax weights diverged".into()));
        }
        Ok(model)
    }

    /// Number of classes with both a weight row and a bias.
    pub fn classes(&self) -> usize {
        self.weights.len().min(self.biases.len())
    }

    fn proba_standardized(&self, x: &[f64]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| dot(w, x) + b)
            .collect();
        softmax(&logits)
    }
}

impl Classifier for SoftmaxClassifier {
    fn input_dim(&self) -> usize {
        self.standardizer.dim()
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        self.proba_standardized(&self.standardizer.transform(features))
    }

    /// Mean absolute weight across classes.
    fn importances(&self) -> Vec<f64> {
        let classes = self.weights.len().max(1) as f64;
        (0..self.input_dim())
            .map(|j| self.weights.iter().map(|w| w[j].abs()).sum::<f64>() / classes)
            .collect()
    }
}
