//! Probabilistic aggregator over the aligned multi-timeframe features.
//!
//! The pipeline only talks to the [`Classifier`] trait; [`LogisticRegression`]
//! is the default implementation.

use crate::domain::error::ConfluenceError;
use crate::domain::label::LabeledRow;
use chrono::NaiveDateTime;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

/// Halvings tried before the line search gives up on a Newton direction.
const MAX_BACKTRACKS: usize = 50;
/// Sufficient-decrease constant of the Armijo condition.
const ARMIJO: f64 = 1e-4;

/// A scored binary classifier.
pub trait Classifier {
    /// Fits a fresh model, replacing any previous one.
    fn train(&mut self, features: &[Vec<f64>], targets: &[u8]) -> Result<(), ConfluenceError>;

    /// Probability of target == 1 for each row, each in [0, 1].
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ConfluenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticConfig {
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once every gradient component is at most this large.
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedLogit {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// L2-regularized logistic regression with balanced class weights, fitted
/// by Newton's method with a backtracking line search.
///
/// Minimizes `0.5 * |w|^2 + C * sum(s_i * logloss_i)` where
/// `s_i = n / (2 * n_{y_i})`. The intercept is not penalized.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    config: LogisticConfig,
    fitted: Option<FittedLogit>,
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn fitted(&self) -> Option<&FittedLogit> {
        self.fitted.as_ref()
    }

    fn fit(&self, x: &[Vec<f64>], y: &[u8]) -> Result<FittedLogit, ConfluenceError> {
        let n = x.len();
        let d = x[0].len();
        let positives = y.iter().filter(|&&t| t == 1).count();
        let negatives = n - positives;
        if positives == 0 || negatives == 0 {
            return Err(ConfluenceError::invalid_input(
                "training targets contain a single class",
            ));
        }

        let w_pos = n as f64 / (2.0 * positives as f64);
        let w_neg = n as f64 / (2.0 * negatives as f64);

        // Trailing column of ones carries the intercept.
        let design = DMatrix::from_fn(n, d + 1, |i, j| if j < d { x[i][j] } else { 1.0 });
        let problem = Objective {
            targets: DVector::from_iterator(n, y.iter().map(|&t| f64::from(t))),
            weights: DVector::from_iterator(
                n,
                y.iter().map(|&t| if t == 1 { w_pos } else { w_neg }),
            ),
            x: design,
            c: self.config.c,
        };

        let mut theta = DVector::zeros(d + 1);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.config.max_iter {
            let (grad, hess) = problem.gradient_and_hessian(&theta);
            if grad.amax() <= self.config.tolerance {
                converged = true;
                break;
            }
            iterations += 1;

            let step = hess
                .cholesky()
                .ok_or_else(|| {
                    ConfluenceError::invalid_input(
                        "Hessian is not positive definite while fitting classifier",
                    )
                })?
                .solve(&grad);

            let Some((candidate, t)) = problem.line_search(&theta, &grad, &step) else {
                warn!(iterations, "line search exhausted; keeping current coefficients");
                break;
            };

            let moved = step.amax() * t;
            theta = candidate;
            if moved < 1e-12 {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(iterations, "logistic regression converged");
        } else {
            warn!(
                max_iter = self.config.max_iter,
                iterations, "logistic regression did not converge; keeping last iterate"
            );
        }

        Ok(FittedLogit {
            coefficients: theta.rows(0, d).iter().copied().collect(),
            intercept: theta[d],
            iterations,
            converged,
        })
    }
}

impl Classifier for LogisticRegression {
    fn train(&mut self, features: &[Vec<f64>], targets: &[u8]) -> Result<(), ConfluenceError> {
        validate_matrix(features, None)?;
        if features.len() != targets.len() {
            return Err(ConfluenceError::invalid_input(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if targets.iter().any(|&t| t > 1) {
            return Err(ConfluenceError::invalid_input("targets must be 0 or 1"));
        }

        let model = self.fit(features, targets)?;
        self.fitted = Some(model);
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ConfluenceError> {
        let model = self.fitted.as_ref().ok_or(ConfluenceError::ModelNotTrained)?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let width = model.coefficients.len();
        validate_matrix(features, Some(width))?;

        let x = DMatrix::from_fn(features.len(), width, |i, j| features[i][j]);
        let w = DVector::from_column_slice(&model.coefficients);
        Ok((x * w)
            .iter()
            .map(|z| sigmoid(z + model.intercept))
            .collect())
    }
}

/// Weighted, regularized log loss over a design matrix whose last column is
/// the intercept.
struct Objective {
    x: DMatrix<f64>,
    targets: DVector<f64>,
    weights: DVector<f64>,
    c: f64,
}

impl Objective {
    /// `theta` with the intercept zeroed, i.e. the penalized part.
    fn penalized(theta: &DVector<f64>) -> DVector<f64> {
        let mut w = theta.clone();
        let last = w.len() - 1;
        w[last] = 0.0;
        w
    }

    fn value(&self, theta: &DVector<f64>) -> f64 {
        let z = &self.x * theta;
        let loss: f64 = z
            .iter()
            .zip(self.targets.iter())
            .zip(self.weights.iter())
            .map(|((&z, &t), &s)| s * if t > 0.5 { softplus(-z) } else { softplus(z) })
            .sum();
        let w = Self::penalized(theta);
        0.5 * w.dot(&w) + self.c * loss
    }

    fn gradient_and_hessian(&self, theta: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
        let (n, dim) = self.x.shape();
        let p = (&self.x * theta).map(sigmoid);

        let residual = (&p - &self.targets).component_mul(&self.weights) * self.c;
        let grad = self.x.transpose() * residual + Self::penalized(theta);

        let curvature = p.zip_map(&self.weights, |p, s| self.c * s * p * (1.0 - p));
        let scaled = DMatrix::from_fn(n, dim, |i, j| self.x[(i, j)] * curvature[i]);
        let mut hess = self.x.transpose() * scaled;
        for j in 0..dim - 1 {
            hess[(j, j)] += 1.0;
        }
        (grad, hess)
    }

    /// Backtracking along `-step` until the Armijo condition holds. `None`
    /// when no tried step length decreases the objective enough.
    fn line_search(
        &self,
        theta: &DVector<f64>,
        grad: &DVector<f64>,
        step: &DVector<f64>,
    ) -> Option<(DVector<f64>, f64)> {
        let current = self.value(theta);
        let slope = grad.dot(step);
        let mut t = 1.0;
        for _ in 0..MAX_BACKTRACKS {
            let candidate = theta - step * t;
            if self.value(&candidate) <= current - ARMIJO * t * slope {
                return Some((candidate, t));
            }
            t *= 0.5;
        }
        None
    }
}

fn validate_matrix(features: &[Vec<f64>], width: Option<usize>) -> Result<(), ConfluenceError> {
    let first = features
        .first()
        .ok_or_else(|| ConfluenceError::invalid_input("empty feature matrix"))?;
    let expected = width.unwrap_or(first.len());
    if expected == 0 {
        return Err(ConfluenceError::invalid_input("feature rows have no columns"));
    }
    for row in features {
        if row.len() != expected {
            return Err(ConfluenceError::invalid_input(format!(
                "feature row has {} columns, expected {}",
                row.len(),
                expected
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ConfluenceError::invalid_input("feature matrix contains non-finite values"));
        }
    }
    Ok(())
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^z) without overflow.
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Probability of a favorable next move for one test row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRow {
    pub timestamp: NaiveDateTime,
    pub probability: f64,
}

/// Owns a classifier and applies it to labeled rows.
#[derive(Debug, Clone, Default)]
pub struct Aggregator<C = LogisticRegression> {
    classifier: C,
}

impl<C: Classifier> Aggregator<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn train(&mut self, rows: &[LabeledRow]) -> Result<(), ConfluenceError> {
        let features: Vec<Vec<f64>> = rows.iter().map(|r| r.features.clone()).collect();
        let targets: Vec<u8> = rows.iter().map(|r| r.target).collect();
        self.classifier.train(&features, &targets)
    }

    pub fn predict(&self, rows: &[LabeledRow]) -> Result<Vec<PredictionRow>, ConfluenceError> {
        let features: Vec<Vec<f64>> = rows.iter().map(|r| r.features.clone()).collect();
        let probabilities = self.classifier.predict_proba(&features)?;
        Ok(rows
            .iter()
            .zip(probabilities)
            .map(|(row, probability)| PredictionRow {
                timestamp: row.timestamp,
                probability,
            })
            .collect())
    }
}
