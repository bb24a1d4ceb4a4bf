//! Linear estimators for the scorecard
//!
//! The scorecard only needs an intercept and one coefficient per WoE column,
//! so the estimator seam is a small trait. The built-in implementation is an
//! L2-regularised logistic regression solved by Newton's method.

use faer::prelude::*;
use faer::{Mat, Side};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{BinningError, Result};

/// Default inverse regularisation strength
pub const DEFAULT_C: f64 = 3.0;

/// Intercept and per-column coefficients of a fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// `intercept + sum(coef_i * x_i)`
    pub fn decision(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Fits a linear model of the event log-odds on column-major features
pub trait Estimator: Sync {
    fn name(&self) -> &'static str;

    fn fit(&self, columns: &[Vec<f64>], target: &[u8]) -> Result<LinearModel>;
}

/// Logistic regression with an L2 penalty on the coefficients.
///
/// Minimises `0.5 * |w|^2 + c * sum(logloss)`; the intercept is not
/// penalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: DEFAULT_C,
            max_iter: 100,
            tol: 1e-8,
        }
    }
}

pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^x)` without overflow
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn linear_predictor(z: &Mat<f64>, beta: &[f64]) -> Vec<f64> {
    (0..z.nrows())
        .map(|i| (0..z.ncols()).map(|j| z[(i, j)] * beta[j]).sum())
        .collect()
}

fn objective(z: &Mat<f64>, y: &[f64], beta: &[f64], penalty: f64) -> f64 {
    let loss: f64 = linear_predictor(z, beta)
        .iter()
        .zip(y)
        .map(|(eta, yi)| softplus(*eta) - yi * eta)
        .sum();
    let ridge: f64 = beta[1..].iter().map(|b| b * b).sum();
    loss + 0.5 * penalty * ridge
}

impl LogisticRegression {
    pub fn with_c(c: f64) -> Self {
        Self {
            c,
            ..Default::default()
        }
    }

    fn validate(&self, columns: &[Vec<f64>], target: &[u8]) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(BinningError::Configuration(format!(
                "regularisation C must be a positive number, got {}",
                self.c
            )));
        }
        if target.is_empty() {
            return Err(BinningError::InvalidInput("no rows to fit".to_string()));
        }
        if let Some(col) = columns.iter().find(|c| c.len() != target.len()) {
            return Err(BinningError::InvalidInput(format!(
                "feature column has {} rows, target has {}",
                col.len(),
                target.len()
            )));
        }
        if columns.iter().flatten().any(|x| !x.is_finite()) {
            return Err(BinningError::InvalidInput(
                "feature columns must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Estimator for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn fit(&self, columns: &[Vec<f64>], target: &[u8]) -> Result<LinearModel> {
        self.validate(columns, target)?;

        let n = target.len();
        let p = columns.len() + 1;
        let z = Mat::<f64>::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { columns[j - 1][i] });
        let y: Vec<f64> = target.iter().map(|&t| f64::from(t)).collect();
        let penalty = 1.0 / self.c;

        let mut beta = vec![0.0; p];
        let mut loss = objective(&z, &y, &beta, penalty);

        for iter in 0..self.max_iter {
            let prob: Vec<f64> = linear_predictor(&z, &beta).into_iter().map(sigmoid).collect();

            let mut grad = Mat::<f64>::zeros(p, 1);
            for j in 0..p {
                let g: f64 = (0..n).map(|i| z[(i, j)] * (prob[i] - y[i])).sum();
                grad[(j, 0)] = if j == 0 { g } else { g + penalty * beta[j] };
            }

            let zw = Mat::<f64>::from_fn(n, p, |i, j| z[(i, j)] * prob[i] * (1.0 - prob[i]));
            let mut hessian = z.transpose() * &zw;
            for j in 1..p {
                hessian[(j, j)] += penalty;
            }
            // Keeps the intercept pivot positive when every weight vanishes
            hessian[(0, 0)] += 1e-10;

            let llt = hessian.cholesky(Side::Lower).map_err(|_| {
                BinningError::Estimator("Hessian is not positive definite".to_string())
            })?;
            let step = llt.solve(&grad);

            // Halve the Newton step until the objective does not increase
            let mut t = 1.0;
            let (candidate, candidate_loss) = loop {
                let candidate: Vec<f64> = (0..p).map(|j| beta[j] - t * step[(j, 0)]).collect();
                let candidate_loss = objective(&z, &y, &candidate, penalty);
                if candidate_loss <= loss || t < 1e-10 {
                    break (candidate, candidate_loss);
                }
                t *= 0.5;
            };

            let max_change = beta
                .iter()
                .zip(&candidate)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            beta = candidate;
            loss = candidate_loss;

            if !loss.is_finite() {
                return Err(BinningError::Estimator("objective diverged".to_string()));
            }
            if max_change < self.tol {
                debug!(iterations = iter + 1, loss, "logistic regression converged");
                return Ok(LinearModel {
                    intercept: beta[0],
                    coefficients: beta[1..].to_vec(),
                });
            }
        }

        Err(BinningError::Estimator(format!(
            "logistic regression did not converge in {} iterations",
            self.max_iter
        )))
    }
}
