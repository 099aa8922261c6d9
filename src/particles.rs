//! Weighted particle populations.
//!
//! A [`WeightedParticles`] holds parameter values, log likelihoods and
//! normalized log weights for a fixed number of particles and computes
//! weighted summary statistics over them.

use std::collections::HashMap;

use faer::{Mat, MatRef, Scale};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SmcError},
    math::{normalize_log_weights, package_by_name, repair_covariance, symmetrize},
    samples::ParameterSamples,
};

#[derive(Clone, Debug, Copy, Serialize, Deserialize)]
pub struct CovarianceSettings {
    /// Relative amount by which an eigenvalue may be negative before the
    /// covariance matrix counts as indefinite.
    pub eigval_tolerance: f64,
}

impl Default for CovarianceSettings {
    fn default() -> Self {
        Self {
            eigval_tolerance: 1e-10,
        }
    }
}

/// A population of particles for sequential Monte Carlo sampling.
///
/// Log weights are normalized once, at construction, so that the weights
/// always sum to one. The population is immutable afterwards; `clone` (or
/// [`WeightedParticles::copy`]) gives an independent deep copy.
#[derive(Debug, Clone)]
pub struct WeightedParticles {
    params: ParameterSamples,
    log_likes: Box<[f64]>,
    log_weights: Box<[f64]>,
    weights: Box<[f64]>,
}

impl WeightedParticles {
    /// Create a population from parameter samples, log likelihoods and raw
    /// (unnormalized) log weights. Both vectors need one entry per sample.
    pub fn new(
        params: ParameterSamples,
        log_likes: impl AsRef<[f64]>,
        log_weights: impl AsRef<[f64]>,
    ) -> Result<Self> {
        let num_particles = params.num_samples();

        let log_likes: Box<[f64]> = log_likes.as_ref().into();
        if log_likes.len() != num_particles {
            return Err(SmcError::LengthMismatch {
                what: "log likelihoods",
                expected: num_particles,
                found: log_likes.len(),
            });
        }

        let log_weights = log_weights.as_ref();
        if log_weights.len() != num_particles {
            return Err(SmcError::LengthMismatch {
                what: "log weights",
                expected: num_particles,
                found: log_weights.len(),
            });
        }
        let log_weights = normalize_log_weights(log_weights)?;
        let weights = log_weights.iter().map(|w| w.exp()).collect();

        Ok(Self {
            params,
            log_likes,
            log_weights,
            weights,
        })
    }

    /// Convenience constructor from `(name, column)` pairs.
    pub fn from_columns<I, S, C>(
        columns: I,
        log_likes: impl AsRef<[f64]>,
        log_weights: impl AsRef<[f64]>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: AsRef<[f64]>,
    {
        Self::new(ParameterSamples::new(columns)?, log_likes, log_weights)
    }

    pub fn num_particles(&self) -> usize {
        self.params.num_samples()
    }

    pub fn num_params(&self) -> usize {
        self.params.num_params()
    }

    pub fn param_names(&self) -> &[String] {
        self.params.names()
    }

    /// Parameter values, one row per particle.
    pub fn params(&self) -> MatRef<'_, f64> {
        self.params.values()
    }

    pub fn samples(&self) -> &ParameterSamples {
        &self.params
    }

    pub fn param_dict(&self) -> HashMap<String, Vec<f64>> {
        self.params.to_map()
    }

    pub fn log_likes(&self) -> &[f64] {
        &self.log_likes
    }

    pub fn log_weights(&self) -> &[f64] {
        &self.log_weights
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Deep copy of the whole population.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Label positional statistics with the parameter names.
    pub fn package(&self, values: &[f64]) -> HashMap<String, f64> {
        package_by_name(self.param_names(), values)
    }

    fn sum_squared_weights(&self) -> f64 {
        self.weights.iter().map(|w| w * w).sum()
    }

    /// Effective sample size `1 / sum(w^2)`; zero for an empty population.
    pub fn compute_ess(&self) -> f64 {
        if self.weights.is_empty() {
            return 0f64;
        }
        self.sum_squared_weights().recip()
    }

    /// Weighted mean of each parameter.
    pub fn compute_mean(&self) -> Box<[f64]> {
        let values = self.params();
        (0..self.num_params())
            .map(|j| {
                if self.weights.is_empty() {
                    return f64::NAN;
                }
                self.weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| w * values[(i, j)])
                    .sum()
            })
            .collect()
    }

    /// Bias-corrected weighted variance of each parameter,
    /// `sum(w * (x - mean)^2) / (1 - sum(w^2))`.
    ///
    /// The denominator goes to zero as the weight concentrates on a single
    /// particle, in which case the result is infinite or NaN.
    pub fn compute_variance(&self) -> Box<[f64]> {
        if self.weights.is_empty() {
            return vec![f64::NAN; self.num_params()].into();
        }
        let means = self.compute_mean();
        let norm = 1f64 - self.sum_squared_weights();
        let values = self.params();
        means
            .iter()
            .enumerate()
            .map(|(j, mean)| {
                let sum: f64 = self
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| {
                        let diff = values[(i, j)] - mean;
                        w * diff * diff
                    })
                    .sum();
                sum / norm
            })
            .collect()
    }

    pub fn compute_std_dev(&self) -> Box<[f64]> {
        self.compute_variance().iter().map(|v| v.sqrt()).collect()
    }

    /// Weighted covariance matrix with default [`CovarianceSettings`].
    pub fn compute_covariance(&self) -> Mat<f64> {
        self.compute_covariance_with(&CovarianceSettings::default())
    }

    /// Weighted covariance matrix `diff^T (w * diff) / (1 - sum(w^2))`.
    ///
    /// The result is symmetric. If it is not positive semi-definite a warning
    /// is logged and every off-diagonal entry is set to zero, keeping the
    /// variances on the diagonal. An empty population gives a NaN matrix.
    pub fn compute_covariance_with(&self, settings: &CovarianceSettings) -> Mat<f64> {
        if self.weights.is_empty() {
            return Mat::from_fn(self.num_params(), self.num_params(), |_, _| f64::NAN);
        }
        let means = self.compute_mean();
        let values = self.params();
        let diff = Mat::from_fn(self.num_particles(), self.num_params(), |i, j| {
            values[(i, j)] - means[j]
        });
        let weighted = Mat::from_fn(self.num_particles(), self.num_params(), |i, j| {
            diff[(i, j)] * self.weights[i]
        });

        let mut cov = diff.transpose() * &weighted;
        cov *= Scale((1f64 - self.sum_squared_weights()).recip());
        symmetrize(&mut cov);
        repair_covariance(&mut cov, settings.eigval_tolerance);
        cov
    }
}
