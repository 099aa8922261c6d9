//! The model-side interface used to seed a particle population.

use anyhow::Result;
use rand::Rng;

use crate::samples::ParameterSamples;

/// Prior sampling and density evaluation for a Bayesian model.
///
/// Implementations are typically backed by an MCMC kernel. All densities are
/// natural logarithms, one value per sample, in sample order.
pub trait InferenceKernel {
    /// Names of the model parameters, in the column order the kernel uses.
    ///
    /// Checked when an [`Initializer`](crate::Initializer) is created: the
    /// list must be non-empty and free of duplicates.
    fn param_names(&self) -> &[String];

    /// Draw `count` samples from the prior.
    fn sample_from_prior<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        count: usize,
    ) -> Result<ParameterSamples>;

    fn log_likelihoods(&mut self, samples: &ParameterSamples) -> Result<Vec<f64>>;

    fn log_priors(&mut self, samples: &ParameterSamples) -> Result<Vec<f64>>;
}

impl<K: InferenceKernel + ?Sized> InferenceKernel for &mut K {
    fn param_names(&self) -> &[String] {
        (**self).param_names()
    }

    fn sample_from_prior<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        count: usize,
    ) -> Result<ParameterSamples> {
        (**self).sample_from_prior(rng, count)
    }

    fn log_likelihoods(&mut self, samples: &ParameterSamples) -> Result<Vec<f64>> {
        (**self).log_likelihoods(samples)
    }

    fn log_priors(&mut self, samples: &ParameterSamples) -> Result<Vec<f64>> {
        (**self).log_priors(samples)
    }
}
