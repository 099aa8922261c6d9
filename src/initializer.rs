//! Construction of the first particle population of an SMC run.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    comm::{
        check_rank, num_particles_in_partition, partition_range, RankPartitioner, SingleRankComm,
    },
    error::{Result, SmcError},
    kernel::InferenceKernel,
    particles::WeightedParticles,
    samples::ParameterSamples,
};

#[derive(Clone, Debug, Copy, Serialize, Deserialize)]
pub struct InitializerSettings {
    /// Treat the samples passed to
    /// [`Initializer::initialize_particles_from_samples`] as the pool of all
    /// ranks and keep only the slice owned by this rank.
    pub partition_samples: bool,
}

impl Default for InitializerSettings {
    fn default() -> Self {
        Self {
            partition_samples: true,
        }
    }
}

/// Builds [`WeightedParticles`] either from the prior of an
/// [`InferenceKernel`] or from existing samples by importance sampling.
///
/// The requested number of particles is split over the ranks of the
/// communicator, and every rank builds only its own part.
#[derive(Debug)]
pub struct Initializer<K: InferenceKernel, C: RankPartitioner = SingleRankComm> {
    kernel: K,
    comm: C,
    settings: InitializerSettings,
}

fn check_kernel<K: InferenceKernel>(kernel: &K) -> Result<()> {
    let names = kernel.param_names();
    if names.is_empty() {
        return Err(SmcError::InvalidKernel(
            "kernel declares no parameters".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(names.len());
    if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(SmcError::InvalidKernel(format!(
            "kernel declares parameter `{dup}` twice"
        )));
    }
    Ok(())
}

impl<K: InferenceKernel> Initializer<K> {
    /// Initializer for a single process.
    pub fn new(kernel: K) -> Result<Self> {
        Self::with_comm(kernel, SingleRankComm)
    }
}

impl<K: InferenceKernel, C: RankPartitioner> Initializer<K, C> {
    pub fn with_comm(kernel: K, comm: C) -> Result<Self> {
        Self::with_settings(kernel, comm, InitializerSettings::default())
    }

    /// Fails if the kernel or the communicator are unusable, before any
    /// sampling happens.
    pub fn with_settings(kernel: K, comm: C, settings: InitializerSettings) -> Result<Self> {
        check_kernel(&kernel)?;
        check_rank(comm.rank(), comm.size())?;
        Ok(Self {
            kernel,
            comm,
            settings,
        })
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn settings(&self) -> &InitializerSettings {
        &self.settings
    }

    pub fn into_kernel(self) -> K {
        self.kernel
    }

    /// Share of `total` particles that belongs to `rank` of this
    /// communicator.
    pub fn get_num_particles_in_partition(&self, total: usize, rank: usize) -> Result<usize> {
        num_particles_in_partition(total, rank, self.comm.size())
    }

    /// Draw this rank's share of `total` particles from the prior.
    ///
    /// Every particle gets the raw log weight `ln(1 / total)`, based on the
    /// global count so that weights agree across ranks.
    pub fn initialize_particles_from_prior<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        total: usize,
    ) -> Result<WeightedParticles> {
        let count = self.get_num_particles_in_partition(total, self.comm.rank())?;
        debug!(
            rank = self.comm.rank(),
            size = self.comm.size(),
            total,
            count,
            "Sampling initial particles from prior"
        );

        let samples = self
            .kernel
            .sample_from_prior(rng, count)
            .map_err(SmcError::Kernel)?;
        if samples.num_samples() != count {
            return Err(SmcError::LengthMismatch {
                what: "prior samples",
                expected: count,
                found: samples.num_samples(),
            });
        }

        let log_likes = self
            .kernel
            .log_likelihoods(&samples)
            .map_err(SmcError::Kernel)?;
        let log_weights = vec![-(total as f64).ln(); count];
        WeightedParticles::new(samples, log_likes, log_weights)
    }

    /// Importance sampling from existing samples.
    ///
    /// `proposal_densities[i]` is the density of the distribution that
    /// produced sample `i`. The raw log weight of a particle is
    /// `log_prior - ln(proposal_density)`. If
    /// [`InitializerSettings::partition_samples`] is set, only this rank's
    /// contiguous slice of the samples is used.
    pub fn initialize_particles_from_samples(
        &mut self,
        samples: &ParameterSamples,
        proposal_densities: &[f64],
    ) -> Result<WeightedParticles> {
        if proposal_densities.len() != samples.num_samples() {
            return Err(SmcError::LengthMismatch {
                what: "proposal densities",
                expected: samples.num_samples(),
                found: proposal_densities.len(),
            });
        }

        let range = if self.settings.partition_samples {
            partition_range(samples.num_samples(), self.comm.rank(), self.comm.size())?
        } else {
            0..samples.num_samples()
        };
        debug!(
            rank = self.comm.rank(),
            size = self.comm.size(),
            start = range.start,
            end = range.end,
            "Initializing particles from samples"
        );
        let local = samples.slice(range.clone());
        let densities = &proposal_densities[range];

        let log_likes = self
            .kernel
            .log_likelihoods(&local)
            .map_err(SmcError::Kernel)?;
        let log_priors = self
            .kernel
            .log_priors(&local)
            .map_err(SmcError::Kernel)?;
        if log_priors.len() != local.num_samples() {
            return Err(SmcError::LengthMismatch {
                what: "log priors",
                expected: local.num_samples(),
                found: log_priors.len(),
            });
        }

        let log_weights: Vec<f64> = log_priors
            .iter()
            .zip(densities)
            .map(|(log_prior, density)| log_prior - density.ln())
            .collect();
        WeightedParticles::new(local, log_likes, log_weights)
    }
}
