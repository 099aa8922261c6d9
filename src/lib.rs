//! Particle populations for sequential Monte Carlo (SMC) sampling.
//!
//! The crate holds one weighted population of parameter hypotheses
//! ([`WeightedParticles`]) together with its weighted statistics, and an
//! [`Initializer`] that builds the first population of a run, either from
//! the prior of an [`InferenceKernel`] or from existing samples by
//! importance sampling. Particle counts are split evenly over the ranks of
//! a [`RankPartitioner`], so that several processes can each hold a
//! disjoint share of the population.
//!
//! ```
//! use smc_rs::WeightedParticles;
//!
//! let particles = WeightedParticles::from_columns(
//!     [("mu", vec![0.5, 1.5, 2.5]), ("sigma", vec![1.0, 2.0, 1.5])],
//!     [-3.2, -1.1, -2.4],
//!     [0.0, 0.0, 0.0],
//! )
//! .unwrap();
//!
//! assert!((particles.compute_ess() - 3.0).abs() < 1e-12);
//! let mean = particles.package(&particles.compute_mean());
//! assert!((mean["mu"] - 1.5).abs() < 1e-12);
//! ```

pub(crate) mod comm;
pub(crate) mod error;
pub(crate) mod initializer;
pub(crate) mod kernel;
pub mod math;
pub(crate) mod particles;
pub(crate) mod samples;

pub use comm::{
    num_particles_in_partition, partition_range, partition_sizes, RankPartitioner,
    SingleRankComm, StaticRankComm,
};
pub use error::{Result, SmcError};
pub use initializer::{Initializer, InitializerSettings};
pub use kernel::InferenceKernel;
pub use particles::{CovarianceSettings, WeightedParticles};
pub use samples::ParameterSamples;
