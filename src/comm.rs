//! Rank queries and the particle partition across ranks.
//!
//! A run may be split over several processes. Each one knows its own rank
//! and the world size through a [`RankPartitioner`]; how those are obtained
//! (MPI or otherwise) is up to the caller.

use std::ops::Range;

use crate::error::{Result, SmcError};

pub trait RankPartitioner {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Whether this is rank zero, where root-only work such as reporting runs.
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// The communicator of a run without any distributed runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleRankComm;

impl RankPartitioner for SingleRankComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

/// A fixed rank and world size, for runtimes that hand those out up front
/// or for simulating several ranks in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticRankComm {
    rank: usize,
    size: usize,
}

impl StaticRankComm {
    pub fn new(rank: usize, size: usize) -> Result<Self> {
        check_rank(rank, size)?;
        Ok(Self { rank, size })
    }
}

impl RankPartitioner for StaticRankComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

pub(crate) fn check_rank(rank: usize, size: usize) -> Result<()> {
    if size == 0 || rank >= size {
        return Err(SmcError::InvalidCommunicator { rank, size });
    }
    Ok(())
}

/// Number of the `total` particles owned by `rank`.
///
/// Every rank gets `total / size`, and the first `total % size` ranks get
/// one more.
pub fn num_particles_in_partition(total: usize, rank: usize, size: usize) -> Result<usize> {
    check_rank(rank, size)?;
    let extra = usize::from(rank < total % size);
    Ok(total / size + extra)
}

/// Indices of the particles owned by `rank` when `total` particles are laid
/// out in rank order.
pub fn partition_range(total: usize, rank: usize, size: usize) -> Result<Range<usize>> {
    let count = num_particles_in_partition(total, rank, size)?;
    let start = rank * (total / size) + rank.min(total % size);
    Ok(start..start + count)
}

/// Particle counts of all ranks, in rank order.
pub fn partition_sizes(total: usize, size: usize) -> Result<Vec<usize>> {
    check_rank(0, size)?;
    (0..size)
        .map(|rank| num_particles_in_partition(total, rank, size))
        .collect()
}
