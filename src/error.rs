use crate::{BranchId, TraceOutcome};

use glam::UVec3;
use thiserror::Error;

/// Everything that can go wrong while setting up a trace or editing a [`BranchTree`](crate::BranchTree).
///
/// A seed that cannot be traced is *not* an error. It is reported as a [`SeedFailure`](crate::SeedFailure) in the
/// [`TraceOutcome`](crate::TraceOutcome) and the run carries on with the next seed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to allocate a search grid of {voxels} voxels")]
    Allocation { voxels: usize },

    #[error("path search is not initialized")]
    NotInitialized,

    #[error("no seeds were given")]
    NoSeeds,

    #[error("{count} seeds given but only {max} path codes are distinguishable")]
    TooManySeeds { count: usize, max: usize },

    #[error("voxel {point} lies outside the traced region {start}..={end}")]
    OutsideRegion {
        point: UVec3,
        start: UVec3,
        end: UVec3,
    },

    #[error("region {start}..={end} is not inside the volume extent {extent}")]
    RegionOutsideVolume {
        start: UVec3,
        end: UVec3,
        extent: UVec3,
    },

    #[error("region {start}..={end} contains no voxels")]
    EmptyRegion { start: UVec3, end: UVec3 },

    #[error("no branch labels are available")]
    LabelsExhausted,

    #[error("branch {0:?} does not exist")]
    UnknownBranch(BranchId),

    #[error("cannot attach branch {child:?} beneath its own descendant {parent:?}")]
    CyclicReparent { child: BranchId, parent: BranchId },

    #[error("path {path} names parent path {parent}, which was not stored before it")]
    DanglingParent { path: usize, parent: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The paths were traced and painted, but the branch tree could not be built from them. The tree is left as it
    /// was before the run and `outcome` carries the paths and failed seeds, with no root.
    #[error("could not build the branch tree of {} traced paths", .outcome.paths.len())]
    Reconstruction {
        #[source]
        source: Box<Error>,
        outcome: Box<TraceOutcome>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
