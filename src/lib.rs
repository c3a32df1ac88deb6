//! Seeded livewire centerline tracing over 3D scalar volumes.
//!
//! Given a few seed voxels placed on a tubular structure (vessels, roots, airways) and one endpoint, a
//! [`PathSearch`](crate::PathSearch) finds a minimum-cost path from every seed into the part of the structure that was
//! already traced, and a [`BranchTree`](crate::BranchTree) is built from those paths: one root that reaches the
//! endpoint, with every other path hanging off the segment it joins.
//!
//! ```
//! use livewire_tree::{glam::UVec3, BranchTree, DenseVolume, PathSearch, RegionConfig};
//!
//! // A bright 3x3 tube along z in a dark background.
//! let extent = UVec3::new(7, 7, 12);
//! let mut volume = DenseVolume::from_fn(extent, |p| if p.x < 3 && p.y < 3 { 1280.0 } else { 500.0 });
//!
//! let seed = UVec3::new(1, 1, 0);
//! let endpoint = UVec3::new(1, 1, 11);
//! let mut search = PathSearch::default();
//! search.init_around(&[seed, endpoint], &volume, &RegionConfig::default()).unwrap();
//!
//! let mut tree = BranchTree::new();
//! let outcome = search.trace(&mut volume, &[seed], endpoint, &mut tree).unwrap();
//! let root = tree.get(outcome.root.unwrap()).unwrap();
//! assert_eq!(root.centerline().len(), 12);
//! ```
//!
//! # Cost model
//!
//! The cost of stepping onto a cell is its static traversal cost (a mix of a banded intensity term and a clamped
//! gradient term, see [`CostModel`](crate::CostModel)) plus a constant step cost. Cells at or below
//! [`TracerConfig::foreground_threshold`](crate::TracerConfig::foreground_threshold) are never entered.
//!
//! # Performance
//!
//! - grid memory: one [`Cell`](crate::Cell) (24 bytes) per voxel of the traced region, allocated once per run
//! - extraction from the active list: O(log n), with lazy deletion after cost decreases
//! - branch access by [`BranchId`](crate::BranchId): O(1)

mod active;
mod allocator;
mod branch;
mod config;
mod cost;
mod error;
mod grid;
mod label;
mod path;
mod reconstruct;
mod region;
mod search;
mod tree;
mod volume;

pub mod simplify;

pub use active::ActiveList;
pub use allocator::BranchId;
pub use branch::BranchItem;
pub use config::*;
pub use cost::{build_cost_field, gradient_term, intensity_band, traversal_cost, Cell, INTENSITY_CEILING};
pub use error::{Error, Result};
pub use grid::{Grid, GridShape, Neighborhood};
pub use label::{Label, LabelAllocator};
pub use path::{PathElement, PathStore, TracedPath};
pub use reconstruct::build_tree;
pub use region::Region;
pub use search::{FailureReason, PathSearch, SeedFailure, TraceOutcome};
pub use tree::{BranchTree, VisitCommand};
pub use volume::{DenseVolume, VolumeAccess};

pub use glam;
