//! Conversion of traced paths into a [`BranchTree`].
//!
//! Every path first gets one item: the path that reached the endpoint becomes a root and every other path hangs off
//! the item of the path it ran into. Then each path is walked from its junction back to its seed, and every cross
//! point on it splits the segment being filled. Paths that join exactly at a split voxel are moved onto the segment
//! that is active there, so that every child hangs off the piece of its parent that it actually touches.

use crate::{BranchId, BranchTree, Error, PathStore, Result};

use ahash::AHashMap;
use glam::UVec3;
use smallvec::SmallVec;

/// Builds the branch hierarchy of `paths` into `tree` and returns the item of the first root path.
///
/// `endpoint` becomes the end voxel of every root. Returns `Ok(None)` if `paths` is empty. On error every item added
/// by this call is removed again, so `tree` is left as it was.
pub fn build_tree(
    paths: &PathStore,
    endpoint: UVec3,
    tree: &mut BranchTree,
) -> Result<Option<BranchId>> {
    let mut roots = Vec::new();
    let result = build_into(paths, endpoint, tree, &mut roots);
    if result.is_err() {
        // Every item built here hangs off one of these roots.
        for root in roots {
            if tree.remove(root).is_err() {
                log::warn!("Root {:?} vanished while undoing a failed reconstruction", root);
            }
        }
    }
    result
}

fn build_into(
    paths: &PathStore,
    endpoint: UVec3,
    tree: &mut BranchTree,
    roots: &mut Vec<BranchId>,
) -> Result<Option<BranchId>> {
    if paths.is_empty() {
        return Ok(None);
    }

    let mut items: Vec<BranchId> = Vec::with_capacity(paths.len());
    let mut joining_at: AHashMap<u32, SmallVec<[usize; 4]>> = AHashMap::new();
    for (index, path) in paths.iter().enumerate() {
        let seed = path.seed().map_or(endpoint, |e| e.voxel);
        let id = match path.parent {
            None => {
                let id = tree.add_new_branch()?;
                roots.push(id);
                if let Some(item) = tree.get_mut(id) {
                    item.set_start_voxel(seed);
                    item.set_end_voxel(endpoint);
                }
                id
            }
            Some(parent) => {
                let Some(&parent_id) = items.get(parent) else {
                    return Err(Error::DanglingParent {
                        path: index,
                        parent,
                    });
                };
                let id = tree.add_child(parent_id)?;
                let junction = path.junction().map_or(seed, |e| e.voxel);
                if let Some(item) = tree.get_mut(id) {
                    item.set_start_voxel(seed);
                    item.set_end_voxel(junction);
                }
                if let Some(first) = path.junction() {
                    joining_at.entry(first.offset).or_default().push(index);
                }
                id
            }
        };
        items.push(id);
    }

    for (index, path) in paths.iter().enumerate() {
        let crosses: SmallVec<[UVec3; 8]> = path
            .elements
            .iter()
            .filter(|e| e.is_cross_point)
            .map(|e| e.voxel)
            .collect();
        let seed = path.seed().map_or(endpoint, |e| e.voxel);

        let mut active = items[index];
        let mut num_crosses = 0;
        for element in &path.elements {
            if element.is_cross_point {
                num_crosses += 1;
                let cross = element.voxel;
                if let Some(item) = tree.get_mut(active) {
                    item.set_start_voxel(cross);
                }

                if let Some(joining) = joining_at.get(&element.offset) {
                    for &k in joining.iter().filter(|&&k| k != index) {
                        if tree.parent(items[k]) != Some(active) {
                            log::debug!(
                                "Moving branch of path {} onto the segment split at {}",
                                k,
                                cross
                            );
                            tree.reparent(items[k], Some(active))?;
                        }
                    }
                }

                let piece = tree.add_child(active)?;
                let piece_end = crosses.get(num_crosses).copied().unwrap_or(seed);
                if let Some(item) = tree.get_mut(piece) {
                    item.set_start_voxel(cross);
                    item.set_end_voxel(piece_end);
                }
                if let Some(item) = tree.get_mut(active) {
                    item.add_center(cross.as_vec3());
                }
                log::debug!("Split path {} at {}", index, cross);
                active = piece;
            }
            if let Some(item) = tree.get_mut(active) {
                item.add_center(element.voxel.as_vec3());
            }
        }
    }

    for &root in roots.iter() {
        tree.correct_branchpoints(root);
    }

    Ok(items.first().copied())
}
