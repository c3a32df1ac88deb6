use crate::{simplify, BranchId, Label};

use glam::{UVec2, UVec3, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Truncation slack when snapping centerline points back onto the voxel lattice.
const SNAP: f32 = 0.0001;

/// One segment of a traced structure: a centerline running from `start_voxel` towards `end_voxel`.
///
/// Parent and child links are owned by the [`BranchTree`](crate::BranchTree) and can only be edited through it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchItem {
    pub(crate) label: Label,
    pub(crate) parent: Option<BranchId>,
    pub(crate) children: Vec<BranchId>,
    centerline: Vec<Vec3>,
    start_voxel: UVec3,
    end_voxel: UVec3,
}

impl BranchItem {
    pub(crate) fn new(label: Label, parent: Option<BranchId>) -> Self {
        Self {
            label,
            parent,
            children: Vec::new(),
            centerline: Vec::new(),
            start_voxel: UVec3::ZERO,
            end_voxel: UVec3::ZERO,
        }
    }

    #[inline]
    pub fn label(&self) -> Label {
        self.label
    }

    #[inline]
    pub fn parent(&self) -> Option<BranchId> {
        self.parent
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn children(&self) -> &[BranchId] {
        &self.children
    }

    #[inline]
    pub fn centerline(&self) -> &[Vec3] {
        &self.centerline
    }

    #[inline]
    pub fn centerline_mut(&mut self) -> &mut Vec<Vec3> {
        &mut self.centerline
    }

    #[inline]
    pub fn add_center(&mut self, point: Vec3) {
        self.centerline.push(point);
    }

    #[inline]
    pub fn center_at(&self, index: usize) -> Option<Vec3> {
        self.centerline.get(index).copied()
    }

    #[inline]
    pub fn start_voxel(&self) -> UVec3 {
        self.start_voxel
    }

    #[inline]
    pub fn set_start_voxel(&mut self, voxel: UVec3) {
        self.start_voxel = voxel;
    }

    #[inline]
    pub fn end_voxel(&self) -> UVec3 {
        self.end_voxel
    }

    #[inline]
    pub fn set_end_voxel(&mut self, voxel: UVec3) {
        self.end_voxel = voxel;
    }

    /// Douglas-Peucker simplification of the centerline in place. See [`simplify::simplify`].
    pub fn simplify(&mut self, epsilon: f32, spacing: Vec3) {
        simplify::simplify(&mut self.centerline, epsilon, spacing);
    }

    /// Like [`simplify`](Self::simplify), but leaves the centerline as it is.
    pub fn simplified(&self, epsilon: f32, spacing: Vec3) -> Vec<Vec3> {
        simplify::simplified(&self.centerline, epsilon, spacing)
    }

    /// The `(x, y)` lattice positions of the centerline points lying on slice `slice`, in centerline order.
    pub fn centerline_slice(&self, slice: u32) -> Vec<UVec2> {
        let mut out = Vec::new();
        self.extend_centerline_slice(slice, &mut out);
        out
    }

    pub(crate) fn extend_centerline_slice(&self, slice: u32, out: &mut Vec<UVec2>) {
        for p in &self.centerline {
            if (p.z + SNAP) as u32 == slice {
                out.push(UVec2::new((p.x + SNAP) as u32, (p.y + SNAP) as u32));
            }
        }
    }
}
