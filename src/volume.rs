use glam::UVec3;
use ndshape::{RuntimeShape, Shape};
use std::fmt;

/// Point-wise access to the scalar volume being traced.
///
/// Coordinates are global voxel coordinates `(x, y, slice)`. Samples are read from the source image while
/// [`mark`](VolumeAccess::mark) writes into a separate output channel; the tracer paints traced paths and probed wide
/// structures through it and never reads the marks back.
pub trait VolumeAccess {
    /// `(width, height, num_slices)`.
    fn extent(&self) -> UVec3;

    /// Intensity at `voxel`. Out-of-range reads return whatever default the implementation documents.
    fn sample(&self, voxel: UVec3) -> f32;

    fn mark(&mut self, voxel: UVec3, value: f32);
}

/// An in-memory volume with a source image and an output mark image of the same extent.
///
/// Out-of-range samples read as `0.0` and out-of-range marks are ignored.
#[derive(Clone)]
pub struct DenseVolume {
    shape: RuntimeShape<u32, 3>,
    extent: UVec3,
    samples: Vec<f32>,
    marks: Vec<f32>,
}

impl DenseVolume {
    pub fn new(extent: UVec3, fill: f32) -> Self {
        let shape = RuntimeShape::<u32, 3>::new(extent.to_array());
        let len = shape.usize();
        Self {
            shape,
            extent,
            samples: vec![fill; len],
            marks: vec![0.0; len],
        }
    }

    pub fn from_fn(extent: UVec3, mut f: impl FnMut(UVec3) -> f32) -> Self {
        let mut volume = Self::new(extent, 0.0);
        for i in 0..volume.samples.len() {
            let p = UVec3::from(volume.shape.delinearize(i as u32));
            volume.samples[i] = f(p);
        }
        volume
    }

    #[inline]
    pub fn contains(&self, voxel: UVec3) -> bool {
        voxel.cmplt(self.extent).all()
    }

    pub fn set_sample(&mut self, voxel: UVec3, value: f32) {
        if let Some(i) = self.index(voxel) {
            self.samples[i] = value;
        }
    }

    /// The last value marked at `voxel`, or `0.0` if it was never marked.
    pub fn mark_at(&self, voxel: UVec3) -> f32 {
        self.index(voxel).map_or(0.0, |i| self.marks[i])
    }

    /// Iterates over every voxel with a nonzero mark.
    pub fn marked_voxels(&self) -> impl Iterator<Item = (UVec3, f32)> + '_ {
        self.marks
            .iter()
            .enumerate()
            .filter(|(_, m)| **m != 0.0)
            .map(move |(i, &m)| (UVec3::from(self.shape.delinearize(i as u32)), m))
    }

    pub fn clear_marks(&mut self) {
        self.marks.iter_mut().for_each(|m| *m = 0.0);
    }

    #[inline]
    fn index(&self, voxel: UVec3) -> Option<usize> {
        self.contains(voxel)
            .then(|| self.shape.linearize(voxel.to_array()) as usize)
    }
}

impl fmt::Debug for DenseVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseVolume")
            .field("extent", &self.extent)
            .field("marked", &self.marks.iter().filter(|m| **m != 0.0).count())
            .finish()
    }
}

impl VolumeAccess for DenseVolume {
    #[inline]
    fn extent(&self) -> UVec3 {
        self.extent
    }

    #[inline]
    fn sample(&self, voxel: UVec3) -> f32 {
        self.index(voxel).map_or(0.0, |i| self.samples[i])
    }

    #[inline]
    fn mark(&mut self, voxel: UVec3, value: f32) {
        if let Some(i) = self.index(voxel) {
            self.marks[i] = value;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn samples_and_marks_are_separate_channels() {
        let mut volume = DenseVolume::from_fn(UVec3::new(4, 3, 2), |p| (p.x + 10 * p.y + 100 * p.z) as f32);
        assert_eq!(volume.sample(UVec3::new(3, 2, 1)), 123.0);

        volume.mark(UVec3::new(3, 2, 1), 4000.0);
        assert_eq!(volume.sample(UVec3::new(3, 2, 1)), 123.0);
        assert_eq!(volume.mark_at(UVec3::new(3, 2, 1)), 4000.0);

        let marked: Vec<_> = volume.marked_voxels().collect();
        assert_eq!(marked, vec![(UVec3::new(3, 2, 1), 4000.0)]);
    }

    #[test]
    fn debug_output_summarizes_marks() {
        let mut volume = DenseVolume::new(UVec3::new(3, 2, 1), 500.0);
        volume.mark(UVec3::ZERO, 4000.0);
        volume.mark(UVec3::new(2, 1, 0), 3999.0);
        let printed = format!("{:?}", volume.clone());
        assert!(printed.starts_with("DenseVolume { extent: "));
        assert!(printed.ends_with("marked: 2 }"));
    }

    #[test]
    fn out_of_range_access_is_benign() {
        let mut volume = DenseVolume::new(UVec3::splat(2), 700.0);
        assert_eq!(volume.sample(UVec3::new(2, 0, 0)), 0.0);
        volume.mark(UVec3::new(0, 5, 0), 1.0);
        assert_eq!(volume.marked_voxels().count(), 0);
    }
}
