use crate::{Error, RegionConfig, Result};

use glam::UVec3;

/// An inclusive box of global voxel coordinates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Region {
    start: UVec3,
    end: UVec3,
}

impl Region {
    pub fn new(start: UVec3, end: UVec3) -> Result<Self> {
        if end.cmplt(start).any() {
            return Err(Error::EmptyRegion { start, end });
        }
        Ok(Self { start, end })
    }

    /// The region of `dims` voxels starting at `origin`. Zero dimensions are treated as one voxel.
    #[inline]
    pub(crate) fn from_origin_and_dims(origin: UVec3, dims: UVec3) -> Self {
        Self {
            start: origin,
            end: origin + dims.max(UVec3::ONE) - UVec3::ONE,
        }
    }

    /// The region covering a whole volume of `extent`.
    pub fn whole(extent: UVec3) -> Result<Self> {
        if extent.cmpeq(UVec3::ZERO).any() {
            return Err(Error::EmptyRegion {
                start: UVec3::ZERO,
                end: extent,
            });
        }
        Self::new(UVec3::ZERO, extent - UVec3::ONE)
    }

    /// Computes the padded bounding box of `points` inside a volume of `extent`.
    ///
    /// The tight box is first grown by `margin` on every side, then repeatedly grown in x and y by `increment` per side
    /// while it stays within `max_voxels`, and finally the leftover budget is spent symmetrically in z. The result never
    /// leaves the volume.
    pub fn from_points(points: &[UVec3], extent: UVec3, config: &RegionConfig) -> Result<Self> {
        let whole = Self::whole(extent)?;
        let Some(&first) = points.first() else {
            return Err(Error::NoSeeds);
        };

        let mut start = first;
        let mut end = first;
        for &p in points {
            whole.ensure_contains(p)?;
            start = start.min(p);
            end = end.max(p);
        }

        let last = whole.end;
        start = start.saturating_sub(UVec3::splat(config.margin));
        end = (end.saturating_add(UVec3::splat(config.margin))).min(last);

        let mut region = Self { start, end };
        if region.num_voxels() >= config.max_voxels {
            log::warn!(
                "Padded seed box of {} voxels already meets the ceiling of {}",
                region.num_voxels(),
                config.max_voxels
            );
            return Ok(region);
        }

        if config.increment > 0 {
            let grow = UVec3::new(config.increment, config.increment, 0);
            loop {
                let covers_xy = region.start.x == 0
                    && region.start.y == 0
                    && region.end.x == last.x
                    && region.end.y == last.y;
                if covers_xy {
                    break;
                }
                let candidate = Self {
                    start: region.start.saturating_sub(grow),
                    end: region.end.saturating_add(grow).min(last),
                };
                if candidate.num_voxels() > config.max_voxels {
                    break;
                }
                region = candidate;
            }
        }

        let remaining = config.max_voxels - region.num_voxels();
        let dims = region.dims();
        let per_slice = dims.x as u64 * dims.y as u64;
        let grow_z = (remaining / per_slice / 2).min(u32::MAX as u64) as u32;
        region.start.z = region.start.z.saturating_sub(grow_z);
        region.end.z = region.end.z.saturating_add(grow_z).min(last.z);

        Ok(region)
    }

    #[inline]
    pub fn start(&self) -> UVec3 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> UVec3 {
        self.end
    }

    /// `(width, height, length)` in voxels.
    #[inline]
    pub fn dims(&self) -> UVec3 {
        self.end - self.start + UVec3::ONE
    }

    #[inline]
    pub fn num_voxels(&self) -> u64 {
        let d = self.dims();
        d.x as u64 * d.y as u64 * d.z as u64
    }

    #[inline]
    pub fn contains(&self, voxel: UVec3) -> bool {
        voxel.cmpge(self.start).all() && voxel.cmple(self.end).all()
    }

    pub fn ensure_contains(&self, voxel: UVec3) -> Result<()> {
        if self.contains(voxel) {
            Ok(())
        } else {
            Err(Error::OutsideRegion {
                point: voxel,
                start: self.start,
                end: self.end,
            })
        }
    }

    /// Fails unless this region lies entirely inside a volume of `extent`.
    pub fn ensure_within(&self, extent: UVec3) -> Result<()> {
        if self.end.cmplt(extent).all() {
            Ok(())
        } else {
            Err(Error::RegionOutsideVolume {
                start: self.start,
                end: self.end,
                extent,
            })
        }
    }
}
