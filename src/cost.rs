//! The static cost field.
//!
//! Every cell of the traced region gets a traversal cost that mixes a banded intensity term with a clamped gradient
//! term. Bright tubular foreground is cheap, dim tissue gets progressively more expensive and background is effectively
//! impassable.

use crate::{CostModel, Grid, Region, Result, VolumeAccess};

use glam::UVec3;

/// Samples at or above this are clamped to it before any other use.
pub const INTENSITY_CEILING: f32 = 1300.0;

/// Search state of one voxel of the traced region. The cell's offset is its index in the [`Grid`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    /// Clamped sample, overwritten with a path code once a path is painted through the cell.
    pub intensity: f32,
    /// Accumulated path cost, infinite until the cell is reached.
    pub cost: f32,
    pub traversal_cost: f32,
    pub visited: bool,
    /// Set on the first cell expanded by the whole run.
    pub is_origin: bool,
    /// Settled while tracing a seed that succeeded.
    pub settled_before: bool,
    pub predecessor: Option<u32>,
}

impl Cell {
    #[inline]
    pub fn new(intensity: f32, traversal_cost: f32) -> Self {
        Self {
            intensity,
            cost: f32::INFINITY,
            traversal_cost,
            visited: false,
            is_origin: false,
            settled_before: false,
            predecessor: None,
        }
    }

    /// Forgets the search state of the current seed, keeping the intensity and static cost.
    #[inline]
    pub fn reset_search(&mut self) {
        self.cost = f32::INFINITY;
        self.visited = false;
        self.predecessor = None;
    }
}

/// Maps a raw sample to `(clamped_intensity, intensity_term)`.
///
/// | sample | term |
/// |---|---|
/// | `(1250, 1300)` | `100` |
/// | `(1150, 1250]` | `10_000` |
/// | `(1000, 1150]` | `1_000_000` |
/// | `<= 1000` | `1e10` |
/// | `>= 1300` | `0`, sample clamped to `1300` |
pub fn intensity_band(sample: f32) -> (f32, f32) {
    if sample > 1250.0 && sample < INTENSITY_CEILING {
        (sample, 100.0)
    } else if sample > 1150.0 && sample <= 1250.0 {
        (sample, 10_000.0)
    } else if sample > 1000.0 && sample <= 1150.0 {
        (sample, 1_000_000.0)
    } else if sample <= 1000.0 {
        (sample, 1e10)
    } else {
        (INTENSITY_CEILING, 0.0)
    }
}

/// Maps a gradient magnitude to the gradient term of the traversal cost.
#[inline]
pub fn gradient_term(model: &CostModel, magnitude: f32) -> f32 {
    if magnitude > model.gradient_clamp {
        model.gradient_cap
    } else {
        magnitude / model.gradient_clamp * model.gradient_cap
    }
}

#[inline]
pub fn traversal_cost(model: &CostModel, gradient_term: f32, intensity_term: f32) -> f32 {
    gradient_term * model.gradient_weight + intensity_term * model.intensity_weight
}

/// Samples `region` out of `volume` and computes the traversal cost of every cell.
///
/// The gradient of a cell is the backward difference against its `-x`, `-y` and `-z` neighbors, so cells on the three
/// low faces of the region get [`CostModel::missing_gradient`] instead.
pub fn build_cost_field(
    region: Region,
    volume: &impl VolumeAccess,
    model: &CostModel,
) -> Result<Grid<Cell>> {
    // First pass keeps the intensity term in `traversal_cost` until the gradients are known.
    let mut grid = Grid::try_from_fn(region, |_, voxel| {
        let (intensity, term) = intensity_band(volume.sample(voxel));
        Cell::new(intensity, term)
    })?;

    let shape = grid.shape().clone();
    for offset in 0..grid.len() as u32 {
        let local = shape.local(offset);
        let gradient = if local.cmpgt(UVec3::ZERO).all() {
            let here = grid[offset].intensity;
            let dx = here - grid[shape.offset(local - UVec3::X)].intensity;
            let dy = here - grid[shape.offset(local - UVec3::Y)].intensity;
            let dz = here - grid[shape.offset(local - UVec3::Z)].intensity;
            gradient_term(model, (dx * dx + dy * dy + dz * dz).sqrt())
        } else {
            model.missing_gradient
        };
        let cell = &mut grid[offset];
        cell.traversal_cost = traversal_cost(model, gradient, cell.traversal_cost);
    }

    Ok(grid)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::DenseVolume;

    #[test]
    fn bright_band_is_cheaper_than_dim_band() {
        let model = CostModel::default();
        for (bright, dim) in [(1251.0, 1250.0), (1299.0, 1151.0), (1280.0, 1200.0)] {
            let (_, bright_term) = intensity_band(bright);
            let (_, dim_term) = intensity_band(dim);
            assert!(bright_term < dim_term);
            assert!(traversal_cost(&model, 5.0, bright_term) < traversal_cost(&model, 5.0, dim_term));
        }
    }

    #[test]
    fn bands_and_clamp() {
        assert_eq!(intensity_band(1280.0), (1280.0, 100.0));
        assert_eq!(intensity_band(1250.0), (1250.0, 10_000.0));
        assert_eq!(intensity_band(1150.0), (1150.0, 1_000_000.0));
        assert_eq!(intensity_band(1000.0), (1000.0, 1e10));
        assert_eq!(intensity_band(4000.0), (1300.0, 0.0));
        assert_eq!(intensity_band(1300.0), (1300.0, 0.0));
    }

    #[test]
    fn gradient_saturates() {
        let model = CostModel::default();
        assert_eq!(gradient_term(&model, 0.0), 0.0);
        assert_eq!(gradient_term(&model, 85.0), 500.0);
        assert_eq!(gradient_term(&model, 170.0), 1000.0);
        assert_eq!(gradient_term(&model, 900.0), 1000.0);
    }

    #[test]
    fn field_uses_backward_differences() {
        // Uniform foreground except one brighter voxel.
        let mut volume = DenseVolume::new(UVec3::splat(3), 1260.0);
        volume.set_sample(UVec3::new(1, 1, 1), 1290.0);
        let model = CostModel::default();
        let grid = build_cost_field(Region::whole(UVec3::splat(3)).unwrap(), &volume, &model).unwrap();
        let shape = grid.shape().clone();

        // Low faces have no full backward neighborhood.
        let face = &grid[shape.offset(UVec3::new(0, 2, 2))];
        assert_eq!(face.traversal_cost, 0.8 * 1.0 + 0.2 * 100.0);

        // |(30, 30, 30)| = 51.96..., well below the clamp.
        let bright = &grid[shape.offset(UVec3::ONE)];
        let expected = (30.0f32 * 30.0 * 3.0).sqrt() / 170.0 * 1000.0 * 0.8 + 20.0;
        assert!((bright.traversal_cost - expected).abs() < 1e-3);
        assert_eq!(bright.cost, f32::INFINITY);
        assert_eq!(bright.predecessor, None);

        // Only the x neighbor of the bright voxel sees it as a backward neighbor.
        let behind = &grid[shape.offset(UVec3::new(2, 1, 1))];
        let expected = 30.0 / 170.0 * 1000.0 * 0.8 + 20.0;
        assert!((behind.traversal_cost - expected).abs() < 1e-3);
    }

    #[test]
    fn painted_samples_are_clamped() {
        let volume = DenseVolume::new(UVec3::splat(2), 4000.0);
        let grid = build_cost_field(Region::whole(UVec3::splat(2)).unwrap(), &volume, &CostModel::default()).unwrap();
        assert!(grid.cells().iter().all(|c| c.intensity == INTENSITY_CEILING));
    }
}
