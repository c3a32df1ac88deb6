//! Tunable constants of the tracer.
//!
//! The defaults reproduce the tracer's calibrated behavior for CT-like intensities, where tubular foreground sits in the
//! `(1250, 1300)` band and anything at or below `1000` is background.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weights of the static per-cell traversal cost.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CostModel {
    pub gradient_weight: f32,
    pub intensity_weight: f32,
    /// Gradient magnitudes above this saturate to `gradient_cap`.
    pub gradient_clamp: f32,
    pub gradient_cap: f32,
    /// Gradient term of cells on the low-index faces of the region, which lack a full backward neighbor set.
    pub missing_gradient: f32,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            gradient_weight: 0.8,
            intensity_weight: 0.2,
            gradient_clamp: 170.0,
            gradient_cap: 1000.0,
            missing_gradient: 1.0,
        }
    }
}

/// Settings of the wide-structure detector and rerouting.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LargeAreaConfig {
    pub enabled: bool,
    /// Width probes walk outward while the intensity stays above this.
    pub width_floor: f32,
    /// Every half-probe must exceed this length (in voxels) to trigger.
    pub min_span: f32,
    /// Exclusive lower bound of the intensity band that is made cheap while rerouting.
    pub low_band_min: f32,
    /// Inclusive upper bound of the rerouting band.
    pub low_band_max: f32,
    pub lowered_cost: f32,
    /// Value written into the output volume along the probed spans.
    pub marker: f32,
    pub max_per_seed: usize,
}

impl Default for LargeAreaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width_floor: 1150.0,
            min_span: 15.0,
            low_band_min: 1000.0,
            low_band_max: 1150.0,
            lowered_cost: 10.0,
            marker: 4000.0,
            max_per_seed: 1,
        }
    }
}

impl LargeAreaConfig {
    #[inline]
    pub fn in_low_band(&self, intensity: f32) -> bool {
        intensity > self.low_band_min && intensity <= self.low_band_max
    }
}

/// Settings of a [`PathSearch`](crate::PathSearch) run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct TracerConfig {
    pub cost: CostModel,
    /// Maximum number of node pops spent on a single seed before it is given up.
    pub iteration_budget: usize,
    /// Constant added to every expansion step on top of the neighbor's traversal cost.
    pub step_cost: f32,
    /// Cells at or below this intensity never enter the active list.
    pub foreground_threshold: f32,
    /// Cells above this intensity belong to an already traced path.
    pub traced_threshold: f32,
    /// Path `i` is painted with `path_code_base - i`.
    pub path_code_base: f32,
    /// While not rerouting, the active list is halved whenever it grows past this length.
    pub active_list_limit: Option<usize>,
    pub large_area: LargeAreaConfig,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            cost: CostModel::default(),
            iteration_budget: 150_000,
            step_cost: 10.0,
            foreground_threshold: 1000.0,
            traced_threshold: 3900.0,
            path_code_base: 4000.0,
            active_list_limit: Some(3000),
            large_area: LargeAreaConfig::default(),
        }
    }
}

impl TracerConfig {
    /// The number of seeds whose path codes stay above `traced_threshold`.
    pub fn max_seeds(&self) -> usize {
        let span = (self.path_code_base - self.traced_threshold).floor();
        if span <= 0.0 {
            0
        } else {
            span as usize
        }
    }

    /// The painted intensity of the path traced from seed `seed_index`.
    #[inline]
    pub fn path_code(&self, seed_index: usize) -> f32 {
        self.path_code_base - seed_index as f32
    }

    /// Inverse of [`path_code`](Self::path_code). Returns `None` for intensities that are not path codes.
    pub fn seed_of_code(&self, intensity: f32) -> Option<usize> {
        if intensity <= self.traced_threshold || intensity > self.path_code_base {
            return None;
        }
        let index = (self.path_code_base - intensity).round();
        (index >= 0.0).then(|| index as usize)
    }

    pub fn validate(&self) -> Result<()> {
        if self.iteration_budget == 0 {
            return Err(Error::InvalidConfig("iteration_budget must be positive".into()));
        }
        if !(self.step_cost >= 0.0) {
            return Err(Error::InvalidConfig("step_cost must be non-negative".into()));
        }
        if self.traced_threshold <= self.foreground_threshold {
            return Err(Error::InvalidConfig(format!(
                "traced_threshold {} must exceed foreground_threshold {}",
                self.traced_threshold, self.foreground_threshold
            )));
        }
        if self.max_seeds() == 0 {
            return Err(Error::InvalidConfig(format!(
                "path_code_base {} leaves no codes above traced_threshold {}",
                self.path_code_base, self.traced_threshold
            )));
        }
        if self.active_list_limit == Some(0) {
            return Err(Error::InvalidConfig("active_list_limit must be positive".into()));
        }
        if self.large_area.low_band_max < self.large_area.low_band_min {
            return Err(Error::InvalidConfig("large_area low band is inverted".into()));
        }
        Ok(())
    }
}

/// Padding policy for [`Region::from_points`](crate::Region::from_points).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct RegionConfig {
    pub margin: u32,
    /// Per-side growth in x and y for each expansion step.
    pub increment: u32,
    /// Hard ceiling on the number of voxels of the padded region.
    pub max_voxels: u64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            margin: 15,
            increment: 2,
            max_voxels: 18_060_000,
        }
    }
}
