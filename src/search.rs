use crate::active::ActiveList;
use crate::cost::{build_cost_field, Cell};
use crate::reconstruct::build_tree;
use crate::{
    BranchId, BranchTree, Error, Grid, GridShape, LargeAreaConfig, PathElement, PathStore, Region,
    RegionConfig, Result, TracedPath, TracerConfig, VolumeAccess,
};

use glam::{IVec3, UVec3};
use smallvec::SmallVec;

/// Why a seed produced no path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureReason {
    /// The iteration budget ran out before the search met a traced path or the endpoint.
    BudgetExhausted,
    /// No reachable foreground was left to expand.
    FrontierExhausted,
    /// The seed lies on a path that was already traced.
    SeedOnTracedPath,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SeedFailure {
    pub seed_index: usize,
    pub seed: UVec3,
    pub reason: FailureReason,
}

/// The result of [`PathSearch::trace`].
#[derive(Clone, Debug, Default)]
pub struct TraceOutcome {
    /// The root built from the path that reached the endpoint, if any seed got there.
    pub root: Option<BranchId>,
    pub failed_seeds: Vec<SeedFailure>,
    pub paths: PathStore,
}

impl TraceOutcome {
    /// `true` if every seed produced a path.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failed_seeds.is_empty()
    }
}

/// Seeded livewire tracing over one region of a volume.
///
/// A search is created empty and becomes valid once [`init`](Self::init) has sampled a region and built its cost field.
/// [`trace`](Self::trace) consumes the cost field: the grid is released when the run finishes, so every run needs a
/// fresh `init`.
///
/// Seeds are expanded one at a time, in order. The first seed runs until it reaches the endpoint, and every later seed
/// runs until it touches a path traced before it. Each found path is painted into the volume's mark channel with the
/// code `path_code_base - seed_index`.
#[derive(Clone, Debug)]
pub struct PathSearch {
    config: TracerConfig,
    grid: Option<Grid<Cell>>,
}

impl Default for PathSearch {
    fn default() -> Self {
        Self::new(TracerConfig::default())
    }
}

impl PathSearch {
    pub fn new(config: TracerConfig) -> Self {
        Self { config, grid: None }
    }

    #[inline]
    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// `true` between a successful [`init`](Self::init) and the next [`trace`](Self::trace) or [`clear`](Self::clear).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.grid.is_some()
    }

    /// The region of the current grid.
    #[inline]
    pub fn region(&self) -> Option<Region> {
        self.grid.as_ref().map(|g| g.shape().region())
    }

    /// Releases the grid.
    pub fn clear(&mut self) {
        self.grid = None;
    }

    /// Samples `region` out of `volume` and builds its cost field.
    ///
    /// Any previous grid is released first. On failure the search stays invalid.
    pub fn init(&mut self, region: Region, volume: &impl VolumeAccess) -> Result<()> {
        self.clear();
        self.config.validate()?;
        region.ensure_within(volume.extent())?;

        match build_cost_field(region, volume, &self.config.cost) {
            Ok(grid) => {
                log::info!(
                    "Initialized search grid {} at {} ({} voxels)",
                    region.dims(),
                    region.start(),
                    grid.len()
                );
                self.grid = Some(grid);
                Ok(())
            }
            Err(e) => {
                if let Error::Allocation { voxels } = &e {
                    log::error!("Failed to allocate a search grid of {} voxels", voxels);
                }
                Err(e)
            }
        }
    }

    /// Sizes a region around `points` with [`Region::from_points`] and initializes it.
    pub fn init_around(
        &mut self,
        points: &[UVec3],
        volume: &impl VolumeAccess,
        region_config: &RegionConfig,
    ) -> Result<Region> {
        let region = Region::from_points(points, volume.extent(), region_config)?;
        self.init(region, volume)?;
        Ok(region)
    }

    /// Traces every seed towards `endpoint` and builds the resulting hierarchy into `tree`.
    ///
    /// Seeds that fail are reported in [`TraceOutcome::failed_seeds`] and leave no branch behind. The grid is released
    /// once the run is over, whether or not any seed succeeded.
    ///
    /// If the traced paths cannot be turned into branches, `tree` is left untouched and the outcome comes back inside
    /// [`Error::Reconstruction`]. The paths are painted into `volume` either way.
    pub fn trace(
        &mut self,
        volume: &mut impl VolumeAccess,
        seeds: &[UVec3],
        endpoint: UVec3,
        tree: &mut BranchTree,
    ) -> Result<TraceOutcome> {
        let grid = self.grid.as_ref().ok_or(Error::NotInitialized)?;
        if seeds.is_empty() {
            return Err(Error::NoSeeds);
        }
        let max = self.config.max_seeds();
        if seeds.len() > max {
            return Err(Error::TooManySeeds {
                count: seeds.len(),
                max,
            });
        }
        let shape = grid.shape().clone();
        let region = shape.region();
        let endpoint_offset = locate(&shape, region, endpoint)?;
        let seed_offsets = seeds
            .iter()
            .map(|&s| locate(&shape, region, s))
            .collect::<Result<Vec<u32>>>()?;

        let Some(mut grid) = self.grid.take() else {
            return Err(Error::NotInitialized);
        };
        let mut run = Run {
            config: &self.config,
            shape,
            grid: &mut grid,
            volume,
            active: ActiveList::default(),
            paths: PathStore::default(),
            failures: Vec::new(),
            endpoint: endpoint_offset,
            origin_set: false,
        };
        for (seed_index, &seed) in seed_offsets.iter().enumerate() {
            run.trace_seed(seed_index, seed);
        }
        let Run { paths, failures, .. } = run;

        let root = match build_tree(&paths, endpoint, tree) {
            Ok(root) => root,
            Err(source) => {
                log::error!("Traced {} paths but could not build their branch tree: {}", paths.len(), source);
                return Err(Error::Reconstruction {
                    source: Box::new(source),
                    outcome: Box::new(TraceOutcome {
                        root: None,
                        failed_seeds: failures,
                        paths,
                    }),
                });
            }
        };
        log::info!(
            "Traced {} of {} seeds, {} failed",
            paths.len(),
            seeds.len(),
            failures.len()
        );

        Ok(TraceOutcome {
            root,
            failed_seeds: failures,
            paths,
        })
    }
}

fn locate(shape: &GridShape, region: Region, voxel: UVec3) -> Result<u32> {
    shape.offset_of(voxel).ok_or(Error::OutsideRegion {
        point: voxel,
        start: region.start(),
        end: region.end(),
    })
}

/// What stopped the expansion of a seed successfully.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Arrival {
    Endpoint(u32),
    TracedPath(u32),
}

impl Arrival {
    #[inline]
    fn offset(self) -> u32 {
        match self {
            Self::Endpoint(o) | Self::TracedPath(o) => o,
        }
    }
}

/// A width probe that found a wide bright structure around a settled cell.
#[derive(Clone, Debug, PartialEq)]
struct WideStructure {
    /// Lengths of the four half-probes, in voxels.
    spans: [f32; 4],
    cells: Vec<u32>,
}

/// Mutable state of one [`PathSearch::trace`] call.
struct Run<'a, V> {
    config: &'a TracerConfig,
    shape: GridShape,
    grid: &'a mut Grid<Cell>,
    volume: &'a mut V,
    active: ActiveList,
    paths: PathStore,
    failures: Vec<SeedFailure>,
    endpoint: u32,
    origin_set: bool,
}

impl<'a, V: VolumeAccess> Run<'a, V> {
    fn trace_seed(&mut self, seed_index: usize, seed: u32) {
        log::info!("Expanding seed {} at {}", seed_index, self.shape.global(seed));
        let result = self.expand(seed);
        match result {
            Ok(arrival) => {
                self.store_path(seed_index, seed, arrival);
                self.finish_seed(true);
            }
            Err(reason) => {
                let voxel = self.shape.global(seed);
                log::warn!("Giving up on seed {} at {}: {:?}", seed_index, voxel, reason);
                self.failures.push(SeedFailure {
                    seed_index,
                    seed: voxel,
                    reason,
                });
                self.finish_seed(false);
            }
        }
    }

    /// Runs the expansion of one seed until it arrives somewhere or gives up.
    fn expand(&mut self, seed: u32) -> std::result::Result<Arrival, FailureReason> {
        let config = self.config;
        let targeting_endpoint = self.paths.is_empty();

        if self.grid[seed].intensity > config.traced_threshold {
            return Err(FailureReason::SeedOnTracedPath);
        }
        if targeting_endpoint && seed == self.endpoint {
            return Ok(Arrival::Endpoint(seed));
        }

        self.active.clear();
        self.grid[seed].cost = 0.0;
        self.active.insert(seed, 0.0);

        let mut rerouting = false;
        let mut triggers = 0;
        let mut pops = 0;
        loop {
            if pops >= config.iteration_budget {
                return Err(FailureReason::BudgetExhausted);
            }
            if let Some(limit) = config.active_list_limit {
                if !rerouting && self.active.len() > limit {
                    self.prune();
                }
            }
            let Some((current, _)) = self.active.pop_min() else {
                return Err(FailureReason::FrontierExhausted);
            };
            pops += 1;
            if !self.origin_set {
                self.grid[current].is_origin = true;
                self.origin_set = true;
            }

            let large_area = &config.large_area;
            if large_area.enabled && triggers < large_area.max_per_seed && self.has_low_band_frontier() {
                if let Some(pred) = self.grid[current].predecessor {
                    if let Some(wide) =
                        probe_wide_structure(self.grid, &self.shape, large_area, current, pred)
                    {
                        log::debug!(
                            "Wide structure at {} (spans {:?}), rerouting {} active cells",
                            self.shape.global(current),
                            wide.spans,
                            self.active.len()
                        );
                        for &cell in &wide.cells {
                            self.volume.mark(self.shape.global(cell), large_area.marker);
                        }
                        self.reroute();
                        let cell = &mut self.grid[current];
                        if !cell.settled_before {
                            cell.visited = true;
                        }
                        triggers += 1;
                        rerouting = true;
                        continue;
                    }
                }
            }

            self.grid[current].visited = true;
            if let Some(arrival) = self.relax_neighbors(current, targeting_endpoint) {
                return Ok(arrival);
            }
        }
    }

    /// `true` if some active cell lies in the band that rerouting keeps.
    fn has_low_band_frontier(&self) -> bool {
        let large_area = &self.config.large_area;
        self.active
            .offsets()
            .any(|offset| large_area.in_low_band(self.grid[offset].intensity))
    }

    /// Offers every unsettled neighbor of `current` a path through it. Stops at the first neighbor that ends the
    /// search.
    fn relax_neighbors(&mut self, current: u32, targeting_endpoint: bool) -> Option<Arrival> {
        let config = self.config;
        let base = self.grid[current].cost;
        for n in self.shape.neighbors(current) {
            let cell = self.grid[n];
            if cell.visited {
                continue;
            }
            let arrival = if targeting_endpoint && n == self.endpoint {
                Some(Arrival::Endpoint(n))
            } else if cell.intensity > config.traced_threshold {
                Some(Arrival::TracedPath(n))
            } else {
                None
            };
            if let Some(arrival) = arrival {
                self.grid[n].predecessor = Some(current);
                return Some(arrival);
            }

            let candidate = base + cell.traversal_cost + config.step_cost;
            let improved = if self.active.contains(n) {
                self.active.decrease(n, candidate)
            } else {
                cell.intensity > config.foreground_threshold && self.active.insert(n, candidate)
            };
            if improved {
                let cell = &mut self.grid[n];
                cell.cost = candidate;
                cell.predecessor = Some(current);
            }
        }
        None
    }

    /// Drops every second active cell in list order, starting with the first.
    fn prune(&mut self) {
        let traced_threshold = self.config.traced_threshold;
        let before = self.active.len();
        let grid = &mut *self.grid;
        let mut index = 0usize;
        self.active.retain_mut(|offset, _| {
            let keep = index % 2 == 1;
            index += 1;
            if !keep {
                let cell = &mut grid[offset];
                if cell.intensity <= traced_threshold {
                    cell.visited = true;
                }
            }
            keep
        });
        log::debug!("Pruned active list from {} to {}", before, self.active.len());
    }

    /// Makes active cells of the low band cheap and drops every other active cell.
    fn reroute(&mut self) {
        let large_area = &self.config.large_area;
        let grid = &mut *self.grid;
        self.active.retain_mut(|offset, cost| {
            let cell = &mut grid[offset];
            if large_area.in_low_band(cell.intensity) {
                *cost = *cost - cell.traversal_cost + large_area.lowered_cost;
                cell.cost = *cost;
                cell.traversal_cost = large_area.lowered_cost;
                true
            } else {
                if !cell.settled_before {
                    cell.visited = true;
                }
                false
            }
        });
    }

    /// Walks the predecessors from `arrival` back to `seed`, paints the path and stores it.
    fn store_path(&mut self, seed_index: usize, seed: u32, arrival: Arrival) {
        let config = self.config;
        let hit = arrival.offset();

        let mut elements = Vec::new();
        let mut at = hit;
        loop {
            elements.push(PathElement::new(at, self.shape.global(at)));
            if at == seed || elements.len() > self.grid.len() {
                break;
            }
            match self.grid[at].predecessor {
                Some(prev) => at = prev,
                None => break,
            }
        }
        if let Some(last) = elements.last_mut() {
            last.is_seed = true;
        }

        let parent = match arrival {
            Arrival::Endpoint(_) => None,
            Arrival::TracedPath(offset) => {
                let code = self.grid[offset].intensity;
                let parent = config
                    .seed_of_code(code)
                    .and_then(|s| self.paths.index_of_seed(s));
                if parent.is_none() {
                    log::warn!(
                        "No stored path carries code {} at {}, attaching to the first path",
                        code,
                        self.shape.global(offset)
                    );
                }
                self.paths.mark_crosses(offset);
                Some(parent.unwrap_or(0))
            }
        };

        // The junction of a branch keeps the code of the path it belongs to.
        let code = config.path_code(seed_index);
        let skip = usize::from(parent.is_some());
        for element in elements.iter().skip(skip) {
            self.grid[element.offset].intensity = code;
            if !element.is_seed {
                self.volume.mark(element.voxel, code);
            }
        }

        log::info!(
            "Traced seed {} with {} voxels to {}",
            seed_index,
            elements.len(),
            self.shape.global(hit)
        );
        self.paths.push(TracedPath {
            seed_index,
            parent,
            elements,
        });
    }

    /// Resets the search state for the next seed.
    fn finish_seed(&mut self, succeeded: bool) {
        self.active.clear();
        for cell in self.grid.cells_mut() {
            if succeeded && cell.visited {
                cell.settled_before = true;
            }
            cell.reset_search();
        }
    }
}

/// The two lattice directions perpendicular to `direction` and to each other, each reduced to its shortest integer
/// step.
fn perpendicular_axes(direction: IVec3) -> Option<(IVec3, IVec3)> {
    if direction == IVec3::ZERO {
        return None;
    }
    let a = direction.abs();
    let least = if a.x <= a.y && a.x <= a.z {
        IVec3::X
    } else if a.y <= a.z {
        IVec3::Y
    } else {
        IVec3::Z
    };
    let u = reduce(direction.cross(least));
    let w = reduce(direction.cross(u));
    Some((u, w))
}

fn reduce(v: IVec3) -> IVec3 {
    let g = gcd(gcd(v.x.unsigned_abs(), v.y.unsigned_abs()), v.z.unsigned_abs());
    if g > 1 {
        v / g as i32
    } else {
        v
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Measures how far bright material extends around `cell` perpendicular to the step from `pred`.
///
/// Returns the probed cells if all four half-probes are longer than [`LargeAreaConfig::min_span`].
fn probe_wide_structure(
    grid: &Grid<Cell>,
    shape: &GridShape,
    config: &LargeAreaConfig,
    cell: u32,
    pred: u32,
) -> Option<WideStructure> {
    let direction = shape.local(cell).as_ivec3() - shape.local(pred).as_ivec3();
    let (u, w) = perpendicular_axes(direction)?;

    let mut cells = Vec::new();
    let mut spans = [0.0; 4];
    for (span, step) in spans.iter_mut().zip([u, -u, w, -w]) {
        let mut probe = SmallVec::<[u32; 32]>::new();
        let mut at = cell;
        while let Some(next) = shape.step(at, step) {
            if grid[next].intensity <= config.width_floor {
                break;
            }
            probe.push(next);
            at = next;
        }
        *span = probe.len() as f32 * step.as_vec3().length();
        if *span <= config.min_span {
            return None;
        }
        cells.extend(probe);
    }
    Some(WideStructure { spans, cells })
}
