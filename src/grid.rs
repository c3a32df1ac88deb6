use crate::{Error, Region, Result};

use glam::{IVec3, UVec3};
use ndshape::{RuntimeShape, Shape};
use smallvec::SmallVec;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Up to 26 neighbor offsets of a cell.
pub type Neighborhood = SmallVec<[u32; 26]>;

/// Translates between linear cell offsets, region-local coordinates and global voxel coordinates.
///
/// Offsets are x-fastest: `offset = x + y * width + z * width * height`.
#[derive(Clone)]
pub struct GridShape {
    shape: RuntimeShape<u32, 3>,
    dims: UVec3,
    origin: UVec3,
}

impl fmt::Debug for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridShape")
            .field("dims", &self.dims)
            .field("origin", &self.origin)
            .finish()
    }
}

impl GridShape {
    pub fn new(region: Region) -> Result<Self> {
        let voxels = region.num_voxels();
        if voxels > u32::MAX as u64 {
            return Err(Error::Allocation {
                voxels: usize::try_from(voxels).unwrap_or(usize::MAX),
            });
        }
        let dims = region.dims();
        Ok(Self {
            shape: RuntimeShape::<u32, 3>::new(dims.to_array()),
            dims,
            origin: region.start(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shape.usize()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(width, height, length)`.
    #[inline]
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Global voxel coordinates of local `(0, 0, 0)`.
    #[inline]
    pub fn origin(&self) -> UVec3 {
        self.origin
    }

    #[inline]
    pub fn region(&self) -> Region {
        Region::from_origin_and_dims(self.origin, self.dims)
    }

    #[inline]
    pub fn contains_local(&self, local: UVec3) -> bool {
        local.cmplt(self.dims).all()
    }

    #[inline]
    pub fn offset(&self, local: UVec3) -> u32 {
        self.shape.linearize(local.to_array())
    }

    #[inline]
    pub fn local(&self, offset: u32) -> UVec3 {
        UVec3::from(self.shape.delinearize(offset))
    }

    #[inline]
    pub fn global(&self, offset: u32) -> UVec3 {
        self.origin + self.local(offset)
    }

    /// The offset of global voxel `voxel`, if it is inside the grid.
    #[inline]
    pub fn offset_of(&self, voxel: UVec3) -> Option<u32> {
        if voxel.cmplt(self.origin).any() {
            return None;
        }
        let local = voxel - self.origin;
        self.contains_local(local).then(|| self.offset(local))
    }

    /// Moves one lattice step `direction` away from `offset`, or `None` when that leaves the grid.
    #[inline]
    pub fn step(&self, offset: u32, direction: IVec3) -> Option<u32> {
        let p = self.local(offset).as_ivec3() + direction;
        (p.cmpge(IVec3::ZERO).all() && p.cmplt(self.dims.as_ivec3()).all())
            .then(|| self.offset(p.as_uvec3()))
    }

    /// The in-grid cells of the 3x3x3 block around `offset`, excluding `offset` itself.
    ///
    /// Ordered by z, then y, then x, each ascending.
    pub fn neighbors(&self, offset: u32) -> Neighborhood {
        let center = self.local(offset).as_ivec3();
        let dims = self.dims.as_ivec3();
        let mut out = Neighborhood::new();
        for z in center.z - 1..=center.z + 1 {
            if z < 0 || z >= dims.z {
                continue;
            }
            for y in center.y - 1..=center.y + 1 {
                if y < 0 || y >= dims.y {
                    continue;
                }
                for x in center.x - 1..=center.x + 1 {
                    if x < 0 || x >= dims.x {
                        continue;
                    }
                    let p = IVec3::new(x, y, z);
                    if p != center {
                        out.push(self.offset(p.as_uvec3()));
                    }
                }
            }
        }
        out
    }
}

/// A flattened 3D array of cells covering one [`Region`], addressed by linear offset.
#[derive(Clone, Debug)]
pub struct Grid<T> {
    shape: GridShape,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Allocates one cell per voxel of `region`, filling each with `f(offset, global_voxel)`.
    ///
    /// Allocation failure is reported as [`Error::Allocation`] instead of aborting.
    pub fn try_from_fn(region: Region, mut f: impl FnMut(u32, UVec3) -> T) -> Result<Self> {
        let shape = GridShape::new(region)?;
        let len = shape.len();
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { voxels: len })?;
        for offset in 0..len as u32 {
            cells.push(f(offset, shape.global(offset)));
        }
        Ok(Self { shape, cells })
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, offset: u32) -> Option<&T> {
        self.cells.get(offset as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, offset: u32) -> Option<&mut T> {
        self.cells.get_mut(offset as usize)
    }

    #[inline]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    #[inline]
    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }
}

impl<T> Index<u32> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, offset: u32) -> &T {
        &self.cells[offset as usize]
    }
}

impl<T> IndexMut<u32> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, offset: u32) -> &mut T {
        &mut self.cells[offset as usize]
    }
}
