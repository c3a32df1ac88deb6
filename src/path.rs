use ahash::AHashMap;
use glam::UVec3;

/// One cell of a traced path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PathElement {
    /// Grid offset of the cell.
    pub offset: u32,
    /// Global voxel coordinates of the cell.
    pub voxel: UVec3,
    /// Another path joins this one here.
    pub is_cross_point: bool,
    /// The seed the path was traced from.
    pub is_seed: bool,
}

impl PathElement {
    #[inline]
    pub fn new(offset: u32, voxel: UVec3) -> Self {
        Self {
            offset,
            voxel,
            is_cross_point: false,
            is_seed: false,
        }
    }
}

/// The path found for one seed, ordered from where it met the endpoint or an earlier path back to the seed.
#[derive(Clone, Debug, PartialEq)]
pub struct TracedPath {
    pub seed_index: usize,
    /// Index in the [`PathStore`] of the path this one ran into. `None` for the path that reached the endpoint.
    pub parent: Option<usize>,
    pub elements: Vec<PathElement>,
}

impl TracedPath {
    /// The first element, where the path meets its parent or the endpoint.
    #[inline]
    pub fn junction(&self) -> Option<&PathElement> {
        self.elements.first()
    }

    #[inline]
    pub fn seed(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Successfully traced paths in discovery order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathStore {
    paths: Vec<TracedPath>,
    by_seed: AHashMap<usize, usize>,
}

impl PathStore {
    /// Appends `path` and returns its index.
    pub fn push(&mut self, path: TracedPath) -> usize {
        let index = self.paths.len();
        self.by_seed.insert(path.seed_index, index);
        self.paths.push(path);
        index
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TracedPath> {
        self.paths.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &TracedPath> {
        self.paths.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[TracedPath] {
        &self.paths
    }

    /// The index of the path traced from seed `seed_index`, if that seed succeeded.
    #[inline]
    pub fn index_of_seed(&self, seed_index: usize) -> Option<usize> {
        self.by_seed.get(&seed_index).copied()
    }

    /// Flags every stored element at `offset` as a cross point and returns how many were flagged.
    ///
    /// The first element of a non-root path is where that path already meets its parent, so it is never flagged.
    pub fn mark_crosses(&mut self, offset: u32) -> usize {
        let mut marked = 0;
        for path in &mut self.paths {
            let skip = usize::from(path.parent.is_some());
            for element in path.elements.iter_mut().skip(skip) {
                if element.offset == offset {
                    element.is_cross_point = true;
                    marked += 1;
                }
            }
        }
        marked
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.by_seed.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn path(seed_index: usize, parent: Option<usize>, offsets: &[u32]) -> TracedPath {
        let mut elements: Vec<_> = offsets
            .iter()
            .map(|&o| PathElement::new(o, UVec3::new(o, 0, 0)))
            .collect();
        if let Some(last) = elements.last_mut() {
            last.is_seed = true;
        }
        TracedPath {
            seed_index,
            parent,
            elements,
        }
    }

    #[test]
    fn seeds_map_to_paths_across_gaps() {
        let mut store = PathStore::default();
        store.push(path(0, None, &[0, 1, 2]));
        // Seed 1 failed.
        store.push(path(2, Some(0), &[1, 5, 6]));
        assert_eq!(store.index_of_seed(0), Some(0));
        assert_eq!(store.index_of_seed(1), None);
        assert_eq!(store.index_of_seed(2), Some(1));
    }

    #[test]
    fn crosses_skip_own_junction() {
        let mut store = PathStore::default();
        store.push(path(0, None, &[0, 1, 2, 3]));
        store.push(path(1, Some(0), &[2, 7, 8]));
        assert_eq!(store.mark_crosses(2), 1);

        let flagged: Vec<Vec<bool>> = store
            .iter()
            .map(|p| p.elements.iter().map(|e| e.is_cross_point).collect())
            .collect();
        assert_eq!(
            flagged,
            vec![vec![false, false, true, false], vec![false, false, false]]
        );
        assert_eq!(store.get(1).and_then(|p| p.seed()).map(|e| e.offset), Some(8));
    }
}
