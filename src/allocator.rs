use slab::Slab;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a slot owned by a [`BranchAllocator`].
pub type AllocPtr = u32;

/// Uniquely and stably identifies a live item in a [`BranchTree`](crate::BranchTree).
///
/// Slots are reused after removal, but every reuse bumps the slot's generation, so a handle to a removed item never
/// resolves to a later one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchId {
    pub(crate) alloc_ptr: AllocPtr,
    pub(crate) generation: u32,
}

impl BranchId {
    #[inline]
    pub fn index(&self) -> u32 {
        self.alloc_ptr
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A slab of values addressed by generation-tagged [`BranchId`]s.
#[derive(Clone, Debug)]
pub struct BranchAllocator<T> {
    values: Slab<T>,
    generations: Vec<u32>,
}

impl<T> Default for BranchAllocator<T> {
    fn default() -> Self {
        Self {
            values: Default::default(),
            generations: Default::default(),
        }
    }
}

impl<T> BranchAllocator<T> {
    #[inline]
    pub fn insert(&mut self, value: T) -> BranchId {
        let entry = self.values.vacant_entry();
        let key = entry.key();
        if key >= self.generations.len() {
            self.generations.resize(key + 1, 0);
        }
        entry.insert(value);
        BranchId {
            alloc_ptr: key as AllocPtr,
            generation: self.generations[key],
        }
    }

    #[inline]
    pub fn remove(&mut self, id: BranchId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        let key = id.alloc_ptr as usize;
        self.generations[key] = self.generations[key].wrapping_add(1);
        self.values.try_remove(key)
    }

    #[inline]
    pub fn contains(&self, id: BranchId) -> bool {
        let key = id.alloc_ptr as usize;
        self.values.contains(key) && self.generations.get(key) == Some(&id.generation)
    }

    #[inline]
    pub fn get(&self, id: BranchId) -> Option<&T> {
        if self.contains(id) {
            self.values.get(id.alloc_ptr as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: BranchId) -> Option<&mut T> {
        if self.contains(id) {
            self.values.get_mut(id.alloc_ptr as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BranchId, &T)> {
        self.values.iter().map(|(key, value)| {
            (
                BranchId {
                    alloc_ptr: key as AllocPtr,
                    generation: self.generations[key],
                },
                value,
            )
        })
    }

    /// Removes every value. Generations survive, so old handles stay dead.
    pub fn clear(&mut self) {
        for (key, _) in self.values.iter() {
            self.generations[key] = self.generations[key].wrapping_add(1);
        }
        self.values.clear();
    }
}
