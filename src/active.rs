use ahash::AHashMap;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// The frontier of a running search: cells that were reached but not yet settled.
///
/// Extraction always yields the cheapest cell. Among equally cheap cells the one that entered the list first wins, and
/// lowering a cell's cost does not change its place in that order. Stale heap entries left behind by
/// [`decrease`](Self::decrease) are skipped lazily.
#[derive(Clone, Debug, Default)]
pub struct ActiveList {
    heap: BinaryHeap<Reverse<(Rank, u32)>>,
    members: AHashMap<u32, Rank>,
    next_seq: u64,
}

#[derive(Clone, Copy, Debug)]
struct Rank {
    cost: f32,
    seq: u64,
}

impl Ord for Rank {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Rank {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rank {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

impl ActiveList {
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline]
    pub fn contains(&self, offset: u32) -> bool {
        self.members.contains_key(&offset)
    }

    #[inline]
    pub fn cost_of(&self, offset: u32) -> Option<f32> {
        self.members.get(&offset).map(|r| r.cost)
    }

    /// Appends `offset` to the list. Returns `false` and changes nothing if it is already a member.
    pub fn insert(&mut self, offset: u32, cost: f32) -> bool {
        if self.members.contains_key(&offset) {
            return false;
        }
        let rank = Rank {
            cost,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.members.insert(offset, rank);
        self.heap.push(Reverse((rank, offset)));
        true
    }

    /// Lowers the cost of a member. Returns `true` only if `cost` was strictly lower than its current cost.
    pub fn decrease(&mut self, offset: u32, cost: f32) -> bool {
        let Some(rank) = self.members.get_mut(&offset) else {
            return false;
        };
        if !(cost < rank.cost) {
            return false;
        }
        rank.cost = cost;
        let rank = *rank;
        self.heap.push(Reverse((rank, offset)));
        self.compact_if_stale();
        true
    }

    /// Removes and returns the cheapest member with its cost.
    pub fn pop_min(&mut self) -> Option<(u32, f32)> {
        while let Some(Reverse((rank, offset))) = self.heap.pop() {
            let live = self.members.get(&offset).is_some_and(|r| *r == rank);
            if live {
                self.members.remove(&offset);
                return Some((offset, rank.cost));
            }
        }
        None
    }

    /// Visits every member in list order, letting `f` rewrite its cost. Members for which `f` returns `false` are
    /// removed.
    pub fn retain_mut(&mut self, mut f: impl FnMut(u32, &mut f32) -> bool) {
        let mut ordered: Vec<(u32, Rank)> = self.members.drain().collect();
        ordered.sort_unstable_by_key(|(_, rank)| rank.seq);

        self.heap.clear();
        for (offset, mut rank) in ordered {
            if f(offset, &mut rank.cost) {
                self.members.insert(offset, rank);
                self.heap.push(Reverse((rank, offset)));
            }
        }
    }

    /// Member offsets in no particular order.
    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.members.keys().copied()
    }

    /// Members and their costs in list order.
    pub fn entries(&self) -> Vec<(u32, f32)> {
        let mut ordered: Vec<(u32, Rank)> = self.members.iter().map(|(&o, &r)| (o, r)).collect();
        ordered.sort_unstable_by_key(|(_, rank)| rank.seq);
        ordered.into_iter().map(|(o, r)| (o, r.cost)).collect()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.members.clear();
        self.next_seq = 0;
    }

    fn compact_if_stale(&mut self) {
        if self.heap.len() > 4 * self.members.len() + 64 {
            self.heap = self
                .members
                .iter()
                .map(|(&offset, &rank)| Reverse((rank, offset)))
                .collect();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn drain(list: &mut ActiveList) -> Vec<(u32, f32)> {
        std::iter::from_fn(|| list.pop_min()).collect()
    }

    #[test]
    fn pops_cheapest_first() {
        let mut list = ActiveList::default();
        list.insert(7, 30.0);
        list.insert(3, 10.0);
        list.insert(9, 20.0);
        assert_eq!(drain(&mut list), vec![(3, 10.0), (9, 20.0), (7, 30.0)]);
        assert!(list.is_empty());
    }

    #[test]
    fn ties_go_to_the_earliest_insert() {
        let mut list = ActiveList::default();
        list.insert(5, 20.0);
        list.insert(1, 20.0);
        list.insert(4, 30.0);
        // Lowering a late member onto a tie keeps it behind the earlier one.
        list.decrease(4, 20.0);
        assert_eq!(drain(&mut list), vec![(5, 20.0), (1, 20.0), (4, 20.0)]);
    }

    #[test]
    fn offsets_skip_popped_members() {
        let mut list = ActiveList::default();
        list.insert(4, 1.0);
        list.insert(6, 2.0);
        list.decrease(6, 0.5);
        list.pop_min();
        assert_eq!(list.offsets().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn decrease_only_lowers() {
        let mut list = ActiveList::default();
        list.insert(2, 50.0);
        assert!(!list.insert(2, 10.0));
        assert!(!list.decrease(2, 50.0));
        assert!(!list.decrease(2, 60.0));
        assert!(!list.decrease(8, 1.0));
        assert!(list.decrease(2, 40.0));
        assert_eq!(list.cost_of(2), Some(40.0));
        assert_eq!(drain(&mut list), vec![(2, 40.0)]);
    }

    #[test]
    fn retain_walks_in_list_order() {
        let mut list = ActiveList::default();
        for (offset, cost) in [(10, 5.0), (11, 1.0), (12, 3.0), (13, 2.0)] {
            list.insert(offset, cost);
        }

        let mut seen = Vec::new();
        let mut index = 0;
        list.retain_mut(|offset, cost| {
            seen.push(offset);
            *cost += 100.0;
            index += 1;
            index % 2 == 0
        });

        assert_eq!(seen, vec![10, 11, 12, 13]);
        assert_eq!(list.entries(), vec![(11, 101.0), (13, 102.0)]);
        assert_eq!(drain(&mut list), vec![(11, 101.0), (13, 102.0)]);
    }

    #[test]
    fn many_decreases_stay_consistent() {
        let mut list = ActiveList::default();
        for offset in 0..10 {
            list.insert(offset, 1000.0);
        }
        for step in 0..500 {
            list.decrease(step % 10, 999.0 - step as f32);
        }
        let popped = drain(&mut list);
        assert_eq!(popped.len(), 10);
        assert!(popped.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}
