use crate::allocator::BranchAllocator;
use crate::{BranchId, BranchItem, Error, Label, LabelAllocator, Result};

use glam::{UVec2, Vec3};
use smallvec::SmallVec;

/// A forest of [`BranchItem`]s.
///
/// The tree owns every item and the pool their labels are drawn from. Removing an item removes its whole subtree and
/// returns all of its labels to the pool.
///
/// Besides handle-based access, the tree keeps a cursor over its roots (see [`item`](Self::item) and
/// [`next_item`](Self::next_item)) for consumers that walk the forest one root at a time.
#[derive(Clone, Debug, Default)]
pub struct BranchTree {
    items: BranchAllocator<BranchItem>,
    roots: Vec<BranchId>,
    labels: LabelAllocator,
    cursor: usize,
}

impl BranchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree whose labels run from `1` to `max_label`.
    pub fn with_max_label(max_label: Label) -> Self {
        Self {
            labels: LabelAllocator::new(max_label),
            ..Default::default()
        }
    }

    /// Number of roots.
    #[inline]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of items in the whole forest.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn roots(&self) -> &[BranchId] {
        &self.roots
    }

    #[inline]
    pub fn labels(&self) -> &LabelAllocator {
        &self.labels
    }

    #[inline]
    pub fn contains(&self, id: BranchId) -> bool {
        self.items.contains(id)
    }

    #[inline]
    pub fn get(&self, id: BranchId) -> Option<&BranchItem> {
        self.items.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: BranchId) -> Option<&mut BranchItem> {
        self.items.get_mut(id)
    }

    #[inline]
    pub fn parent(&self, id: BranchId) -> Option<BranchId> {
        self.items.get(id).and_then(|item| item.parent)
    }

    #[inline]
    pub fn children(&self, id: BranchId) -> &[BranchId] {
        self.items.get(id).map(|item| item.children()).unwrap_or(&[])
    }

    /// Iterates over every item in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (BranchId, &BranchItem)> {
        self.items.iter()
    }

    /// Creates a new root and resets the root cursor.
    pub fn add_new_branch(&mut self) -> Result<BranchId> {
        let label = self.labels.allocate().ok_or(Error::LabelsExhausted)?;
        let id = self.items.insert(BranchItem::new(label, None));
        self.roots.push(id);
        self.cursor = 0;
        Ok(id)
    }

    /// Creates a new item as the last child of `parent`.
    pub fn add_child(&mut self, parent: BranchId) -> Result<BranchId> {
        if !self.items.contains(parent) {
            return Err(Error::UnknownBranch(parent));
        }
        let label = self.labels.allocate().ok_or(Error::LabelsExhausted)?;
        let id = self.items.insert(BranchItem::new(label, Some(parent)));
        if let Some(p) = self.items.get_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Moves `child` and its subtree beneath `new_parent`, or makes it a root when `new_parent` is `None`.
    ///
    /// The child is appended after any existing children of its new parent.
    pub fn reparent(&mut self, child: BranchId, new_parent: Option<BranchId>) -> Result<()> {
        let old_parent = self.items.get(child).ok_or(Error::UnknownBranch(child))?.parent;
        if let Some(parent) = new_parent {
            if !self.items.contains(parent) {
                return Err(Error::UnknownBranch(parent));
            }
            if self.is_ancestor_or_self(child, parent) {
                return Err(Error::CyclicReparent { child, parent });
            }
        }
        if old_parent == new_parent {
            return Ok(());
        }

        self.unlink(child, old_parent);
        match new_parent {
            Some(parent) => {
                if let Some(p) = self.items.get_mut(parent) {
                    p.children.push(child);
                }
            }
            None => self.roots.push(child),
        }
        if let Some(c) = self.items.get_mut(child) {
            c.parent = new_parent;
        }
        Ok(())
    }

    /// Removes `id` and all of its descendants, releasing their labels.
    pub fn remove(&mut self, id: BranchId) -> Result<()> {
        let parent = self.items.get(id).ok_or(Error::UnknownBranch(id))?.parent;
        self.unlink(id, parent);

        let mut to_remove = SmallVec::<[BranchId; 32]>::new();
        to_remove.push(id);
        while let Some(id) = to_remove.pop() {
            if let Some(item) = self.items.remove(id) {
                self.labels.release(item.label);
                to_remove.extend(item.children);
            }
        }
        Ok(())
    }

    /// Removes every item and returns all labels to the pool.
    pub fn clear(&mut self) {
        self.items.clear();
        self.roots.clear();
        self.labels.reset();
        self.cursor = 0;
    }

    pub fn reset_iterator(&mut self) {
        self.cursor = 0;
    }

    /// The root under the cursor.
    #[inline]
    pub fn item(&self) -> Option<BranchId> {
        self.roots.get(self.cursor).copied()
    }

    /// Advances the cursor and returns the root it lands on.
    pub fn next_item(&mut self) -> Option<BranchId> {
        if self.cursor < self.roots.len() {
            self.cursor += 1;
        }
        self.item()
    }

    /// Visit `ancestor` and all descendants in depth-first preorder, children in order.
    ///
    /// If `visitor` returns [`VisitCommand::SkipDescendants`], descendants of that item will not be visited.
    pub fn visit_depth_first(
        &self,
        ancestor: BranchId,
        mut visitor: impl FnMut(BranchId, &BranchItem) -> VisitCommand,
    ) {
        let mut stack = SmallVec::<[BranchId; 32]>::new();
        stack.push(ancestor);
        while let Some(id) = stack.pop() {
            let Some(item) = self.items.get(id) else {
                continue;
            };
            if let VisitCommand::Continue = visitor(id, item) {
                stack.extend(item.children.iter().rev().copied());
            }
        }
    }

    /// `ancestor` and all descendants in depth-first preorder.
    pub fn descendants(&self, ancestor: BranchId) -> Vec<BranchId> {
        let mut out = Vec::new();
        self.visit_depth_first(ancestor, |id, _| {
            out.push(id);
            VisitCommand::Continue
        });
        out
    }

    /// Makes every parent's last centerline point equal to its first child's first centerline point, for `ancestor`
    /// and all descendants.
    pub fn correct_branchpoints(&mut self, ancestor: BranchId) {
        for id in self.descendants(ancestor) {
            let Some(&first_child) = self.children(id).first() else {
                continue;
            };
            let Some(junction) = self.items.get(first_child).and_then(|c| c.center_at(0)) else {
                continue;
            };
            if let Some(last) = self
                .items
                .get_mut(id)
                .and_then(|item| item.centerline_mut().last_mut())
            {
                *last = junction;
            }
        }
    }

    /// [`correct_branchpoints`](Self::correct_branchpoints) over every root.
    pub fn correct_all_branchpoints(&mut self) {
        for root in self.roots.clone() {
            self.correct_branchpoints(root);
        }
    }

    /// Simplifies the centerlines of `ancestor` and all descendants in place.
    pub fn simplify_with_children(&mut self, ancestor: BranchId, epsilon: f32, spacing: Vec3) {
        for id in self.descendants(ancestor) {
            if let Some(item) = self.items.get_mut(id) {
                item.simplify(epsilon, spacing);
            }
        }
    }

    /// Simplified copies of the centerlines of `ancestor` and all descendants, in depth-first preorder.
    pub fn simplified_with_children(
        &self,
        ancestor: BranchId,
        epsilon: f32,
        spacing: Vec3,
    ) -> Vec<Vec<Vec3>> {
        let mut out = Vec::new();
        self.visit_depth_first(ancestor, |_, item| {
            out.push(item.simplified(epsilon, spacing));
            VisitCommand::Continue
        });
        out
    }

    /// The centerline points of `ancestor` and all descendants lying on `slice`.
    pub fn centerline_slice_with_children(&self, ancestor: BranchId, slice: u32) -> Vec<UVec2> {
        let mut out = Vec::new();
        self.visit_depth_first(ancestor, |_, item| {
            item.extend_centerline_slice(slice, &mut out);
            VisitCommand::Continue
        });
        out
    }

    fn is_ancestor_or_self(&self, ancestor: BranchId, mut id: BranchId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn unlink(&mut self, child: BranchId, parent: Option<BranchId>) {
        match parent {
            Some(parent) => {
                if let Some(p) = self.items.get_mut(parent) {
                    p.children.retain(|&c| c != child);
                }
            }
            None => {
                if let Some(i) = self.roots.iter().position(|&r| r == child) {
                    self.roots.remove(i);
                    if self.cursor > i {
                        self.cursor -= 1;
                    }
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VisitCommand {
    Continue,
    SkipDescendants,
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    fn labels_of(tree: &BranchTree, ids: &[BranchId]) -> Vec<Label> {
        ids.iter().map(|&id| tree.get(id).unwrap().label()).collect()
    }

    #[test]
    fn labels_count_up_from_one() {
        let mut tree = BranchTree::new();
        let root = tree.add_new_branch().unwrap();
        let a = tree.add_child(root).unwrap();
        let b = tree.add_child(root).unwrap();
        let c = tree.add_child(a).unwrap();

        assert_eq!(labels_of(&tree, &[root, a, b, c]), vec![1, 2, 3, 4]);
        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.parent(c), Some(a));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.item_count(), 4);
    }

    #[test]
    fn remove_drops_subtree_and_releases_labels() {
        let mut tree = BranchTree::new();
        let root = tree.add_new_branch().unwrap();
        let a = tree.add_child(root).unwrap();
        let b = tree.add_child(root).unwrap();
        let c = tree.add_child(a).unwrap();

        tree.remove(a).unwrap();
        assert!(!tree.contains(a));
        assert!(!tree.contains(c));
        assert_eq!(tree.children(root), &[b]);
        assert!(tree.labels().is_available(2));
        assert!(tree.labels().is_available(4));
        assert!(matches!(tree.remove(a), Err(Error::UnknownBranch(_))));

        // Released labels are reused before fresh ones.
        let d = tree.add_child(b).unwrap();
        assert_eq!(tree.get(d).unwrap().label(), 4);
    }

    #[test]
    fn reparent_moves_subtree() {
        let mut tree = BranchTree::new();
        let root = tree.add_new_branch().unwrap();
        let a = tree.add_child(root).unwrap();
        let b = tree.add_child(root).unwrap();
        let c = tree.add_child(a).unwrap();

        tree.reparent(a, Some(b)).unwrap();
        assert_eq!(tree.children(root), &[b]);
        assert_eq!(tree.children(b), &[a]);
        assert_eq!(tree.parent(a), Some(b));
        assert_eq!(tree.descendants(root), vec![root, b, a, c]);

        tree.reparent(c, None).unwrap();
        assert_eq!(tree.roots(), &[root, c]);
        assert_eq!(tree.parent(c), None);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut tree = BranchTree::new();
        let root = tree.add_new_branch().unwrap();
        let a = tree.add_child(root).unwrap();
        let c = tree.add_child(a).unwrap();

        assert!(matches!(
            tree.reparent(root, Some(c)),
            Err(Error::CyclicReparent { .. })
        ));
        assert!(matches!(
            tree.reparent(a, Some(a)),
            Err(Error::CyclicReparent { .. })
        ));
        assert_eq!(tree.descendants(root), vec![root, a, c]);
    }

    #[test]
    fn visit_can_skip_descendants() {
        let mut tree = BranchTree::new();
        let root = tree.add_new_branch().unwrap();
        let a = tree.add_child(root).unwrap();
        let b = tree.add_child(root).unwrap();
        let _a1 = tree.add_child(a).unwrap();
        let b1 = tree.add_child(b).unwrap();

        let mut visited = Vec::new();
        tree.visit_depth_first(root, |id, _| {
            visited.push(id);
            if id == a {
                VisitCommand::SkipDescendants
            } else {
                VisitCommand::Continue
            }
        });
        assert_eq!(visited, vec![root, a, b, b1]);
    }

    #[test]
    fn cursor_walks_roots() {
        let mut tree = BranchTree::new();
        assert_eq!(tree.item(), None);
        let r1 = tree.add_new_branch().unwrap();
        let r2 = tree.add_new_branch().unwrap();

        assert_eq!(tree.item(), Some(r1));
        assert_eq!(tree.next_item(), Some(r2));
        assert_eq!(tree.next_item(), None);
        assert_eq!(tree.next_item(), None);
        tree.reset_iterator();
        assert_eq!(tree.item(), Some(r1));
    }

    #[test]
    fn branchpoints_meet_first_child() {
        let mut tree = BranchTree::new();
        let root = tree.add_new_branch().unwrap();
        let a = tree.add_child(root).unwrap();
        let b = tree.add_child(root).unwrap();
        let a1 = tree.add_child(a).unwrap();

        let lines: [(BranchId, &[f32]); 4] = [
            (root, &[0.0, 1.0, 2.0]),
            (a, &[3.0, 4.0]),
            (b, &[9.0]),
            (a1, &[5.0, 6.0]),
        ];
        for (id, zs) in lines {
            let item = tree.get_mut(id).unwrap();
            for &z in zs {
                item.add_center(Vec3::new(0.0, 0.0, z));
            }
        }

        tree.correct_all_branchpoints();
        let z_of = |id| -> Vec<f32> {
            tree.get(id).unwrap().centerline().iter().map(|p| p.z).collect()
        };
        assert_eq!(z_of(root), vec![0.0, 1.0, 3.0]);
        assert_eq!(z_of(a), vec![3.0, 5.0]);
        assert_eq!(z_of(b), vec![9.0]);
    }

    #[test]
    fn labels_run_out() {
        let mut tree = BranchTree::with_max_label(1);
        let root = tree.add_new_branch().unwrap();
        assert!(matches!(tree.add_child(root), Err(Error::LabelsExhausted)));
        tree.clear();
        assert!(tree.is_empty());
        assert!(!tree.contains(root));
        assert!(tree.add_new_branch().is_ok());
    }

    #[test]
    fn simplify_covers_subtree() {
        let mut tree = BranchTree::new();
        let root = tree.add_new_branch().unwrap();
        let a = tree.add_child(root).unwrap();
        for id in [root, a] {
            let item = tree.get_mut(id).unwrap();
            for z in 0..4 {
                item.add_center(Vec3::new(2.0, 3.0, z as f32));
            }
        }

        let copies = tree.simplified_with_children(root, 0.5, Vec3::ONE);
        assert_eq!(copies.len(), 2);
        assert!(copies.iter().all(|c| c.len() == 2));
        assert_eq!(tree.get(a).unwrap().centerline().len(), 4);

        assert_eq!(
            tree.centerline_slice_with_children(root, 3),
            vec![UVec2::new(2, 3), UVec2::new(2, 3)]
        );

        tree.simplify_with_children(root, 0.5, Vec3::ONE);
        assert_eq!(tree.get(a).unwrap().centerline().len(), 2);
    }
}
