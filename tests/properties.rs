use livewire_tree::glam::Vec3;
use livewire_tree::simplify::{keep_mask, simplified, squared_chord_distance};
use livewire_tree::{BranchId, BranchTree};

use proptest::prelude::*;

fn point() -> impl Strategy<Value = Vec3> {
    (-50.0f32..50.0, -50.0f32..50.0, -50.0f32..50.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn spacing() -> impl Strategy<Value = Vec3> {
    (0.2f32..3.0, 0.2f32..3.0, 0.2f32..3.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn simplification_keeps_endpoints_and_never_grows(
        points in prop::collection::vec(point(), 0..40),
        epsilon in 0.0f32..10.0,
        spacing in spacing(),
    ) {
        let out = simplified(&points, epsilon, spacing);
        prop_assert!(out.len() <= points.len());
        if points.len() <= 2 {
            prop_assert_eq!(&out, &points);
        } else {
            prop_assert_eq!(out.first(), points.first());
            prop_assert_eq!(out.last(), points.last());
        }
    }

    #[test]
    fn discarded_points_lie_near_the_surviving_chord(
        points in prop::collection::vec(point(), 3..40),
        epsilon in 0.0f32..10.0,
        spacing in spacing(),
    ) {
        let keep = keep_mask(&points, epsilon, spacing);
        let kept: Vec<usize> = (0..points.len()).filter(|&i| keep[i]).collect();
        for pair in kept.windows(2) {
            let (a, b) = (points[pair[0]], points[pair[1]]);
            for &p in &points[pair[0] + 1..pair[1]] {
                prop_assert!(squared_chord_distance(p, a, b, spacing) <= epsilon * epsilon);
            }
        }
    }

    #[test]
    fn simplification_is_idempotent(
        points in prop::collection::vec(point(), 0..40),
        epsilon in 0.0f32..10.0,
        spacing in spacing(),
    ) {
        let once = simplified(&points, epsilon, spacing);
        let twice = simplified(&once, epsilon, spacing);
        prop_assert_eq!(once, twice);
    }
}

#[derive(Clone, Debug)]
enum Edit {
    AddRoot,
    AddChild(usize),
    Remove(usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        1 => Just(Edit::AddRoot),
        3 => any::<usize>().prop_map(Edit::AddChild),
        1 => any::<usize>().prop_map(Edit::Remove),
    ]
}

fn live_ids(tree: &BranchTree) -> Vec<BranchId> {
    tree.iter().map(|(id, _)| id).collect()
}

fn apply(tree: &mut BranchTree, edits: &[Edit]) {
    for edit in edits {
        let live = live_ids(tree);
        match *edit {
            Edit::AddRoot => {
                tree.add_new_branch().unwrap();
            }
            Edit::AddChild(pick) if !live.is_empty() => {
                tree.add_child(live[pick % live.len()]).unwrap();
            }
            Edit::Remove(pick) if !live.is_empty() => {
                tree.remove(live[pick % live.len()]).unwrap();
            }
            _ => {}
        }
    }
}

proptest! {
    #[test]
    fn labels_stay_unique_and_accounted_for(edits in prop::collection::vec(edit(), 0..60)) {
        let mut tree = BranchTree::with_max_label(500);
        apply(&mut tree, &edits);

        let mut labels: Vec<u32> = tree.iter().map(|(_, item)| item.label()).collect();
        for &label in &labels {
            prop_assert!(tree.labels().in_use(label));
        }
        labels.sort_unstable();
        labels.dedup();
        prop_assert_eq!(labels.len(), tree.item_count());
        prop_assert_eq!(tree.labels().num_in_use(), tree.item_count());
    }

    #[test]
    fn parents_and_children_agree(edits in prop::collection::vec(edit(), 0..60)) {
        let mut tree = BranchTree::new();
        apply(&mut tree, &edits);

        for (id, item) in tree.iter() {
            for &child in item.children() {
                prop_assert_eq!(tree.parent(child), Some(id));
            }
            match item.parent() {
                Some(parent) => prop_assert!(tree.children(parent).contains(&id)),
                None => prop_assert!(tree.roots().contains(&id)),
            }
        }
        for &root in tree.roots() {
            prop_assert!(tree.get(root).unwrap().is_root());
        }
        let reachable: usize = tree.roots().iter().map(|&r| tree.descendants(r).len()).sum();
        prop_assert_eq!(reachable, tree.item_count());
    }

    #[test]
    fn corrected_junctions_meet_the_first_child(
        edits in prop::collection::vec(edit(), 0..40),
        lines in prop::collection::vec(prop::collection::vec(point(), 2..6), 40),
    ) {
        let mut tree = BranchTree::new();
        apply(&mut tree, &edits);
        for (line, id) in lines.iter().zip(live_ids(&tree)) {
            tree.get_mut(id).unwrap().centerline_mut().extend_from_slice(line);
        }
        tree.correct_all_branchpoints();

        for (_, item) in tree.iter() {
            if let Some(&first) = item.children().first() {
                let child = tree.get(first).unwrap();
                prop_assert_eq!(item.centerline().last(), child.centerline().first());
            }
        }
    }
}
