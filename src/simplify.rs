//! Douglas-Peucker simplification of 3D polylines with anisotropic voxel spacing.

use glam::Vec3;
use smallvec::SmallVec;

/// Squared distance from `p` to the line through `a` and `b`, measured after scaling every axis by `spacing`.
///
/// Falls back to the squared distance from `a` when the chord is degenerate.
#[inline]
pub fn squared_chord_distance(p: Vec3, a: Vec3, b: Vec3, spacing: Vec3) -> f32 {
    let chord = (b - a) * spacing;
    let offset = (p - a) * spacing;
    let l = chord.length_squared();
    if l == 0.0 {
        offset.length_squared()
    } else {
        offset.cross(chord).length_squared() / l
    }
}

/// Flags the points of `points` that survive simplification with tolerance `epsilon`.
///
/// The endpoints always survive. A range is split at its farthest interior point whenever that point is more than
/// `epsilon` away from the range's chord.
pub fn keep_mask(points: &[Vec3], epsilon: f32, spacing: Vec3) -> Vec<bool> {
    let n = points.len();
    let mut keep = vec![false; n];
    if n <= 2 {
        keep.iter_mut().for_each(|k| *k = true);
        return keep;
    }
    keep[0] = true;
    keep[n - 1] = true;

    let threshold = epsilon * epsilon;
    let mut ranges = SmallVec::<[(usize, usize); 32]>::new();
    ranges.push((0, n - 1));
    while let Some((first, last)) = ranges.pop() {
        if last <= first + 1 {
            continue;
        }
        let (a, b) = (points[first], points[last]);
        let mut max_dist = 0.0;
        let mut max_pos = first;
        for (i, &p) in points.iter().enumerate().take(last).skip(first + 1) {
            let d = squared_chord_distance(p, a, b, spacing);
            if d > max_dist {
                max_dist = d;
                max_pos = i;
            }
        }
        if max_dist > threshold {
            keep[max_pos] = true;
            ranges.push((max_pos, last));
            ranges.push((first, max_pos));
        }
    }
    keep
}

/// Simplifies `points` in place.
pub fn simplify(points: &mut Vec<Vec3>, epsilon: f32, spacing: Vec3) {
    if points.len() <= 2 {
        return;
    }
    let keep = keep_mask(points, epsilon, spacing);
    let mut flags = keep.into_iter();
    points.retain(|_| flags.next().unwrap_or(true));
}

/// Returns a simplified copy of `points`.
pub fn simplified(points: &[Vec3], epsilon: f32, spacing: Vec3) -> Vec<Vec3> {
    let keep = keep_mask(points, epsilon, spacing);
    points
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}
