//! Deterministic k-means over facility locations.
//!
//! Points are clustered in the planar `(lng, lat)` space, the same space
//! `ST_ClusterKMeans` uses for geometry in SRID 4326.

use geo::Coord;

use crate::facility::Location;
use crate::query::ClusterGroup;

/// Upper bound on Lloyd iterations before the current assignment is accepted.
pub const MAX_ITERATIONS: usize = 64;

fn distance_sq(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d = a - b;
    d.x * d.x + d.y * d.y
}

fn mean(points: &[Coord<f64>]) -> Option<Coord<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Coord { x: 0.0, y: 0.0 }, |acc, p| acc + *p);
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    Some(sum / n)
}

fn nearest(point: Coord<f64>, centroids: &[Coord<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = distance_sq(point, *centroid);
        if dist < best_dist {
            best = idx;
            best_dist = dist;
        }
    }
    best
}

/// Farthest-point seeding starting from the first point. Stops early when
/// every remaining point coincides with a seed.
fn seed(points: &[Coord<f64>], k: usize) -> Vec<Coord<f64>> {
    let mut seeds = vec![points[0]];
    let mut closest: Vec<f64> = points.iter().map(|p| distance_sq(*p, points[0])).collect();

    while seeds.len() < k {
        let mut pick = None;
        let mut pick_dist = 0.0;
        for (idx, dist) in closest.iter().enumerate() {
            if *dist > pick_dist {
                pick = Some(idx);
                pick_dist = *dist;
            }
        }
        let Some(idx) = pick else { break };
        let next = points[idx];
        seeds.push(next);
        for (slot, p) in closest.iter_mut().zip(points) {
            *slot = slot.min(distance_sq(*p, next));
        }
    }
    seeds
}

/// Partition `points` into at most `max_clusters` groups.
///
/// Each point is `(id, location)`. The result is independent of input
/// order: points are processed by ascending id. Every input id appears in
/// exactly one group, no group is empty, and each centroid is the mean of
/// its members.
#[must_use]
pub fn kmeans(points: &[(i64, Location)], max_clusters: usize) -> Vec<ClusterGroup> {
    if points.is_empty() || max_clusters == 0 {
        return Vec::new();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(id, _)| *id);
    let coords: Vec<Coord<f64>> = sorted.iter().map(|(_, loc)| loc.to_coord()).collect();

    let k = max_clusters.min(coords.len());
    let mut centroids = seed(&coords, k);
    let mut assignment: Vec<usize> = coords.iter().map(|p| nearest(*p, &centroids)).collect();

    for _ in 0..MAX_ITERATIONS {
        for (idx, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<Coord<f64>> = coords
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == idx)
                .map(|(p, _)| *p)
                .collect();
            if let Some(m) = mean(&members) {
                *centroid = m;
            }
        }
        let next: Vec<usize> = coords.iter().map(|p| nearest(*p, &centroids)).collect();
        if next == assignment {
            break;
        }
        assignment = next;
    }

    let mut groups: Vec<(Vec<i64>, Vec<Coord<f64>>)> = vec![(Vec::new(), Vec::new()); centroids.len()];
    for ((id, _), (coord, group)) in sorted.iter().zip(coords.iter().zip(&assignment)) {
        groups[*group].0.push(*id);
        groups[*group].1.push(*coord);
    }

    groups
        .into_iter()
        .filter_map(|(member_ids, coords)| {
            mean(&coords).map(|c| ClusterGroup {
                member_ids,
                centroid: Location::from_coord(c),
            })
        })
        .collect()
}
