//! Contour extraction and polyline stitching.
//!
//! Contours run between the sites on either side of every mesh edge whose
//! two endpoints straddle the level. The raw segments are then joined into
//! maximal simple paths by [`stitch`], which works on any integer-like key.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use tracing::debug;

use crate::geometry::Point;
use crate::heightfield::HeightField;

/// An ordered run of points. Closed polylines repeat their first point at
/// the end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.points.first() == self.points.last()
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// Join undirected 2-point segments into maximal simple paths.
///
/// A path grows at an end only while that end has degree exactly 2 over the
/// whole segment set; junctions of degree 3 or more stop growth, so branches
/// come out as separate paths meeting at the junction. Paths are emitted in
/// the order they are finished. A closed loop repeats its first key.
pub fn stitch<K: Copy + Eq + Hash>(segments: &[(K, K)]) -> Vec<Vec<K>> {
    let mut incident: HashMap<K, Vec<usize>> = HashMap::new();
    for (s, &(a, b)) in segments.iter().enumerate() {
        incident.entry(a).or_default().push(s);
        incident.entry(b).or_default().push(s);
    }

    let mut used = vec![false; segments.len()];
    let mut paths = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (a, b) = segments[start];
        let mut path = VecDeque::from([a, b]);

        loop {
            if let Some(key) = extend(segments, &incident, &mut used, path[0]) {
                path.push_front(key);
            } else if let Some(key) = extend(segments, &incident, &mut used, path[path.len() - 1]) {
                path.push_back(key);
            } else {
                break;
            }
        }
        paths.push(Vec::from(path));
    }
    paths
}

/// Consume the next segment attached at `end`, if `end` has degree 2.
fn extend<K: Copy + Eq + Hash>(
    segments: &[(K, K)],
    incident: &HashMap<K, Vec<usize>>,
    used: &mut [bool],
    end: K,
) -> Option<K> {
    let touching = incident.get(&end)?;
    if touching.len() != 2 {
        return None;
    }
    let next = touching.iter().copied().find(|&s| !used[s])?;
    used[next] = true;
    let (a, b) = segments[next];
    Some(if a == end { b } else { a })
}

/// Site-index pairs for every mesh edge crossing `level`.
fn crossing_segments(field: &HeightField<'_>, level: f64, skip_near_edge: bool) -> Vec<(usize, usize)> {
    let mesh = field.mesh();
    mesh.edges()
        .iter()
        .filter(|e| !skip_near_edge || !(mesh.is_near_edge(e.a) || mesh.is_near_edge(e.b)))
        .filter_map(|e| {
            let right = e.right?;
            let (ha, hb) = (field[e.a], field[e.b]);
            let crosses = (ha > level && hb <= level) || (hb > level && ha <= level);
            crosses.then_some((e.left, right))
        })
        .collect()
}

/// Contour paths as sequences of site indices.
pub fn contour_sites(field: &HeightField<'_>, level: f64) -> Vec<Vec<usize>> {
    stitch(&crossing_segments(field, level, false))
}

/// Contour of `field` at `level`, as polylines through site positions.
pub fn contour(field: &HeightField<'_>, level: f64) -> Vec<Polyline> {
    to_polylines(field, stitch(&crossing_segments(field, level, false)))
}

/// Like [`contour`], but ignores edges touching the outer 5% of the map,
/// where the border nodes make coastlines ragged.
pub fn contour_interior(field: &HeightField<'_>, level: f64) -> Vec<Polyline> {
    to_polylines(field, stitch(&crossing_segments(field, level, true)))
}

fn to_polylines(field: &HeightField<'_>, paths: Vec<Vec<usize>>) -> Vec<Polyline> {
    let sites = field.mesh().sites();
    let polylines: Vec<Polyline> = paths
        .into_iter()
        .map(|path| Polyline::new(path.into_iter().map(|s| sites[s]).collect()))
        .collect();
    debug!(
        polylines = polylines.len(),
        closed = polylines.iter().filter(|p| p.is_closed()).count(),
        "Contour stitched"
    );
    polylines
}

/// Smooth interior points with weights `[1/4, 1/2, 1/4]`; endpoints stay put.
pub fn relax_path(path: &Polyline) -> Polyline {
    let pts = &path.points;
    if pts.len() < 3 {
        return path.clone();
    }
    let mut out = Vec::with_capacity(pts.len());
    out.push(pts[0]);
    for w in pts.windows(3) {
        out.push(w[0] * 0.25 + w[1] * 0.5 + w[2] * 0.25);
    }
    out.push(pts[pts.len() - 1]);
    Polyline::new(out)
}
