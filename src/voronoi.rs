//! Bounded planar Voronoi diagram.
//!
//! Each cell starts as the map rectangle and is clipped by the bisector
//! half-planes of nearby sites, nearest first. A uniform bucket grid supplies
//! candidates ring by ring; a cell is final once the next ring is further away
//! than twice the cell's radius, since no site beyond that can cut it.
//!
//! Every polygon edge remembers what generated it (a neighbouring site or a
//! side of the rectangle). A vertex is identified by the generators meeting
//! there, never by its coordinates, and identities from different cells are
//! merged through the edges the cells share.

use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::geometry::{polygon_area, vertex_mean, Extent, Point};

/// A side of the map rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Bottom,
    Right,
    Top,
    Left,
}

/// What produced one edge of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generator {
    /// Bisector with the site of this index.
    Site(usize),
    /// Part of the map boundary.
    Border(Side),
}

/// Integer identity of a cell vertex: the three generators meeting there,
/// sorted.
pub type VertexKey = [Generator; 3];

/// One clipped Voronoi cell, counter-clockwise.
#[derive(Clone, Debug)]
pub struct Cell {
    pub site: usize,
    pub vertices: Vec<Point>,
    /// `edges[k]` runs from `vertices[k]` to `vertices[k + 1]` (wrapping).
    pub edges: Vec<Generator>,
}

impl Cell {
    fn bounding(site: usize, extent: &Extent) -> Self {
        Self {
            site,
            vertices: extent.corners().to_vec(),
            edges: vec![
                Generator::Border(Side::Bottom),
                Generator::Border(Side::Right),
                Generator::Border(Side::Top),
                Generator::Border(Side::Left),
            ],
        }
    }

    fn empty(site: usize) -> Self {
        Self {
            site,
            vertices: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.len() < 3
    }

    pub fn area(&self) -> f64 {
        polygon_area(&self.vertices)
    }

    /// Mean of the cell's corners, `None` for an empty cell.
    pub fn centroid(&self) -> Option<Point> {
        if self.is_empty() {
            None
        } else {
            Some(vertex_mean(&self.vertices))
        }
    }

    fn radius_squared(&self, center: Point) -> f64 {
        self.vertices
            .iter()
            .map(|v| v.distance_squared(center))
            .fold(0.0, f64::max)
    }

    /// Keep the part of the cell closer to `site` than to `other`.
    fn clip(&mut self, site: Point, other: Point, other_index: usize) {
        let normal = other - site;
        let offset = normal.dot(site.midpoint(other));
        let dist: Vec<f64> = self
            .vertices
            .iter()
            .map(|p| normal.dot(*p) - offset)
            .collect();
        if dist.iter().all(|&d| d <= 0.0) {
            return;
        }

        let n = self.vertices.len();
        let mut vertices = Vec::with_capacity(n + 1);
        let mut edges = Vec::with_capacity(n + 1);
        for k in 0..n {
            let next = (k + 1) % n;
            let (p, q) = (self.vertices[k], self.vertices[next]);
            let (dp, dq) = (dist[k], dist[next]);
            let label = self.edges[k];
            match (dp <= 0.0, dq <= 0.0) {
                (true, true) => {
                    vertices.push(p);
                    edges.push(label);
                }
                (true, false) => {
                    vertices.push(p);
                    edges.push(label);
                    vertices.push(crossing(p, q, dp, dq));
                    edges.push(Generator::Site(other_index));
                }
                (false, true) => {
                    vertices.push(crossing(p, q, dp, dq));
                    edges.push(label);
                }
                (false, false) => {}
            }
        }
        self.vertices = vertices;
        self.edges = edges;
    }

    /// Collapse edges shorter than the tolerance. Happens when four or more
    /// sites are cocircular.
    fn drop_degenerate_edges(&mut self, tolerance_sq: f64) {
        loop {
            let n = self.vertices.len();
            if n < 3 {
                self.vertices.clear();
                self.edges.clear();
                return;
            }
            let short = (0..n).find(|&k| {
                self.vertices[k].distance_squared(self.vertices[(k + 1) % n]) <= tolerance_sq
            });
            match short {
                Some(k) => {
                    // (vertex, outgoing edge) pairs stay aligned when removed together
                    self.vertices.remove(k);
                    self.edges.remove(k);
                }
                None => return,
            }
        }
    }

    fn vertex_key(&self, k: usize) -> VertexKey {
        let n = self.edges.len();
        let incoming = self.edges[(k + n - 1) % n];
        let outgoing = self.edges[k];
        let mut key = [Generator::Site(self.site), incoming, outgoing];
        key.sort();
        key
    }
}

fn crossing(p: Point, q: Point, dp: f64, dq: f64) -> Point {
    let t = dp / (dp - dq);
    p + (q - p) * t
}

/// Uniform bucket grid over the sites.
struct SiteGrid {
    origin: Point,
    cell_w: f64,
    cell_h: f64,
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<usize>>,
}

impl SiteGrid {
    fn new(sites: &[Point], extent: &Extent) -> Self {
        let mut lo = extent.min();
        let mut hi = extent.max();
        for p in sites {
            lo = Point::new(lo.x.min(p.x), lo.y.min(p.y));
            hi = Point::new(hi.x.max(p.x), hi.y.max(p.y));
        }
        let width = (hi.x - lo.x).max(f64::EPSILON);
        let height = (hi.y - lo.y).max(f64::EPSILON);

        let n = sites.len().max(1) as f64;
        let cols = ((n * width / height).sqrt().ceil() as usize).max(1);
        let rows = ((n / cols as f64).ceil() as usize).max(1);

        let mut grid = Self {
            origin: lo,
            cell_w: width / cols as f64,
            cell_h: height / rows as f64,
            cols,
            rows,
            buckets: vec![Vec::new(); cols * rows],
        };
        for (i, &p) in sites.iter().enumerate() {
            let (c, r) = grid.bucket_of(p);
            grid.buckets[r * cols + c].push(i);
        }
        grid
    }

    fn bucket_of(&self, p: Point) -> (usize, usize) {
        let c = ((p.x - self.origin.x) / self.cell_w).floor().max(0.0) as usize;
        let r = ((p.y - self.origin.y) / self.cell_h).floor().max(0.0) as usize;
        (c.min(self.cols - 1), r.min(self.rows - 1))
    }

    /// Sites in buckets at Chebyshev distance exactly `ring` from (col, row).
    fn ring(&self, col: usize, row: usize, ring: usize, out: &mut Vec<usize>) {
        let ring = ring as isize;
        let (col, row) = (col as isize, row as isize);
        for dr in -ring..=ring {
            let r = row + dr;
            if r < 0 || r >= self.rows as isize {
                continue;
            }
            let on_edge_row = dr.abs() == ring;
            let step = if on_edge_row || ring == 0 { 1 } else { 2 * ring };
            let mut dc = -ring;
            while dc <= ring {
                let c = col + dc;
                if c >= 0 && c < self.cols as isize {
                    out.extend_from_slice(&self.buckets[r as usize * self.cols + c as usize]);
                }
                dc += step;
            }
        }
    }

    fn max_ring(&self) -> usize {
        self.cols.max(self.rows)
    }

    /// Lower bound on the distance to any site outside rings `0..=ring`.
    fn clearance(&self, ring: usize) -> f64 {
        ring as f64 * self.cell_w.min(self.cell_h)
    }
}

/// Edge of the vertex graph: two vertex indices and the sites it separates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoronoiEdge {
    pub a: usize,
    pub b: usize,
    pub left: usize,
    /// `None` on the map boundary.
    pub right: Option<usize>,
}

/// Voronoi corners with integer identities, plus the edges between them.
#[derive(Clone, Debug, Default)]
pub struct VertexGraph {
    pub vertices: Vec<Point>,
    pub edges: Vec<VoronoiEdge>,
}

/// Voronoi diagram of a set of sites, clipped to the map extent.
#[derive(Clone, Debug)]
pub struct VoronoiDiagram {
    pub extent: Extent,
    pub cells: Vec<Cell>,
}

impl VoronoiDiagram {
    pub fn compute(sites: &[Point], extent: Extent) -> Self {
        let grid = SiteGrid::new(sites, &extent);
        let shadowed = shadowed_duplicates(sites);
        let tolerance = 1e-10 * extent.diagonal();
        let tolerance_sq = tolerance * tolerance;

        #[cfg(feature = "parallel")]
        let cells: Vec<Cell> = (0..sites.len())
            .into_par_iter()
            .map(|i| build_cell(i, sites, &shadowed, &extent, &grid, tolerance_sq))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let cells: Vec<Cell> = (0..sites.len())
            .map(|i| build_cell(i, sites, &shadowed, &extent, &grid, tolerance_sq))
            .collect();

        let covered: f64 = cells.iter().map(Cell::area).sum();
        debug!(
            sites = sites.len(),
            duplicates = shadowed.iter().filter(|&&d| d).count(),
            empty = cells.iter().filter(|c| c.is_empty()).count(),
            coverage = covered / (extent.width * extent.height),
            "computed voronoi cells"
        );
        Self { extent, cells }
    }

    /// Build the corner graph: one vertex per distinct corner identity, one
    /// edge per shared cell side or boundary side.
    ///
    /// Vertex indices are assigned in order of first appearance while walking
    /// cells in site order and each cell's edges counter-clockwise.
    pub fn vertex_graph(&self) -> VertexGraph {
        let mut key_ids: HashMap<VertexKey, usize> = HashMap::new();
        let mut key_pos: Vec<Point> = Vec::new();
        let cell_keys: Vec<Vec<usize>> = self
            .cells
            .iter()
            .map(|cell| {
                (0..cell.vertices.len())
                    .map(|k| {
                        let key = cell.vertex_key(k);
                        *key_ids.entry(key).or_insert_with(|| {
                            key_pos.push(cell.vertices[k]);
                            key_pos.len() - 1
                        })
                    })
                    .collect()
            })
            .collect();

        // The side shared by cells a and b runs start->end in a and end->start in b.
        let mut shared: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        for (cell, keys) in self.cells.iter().zip(&cell_keys) {
            let n = keys.len();
            for (k, edge) in cell.edges.iter().enumerate() {
                if let Generator::Site(other) = *edge {
                    shared.insert((cell.site, other), (keys[k], keys[(k + 1) % n]));
                }
            }
        }
        let mut identity = DisjointSet::new(key_pos.len());
        for (cell, keys) in self.cells.iter().zip(&cell_keys) {
            let n = keys.len();
            for (k, edge) in cell.edges.iter().enumerate() {
                let Generator::Site(other) = *edge else {
                    continue;
                };
                if other < cell.site {
                    continue;
                }
                if let Some(&(other_start, other_end)) = shared.get(&(other, cell.site)) {
                    identity.union(keys[k], other_end);
                    identity.union(keys[(k + 1) % n], other_start);
                }
            }
        }

        let mut graph = VertexGraph::default();
        let mut vertex_of_root: HashMap<usize, usize> = HashMap::new();
        let mut emitted: HashSet<(usize, usize)> = HashSet::new();
        for (cell, keys) in self.cells.iter().zip(&cell_keys) {
            let n = keys.len();
            for (k, edge) in cell.edges.iter().enumerate() {
                let right = match *edge {
                    Generator::Site(other) => {
                        let pair = (cell.site.min(other), cell.site.max(other));
                        if !emitted.insert(pair) {
                            continue;
                        }
                        Some(other)
                    }
                    Generator::Border(_) => None,
                };
                let (start, end) = (keys[k], keys[(k + 1) % n]);
                let (root_a, root_b) = (identity.find(start), identity.find(end));
                if root_a == root_b {
                    continue;
                }
                let a = *vertex_of_root.entry(root_a).or_insert_with(|| {
                    graph.vertices.push(key_pos[start]);
                    graph.vertices.len() - 1
                });
                let b = *vertex_of_root.entry(root_b).or_insert_with(|| {
                    graph.vertices.push(key_pos[end]);
                    graph.vertices.len() - 1
                });
                graph.edges.push(VoronoiEdge {
                    a,
                    b,
                    left: cell.site,
                    right,
                });
            }
        }
        graph
    }
}

/// `true` for every site sitting exactly on a lower-index site.
///
/// Such sites get no cell and must not clip anyone else's, or their
/// bisectors leave edges with no partner on the other side.
fn shadowed_duplicates(sites: &[Point]) -> Vec<bool> {
    let mut seen = HashSet::with_capacity(sites.len());
    sites
        .iter()
        .map(|p| {
            // +0.0 folds -0.0 into 0.0 so equal coordinates share bits
            let key = ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits());
            !seen.insert(key)
        })
        .collect()
}

fn build_cell(
    i: usize,
    sites: &[Point],
    shadowed: &[bool],
    extent: &Extent,
    grid: &SiteGrid,
    tolerance_sq: f64,
) -> Cell {
    if shadowed[i] {
        return Cell::empty(i);
    }
    let site = sites[i];
    let mut cell = Cell::bounding(i, extent);
    let (col, row) = grid.bucket_of(site);
    let mut candidates = Vec::new();

    for ring in 0..=grid.max_ring() {
        candidates.clear();
        grid.ring(col, row, ring, &mut candidates);
        candidates.retain(|&j| j != i && !shadowed[j]);
        candidates.sort_by(|&a, &b| {
            site.distance_squared(sites[a])
                .total_cmp(&site.distance_squared(sites[b]))
                .then(a.cmp(&b))
        });

        for &j in &candidates {
            let other = sites[j];
            let d2 = site.distance_squared(other);
            if d2 > 4.0 * cell.radius_squared(site) {
                break;
            }
            cell.clip(site, other, j);
            if cell.is_empty() {
                return Cell::empty(i);
            }
        }

        let clearance = grid.clearance(ring);
        if clearance * clearance >= 4.0 * cell.radius_squared(site) {
            break;
        }
    }

    cell.drop_degenerate_edges(tolerance_sq);
    cell
}

/// Union-find over vertex key ids.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // smaller id wins so roots do not depend on union order
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_sites(n: usize, extent: &Extent, seed: u64) -> Vec<Point> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Point::new(
                    rng.gen_range(-extent.half_width()..extent.half_width()),
                    rng.gen_range(-extent.half_height()..extent.half_height()),
                )
            })
            .collect()
    }

    #[test]
    fn test_cells_tile_the_extent() {
        let extent = Extent::new(1.0, 2.0);
        let sites = random_sites(200, &extent, 11);
        let diagram = VoronoiDiagram::compute(&sites, extent);

        assert_eq!(diagram.cells.len(), 200);
        let total: f64 = diagram.cells.iter().map(Cell::area).sum();
        assert!((total - 2.0).abs() < 1e-9, "cells cover {} of 2.0", total);
    }

    #[test]
    fn test_cell_contains_nearest_points_only() {
        let extent = Extent::new(1.0, 1.0);
        let sites = random_sites(50, &extent, 5);
        let diagram = VoronoiDiagram::compute(&sites, extent);

        for cell in &diagram.cells {
            let c = cell.centroid().unwrap();
            let own = c.distance_squared(sites[cell.site]);
            for other in &sites {
                assert!(own <= c.distance_squared(*other) + 1e-12);
            }
        }
    }

    #[test]
    fn test_single_site_is_whole_rectangle() {
        let extent = Extent::new(2.0, 1.0);
        let diagram = VoronoiDiagram::compute(&[Point::new(0.1, 0.2)], extent);
        let graph = diagram.vertex_graph();

        assert_eq!(graph.vertices.len(), 4);
        assert_eq!(graph.edges.len(), 4);
        assert!(graph.edges.iter().all(|e| e.right.is_none()));
    }

    #[test]
    fn test_two_sites_share_one_edge() {
        let extent = Extent::new(2.0, 2.0);
        let sites = [Point::new(-0.5, 0.1), Point::new(0.5, -0.1)];
        let graph = VoronoiDiagram::compute(&sites, extent).vertex_graph();

        let interior: Vec<_> = graph.edges.iter().filter(|e| e.right.is_some()).collect();
        assert_eq!(interior.len(), 1);
        assert_eq!(interior[0].left, 0);
        assert_eq!(interior[0].right, Some(1));
        // 4 corners + 2 points where the bisector meets the border
        assert_eq!(graph.vertices.len(), 6);
    }

    #[test]
    fn test_regular_grid_merges_cocircular_corners() {
        let extent = Extent::new(3.0, 3.0);
        let mut sites = Vec::new();
        for y in [-1.0, 0.0, 1.0] {
            for x in [-1.0, 0.0, 1.0] {
                sites.push(Point::new(x, y));
            }
        }
        let graph = VoronoiDiagram::compute(&sites, extent).vertex_graph();

        // a 4x4 lattice of corners
        assert_eq!(graph.vertices.len(), 16);
        assert_eq!(graph.edges.len(), 24);
    }

    #[test]
    fn test_coincident_sites_keep_first() {
        let extent = Extent::new(1.0, 1.0);
        let sites = [Point::new(0.1, 0.1), Point::new(0.1, 0.1), Point::new(-0.3, 0.2)];
        let diagram = VoronoiDiagram::compute(&sites, extent);
        assert!(!diagram.cells[0].is_empty());
        assert!(diagram.cells[1].is_empty());
    }

    #[test]
    fn test_duplicate_sites_do_not_clip_neighbours() {
        let extent = Extent::new(1.0, 1.0);
        let sites = [
            Point::new(-0.25, -0.25),
            Point::new(0.25, -0.25),
            Point::new(-0.25, 0.25),
            Point::new(0.25, 0.25),
            Point::new(0.25, 0.25),
            Point::new(-0.25, -0.25),
        ];
        let diagram = VoronoiDiagram::compute(&sites, extent);
        assert!(diagram.cells[4].is_empty());
        assert!(diagram.cells[5].is_empty());
        for cell in &diagram.cells[..4] {
            assert!(cell.edges.iter().all(|g| !matches!(g, Generator::Site(4) | Generator::Site(5))));
            assert!((cell.area() - 0.25).abs() < 1e-12);
        }

        // same lattice as without the copies: 3x3 corners
        let graph = diagram.vertex_graph();
        assert_eq!(graph.vertices.len(), 9);
        assert_eq!(graph.edges.len(), 12);
    }
}
