//! Mesh construction
//!
//! A mesh is the dual graph of a relaxed Voronoi tessellation:
//! 1. scatter N random sample points over the extent,
//! 2. smooth them with Lloyd relaxation (points move to their cell centers),
//! 3. take the corners of the relaxed points' Voronoi cells as graph nodes,
//!    joined wherever a cell side runs between two corners.
//!
//! Interior nodes are Delaunay circumcenters with three neighbours. Nodes on
//! the map border have fewer neighbours (the rectangle corners have two), which
//! is how the rest of the crate recognises the map edge.

use tracing::{debug, info};

use crate::error::{Result, TerrainError};
use crate::geometry::{Extent, Point};
use crate::random::RandomSource;
use crate::voronoi::VoronoiDiagram;

/// Default Lloyd relaxation passes.
pub const DEFAULT_RELAX_ITERATIONS: usize = 1;

/// Fraction of the extent treated as "near the edge" by [`Mesh::is_near_edge`].
const NEAR_EDGE_MARGIN: f64 = 0.475;

/// A mesh edge: two node indices and the two sites the edge separates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshEdge {
    pub a: usize,
    pub b: usize,
    pub left: usize,
    /// Absent on the outer boundary.
    pub right: Option<usize>,
}

/// Immutable planar graph shared by every height field built over it.
#[derive(Clone, Debug)]
pub struct Mesh {
    sites: Vec<Point>,
    nodes: Vec<Point>,
    adjacency: Vec<Vec<usize>>,
    /// Sites touching each node. Merged cocircular nodes may hold more than three.
    triangle_sites: Vec<Vec<usize>>,
    edges: Vec<MeshEdge>,
    extent: Extent,
}

/// N points uniformly spread over the extent.
///
/// Draws `2n` values: x then y for each point.
pub fn generate_points<R: RandomSource + ?Sized>(n: usize, extent: &Extent, rng: &mut R) -> Vec<Point> {
    (0..n)
        .map(|_| {
            let x = (rng.next(0.0, 1.0) - 0.5) * extent.width;
            let y = (rng.next(0.0, 1.0) - 0.5) * extent.height;
            Point::new(x, y)
        })
        .collect()
}

/// Lloyd relaxation: each pass moves every site to the center of its
/// extent-clipped Voronoi cell. The result is sorted row-major (y, then x)
/// so node numbering does not depend on input order.
///
/// A site whose cell is empty (it coincides with a lower-numbered site) stays
/// where it is. Draws nothing.
pub fn relax(sites: &[Point], extent: &Extent, iterations: usize) -> Vec<Point> {
    let mut sites = sites.to_vec();
    for pass in 0..iterations {
        let diagram = VoronoiDiagram::compute(&sites, *extent);
        sites = diagram
            .cells
            .iter()
            .zip(&sites)
            .map(|(cell, &site)| cell.centroid().unwrap_or(site))
            .collect();
        debug!(pass, sites = sites.len(), "lloyd relaxation pass");
    }
    sort_row_major(&mut sites);
    sites
}

fn sort_row_major(sites: &mut [Point]) {
    sites.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
}

/// Random points, relaxed, then meshed. Draws `2n` values.
pub fn generate_good_mesh<R: RandomSource + ?Sized>(
    n: usize,
    extent: Extent,
    relax_iterations: usize,
    rng: &mut R,
) -> Mesh {
    let mut points = generate_points(n, &extent, rng);
    sort_row_major(&mut points);
    let points = relax(&points, &extent, relax_iterations);
    Mesh::build(&points, extent)
}

impl Mesh {
    /// Mesh from the Voronoi diagram of `sites` clipped to `extent`.
    ///
    /// Degenerate input (coincident or cocircular sites) is absorbed into the
    /// graph as-is.
    pub fn build(sites: &[Point], extent: Extent) -> Self {
        let graph = VoronoiDiagram::compute(sites, extent).vertex_graph();
        let edges = graph
            .edges
            .iter()
            .map(|e| MeshEdge {
                a: e.a,
                b: e.b,
                left: e.left,
                right: e.right,
            })
            .collect();
        let mesh = Self::assemble(sites.to_vec(), graph.vertices, edges, extent);

        info!(
            sites = mesh.sites.len(),
            nodes = mesh.nodes.len(),
            edges = mesh.edges.len(),
            boundary = mesh.boundary_count(),
            "built mesh"
        );
        mesh
    }

    /// Mesh from explicit nodes and adjacency lists, without sites.
    ///
    /// Adjacency must be symmetric and free of self loops. The resulting mesh
    /// has no edges or triangle sites, so contours over it are empty.
    pub fn from_adjacency(nodes: Vec<Point>, adjacency: Vec<Vec<usize>>, extent: Extent) -> Result<Self> {
        if adjacency.len() != nodes.len() {
            return Err(TerrainError::InvalidMesh(format!(
                "{} adjacency lists for {} nodes",
                adjacency.len(),
                nodes.len()
            )));
        }
        for (i, nbs) in adjacency.iter().enumerate() {
            for &j in nbs {
                if j >= nodes.len() || j == i {
                    return Err(TerrainError::InvalidMesh(format!("node {} has invalid neighbour {}", i, j)));
                }
                if !adjacency[j].contains(&i) {
                    return Err(TerrainError::InvalidMesh(format!(
                        "adjacency is not symmetric between {} and {}",
                        i, j
                    )));
                }
            }
        }
        let triangle_sites = vec![Vec::new(); nodes.len()];
        Ok(Self {
            sites: Vec::new(),
            nodes,
            adjacency,
            triangle_sites,
            edges: Vec::new(),
            extent,
        })
    }

    fn assemble(sites: Vec<Point>, nodes: Vec<Point>, edges: Vec<MeshEdge>, extent: Extent) -> Self {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut triangle_sites: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for e in &edges {
            if !adjacency[e.a].contains(&e.b) {
                adjacency[e.a].push(e.b);
                adjacency[e.b].push(e.a);
            }
            for node in [e.a, e.b] {
                let touching = &mut triangle_sites[node];
                for site in std::iter::once(e.left).chain(e.right) {
                    if !touching.contains(&site) {
                        touching.push(site);
                    }
                }
            }
        }
        Self {
            sites,
            nodes,
            adjacency,
            triangle_sites,
            edges,
            extent,
        }
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// The (relaxed) sample points the mesh was built from.
    pub fn sites(&self) -> &[Point] {
        &self.sites
    }

    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    pub fn node(&self, i: usize) -> Point {
        self.nodes[i]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[MeshEdge] {
        &self.edges
    }

    pub fn adjacency(&self) -> &[Vec<usize>] {
        &self.adjacency
    }

    pub fn neighbours(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    /// Indices of the sites whose Delaunay triangle has node `i` as
    /// circumcenter. Usually three; fewer on the border. Four or more
    /// cocircular sites share one merged node, which lists all of them.
    pub fn triangle_site_indices(&self, i: usize) -> &[usize] {
        &self.triangle_sites[i]
    }

    pub fn triangle_sites(&self, i: usize) -> impl Iterator<Item = Point> + '_ {
        self.triangle_sites[i].iter().map(move |&s| self.sites[s])
    }

    /// Node lies on the map edge (fewer than three neighbours).
    pub fn is_edge(&self, i: usize) -> bool {
        self.adjacency[i].len() < 3
    }

    /// Node lies in the outer 5% of the map.
    pub fn is_near_edge(&self, i: usize) -> bool {
        let p = self.nodes[i];
        let (w, h) = (self.extent.width, self.extent.height);
        p.x < -NEAR_EDGE_MARGIN * w
            || p.x > NEAR_EDGE_MARGIN * w
            || p.y < -NEAR_EDGE_MARGIN * h
            || p.y > NEAR_EDGE_MARGIN * h
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.nodes[i].distance(self.nodes[j])
    }

    pub fn boundary_count(&self) -> usize {
        (0..self.nodes.len()).filter(|&i| self.is_edge(i)).count()
    }
}
