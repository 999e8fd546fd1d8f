//! Gradient and downhill analysis over height fields.
//!
//! The gradient at an interior node comes from the plane through its three
//! neighbours. Downhill pointers follow the steepest strictly-lower neighbour
//! and are kept in a separate [`DownhillIndex`], built once from a field.

use crate::geometry::Point;
use crate::heightfield::HeightField;

/// Determinants below this magnitude are treated as a degenerate triangle.
const DEGENERATE_DET: f64 = 1e-12;

/// Planar gradient `(dx, dy)` at node `i`.
///
/// Solves for the plane through the three neighbour nodes and their values.
/// Nodes without exactly three neighbours, or whose neighbours are collinear,
/// get a zero gradient.
pub fn trislope(field: &HeightField<'_>, i: usize) -> Point {
    let mesh = field.mesh();
    let nbs = mesh.neighbours(i);
    if nbs.len() != 3 {
        return Point::ZERO;
    }

    let p0 = mesh.node(nbs[0]);
    let e1 = mesh.node(nbs[1]) - p0;
    let e2 = mesh.node(nbs[2]) - p0;
    let det = e1.cross(e2);
    if det.abs() < DEGENERATE_DET || !det.is_finite() {
        return Point::ZERO;
    }

    let h1 = field[nbs[1]] - field[nbs[0]];
    let h2 = field[nbs[2]] - field[nbs[0]];
    Point::new((e2.y * h1 - e1.y * h2) / det, (-e2.x * h1 + e1.x * h2) / det)
}

/// Gradient magnitude at node `i`.
pub fn steepness(field: &HeightField<'_>, i: usize) -> f64 {
    trislope(field, i).length()
}

/// Steepness at every node.
pub fn slope_field<'m>(field: &HeightField<'m>) -> HeightField<'m> {
    field.map_indexed(|i, _| steepness(field, i))
}

/// Where water leaves a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Downhill {
    /// Lowest strictly-lower neighbour
    To(usize),
    /// No neighbour is lower
    LocalMinimum,
    /// Node on the map edge (fewer than three neighbours)
    Boundary,
}

impl Downhill {
    pub fn target(self) -> Option<usize> {
        match self {
            Downhill::To(j) => Some(j),
            _ => None,
        }
    }
}

/// Downhill pointer of every node, computed from one field snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownhillIndex {
    pointers: Vec<Downhill>,
}

impl DownhillIndex {
    pub fn compute(field: &HeightField<'_>) -> Self {
        let mesh = field.mesh();
        let pointers = (0..field.len())
            .map(|i| {
                if mesh.is_edge(i) {
                    return Downhill::Boundary;
                }
                let mut best = None;
                let mut best_height = field[i];
                for &j in mesh.neighbours(i) {
                    if field[j] < best_height {
                        best = Some(j);
                        best_height = field[j];
                    }
                }
                best.map_or(Downhill::LocalMinimum, Downhill::To)
            })
            .collect();
        Self { pointers }
    }

    pub fn get(&self, i: usize) -> Downhill {
        self.pointers[i]
    }

    pub fn as_slice(&self) -> &[Downhill] {
        &self.pointers
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Nodes visited following pointers from `start`, `start` included.
    ///
    /// Heights strictly decrease along the path, so it always ends at a
    /// local minimum or a boundary node.
    pub fn trace(&self, start: usize) -> Vec<usize> {
        let mut path = vec![start];
        let mut current = start;
        while let Downhill::To(next) = self.pointers[current] {
            path.push(next);
            current = next;
        }
        path
    }

    /// Number of local minima (sinks) in the field.
    pub fn sink_count(&self) -> usize {
        self.pointers.iter().filter(|d| **d == Downhill::LocalMinimum).count()
    }
}
