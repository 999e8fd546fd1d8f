//! Height fields and the combinators over them.
//!
//! A height field is one value per mesh node. Every operation returns a new
//! field; nothing here mutates its input.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Index;

use crate::error::{Result, TerrainError};
use crate::geometry::Point;
use crate::mesh::Mesh;

/// One value per node of a mesh, tied to that mesh by reference.
#[derive(Clone)]
pub struct HeightField<'m> {
    mesh: &'m Mesh,
    values: Vec<f64>,
}

impl<'m> HeightField<'m> {
    /// Field from explicit values; the count must match the mesh's nodes.
    pub fn from_values(mesh: &'m Mesh, values: Vec<f64>) -> Result<Self> {
        if values.len() != mesh.node_count() {
            return Err(TerrainError::InvalidParameter(format!(
                "{} values for a mesh of {} nodes",
                values.len(),
                mesh.node_count()
            )));
        }
        Ok(Self { mesh, values })
    }

    /// Field computed from each node's index and position.
    pub fn from_fn(mesh: &'m Mesh, mut f: impl FnMut(usize, Point) -> f64) -> Self {
        let values = mesh.nodes().iter().enumerate().map(|(i, &p)| f(i, p)).collect();
        Self { mesh, values }
    }

    pub fn mesh(&self) -> &'m Mesh {
        self.mesh
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    /// Both fields were built over the very same mesh instance.
    pub fn same_mesh(&self, other: &HeightField<'_>) -> bool {
        std::ptr::eq(self.mesh, other.mesh)
    }

    /// Elementwise transform.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            mesh: self.mesh,
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Elementwise transform that also sees the node index.
    pub fn map_indexed(&self, mut f: impl FnMut(usize, f64) -> f64) -> Self {
        Self {
            mesh: self.mesh,
            values: self.values.iter().enumerate().map(|(i, &v)| f(i, v)).collect(),
        }
    }

    /// Smallest value, ignoring NaN. `+inf` for an empty field.
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest value, ignoring NaN. `-inf` for an empty field.
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Share of nodes above zero.
    pub fn land_fraction(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().filter(|&&v| v > 0.0).count() as f64 / self.values.len() as f64
    }

    pub fn add(&self, other: &HeightField<'m>) -> Result<Self> {
        sum(&[self, other])
    }
}

impl Index<usize> for HeightField<'_> {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.values[i]
    }
}

impl PartialEq for HeightField<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.same_mesh(other) && self.values == other.values
    }
}

impl fmt::Debug for HeightField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeightField")
            .field("nodes", &self.mesh.node_count())
            .field("values", &self.values)
            .finish()
    }
}

/// Elementwise sum of one or more fields over the same mesh.
pub fn sum<'m, F: Borrow<HeightField<'m>>>(fields: &[F]) -> Result<HeightField<'m>> {
    let (first, rest) = fields
        .split_first()
        .ok_or(TerrainError::EmptyInput("sum needs at least one field"))?;
    let first = first.borrow();
    if rest.iter().any(|f| !first.same_mesh(f.borrow())) {
        return Err(TerrainError::MeshMismatch);
    }
    let mut values = first.values.clone();
    for field in rest {
        for (acc, v) in values.iter_mut().zip(&field.borrow().values) {
            *acc += v;
        }
    }
    Ok(HeightField {
        mesh: first.mesh,
        values,
    })
}

/// Rescale to `[0, 1]`. A flat field has no range and comes back as NaN
/// everywhere; callers must guard constant fields.
pub fn normalize<'m>(field: &HeightField<'m>) -> HeightField<'m> {
    let lo = field.min();
    let hi = field.max();
    field.map(|v| (v - lo) / (hi - lo))
}

/// Normalize, then square root: rounds hilltops and lifts lowlands.
pub fn peaky<'m>(field: &HeightField<'m>) -> HeightField<'m> {
    normalize(field).map(f64::sqrt)
}

/// Normalize, then square: sharpens peaks and flattens lowlands.
pub fn spiky<'m>(field: &HeightField<'m>) -> HeightField<'m> {
    normalize(field).map(|v| v * v)
}

/// Value at rank `q * (N - 1)` of the sorted values, linearly interpolated
/// between neighbouring ranks. `q` is clamped to `[0, 1]`.
pub fn quantile(field: &HeightField<'_>, q: f64) -> Result<f64> {
    if field.is_empty() {
        return Err(TerrainError::EmptyInput("quantile of an empty field"));
    }
    let mut sorted = field.values.clone();
    sorted.sort_by(f64::total_cmp);
    Ok(quantile_sorted(&sorted, q))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if q <= 0.0 || n == 1 {
        return sorted[0];
    }
    if q >= 1.0 {
        return sorted[n - 1];
    }
    let rank = q * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let frac = rank - lower as f64;
    let a = sorted[lower];
    let b = sorted[(lower + 1).min(n - 1)];
    a + (b - a) * frac
}

/// Shift so that the `q` quantile sits at zero.
pub fn set_sea_level<'m>(field: &HeightField<'m>, q: f64) -> Result<HeightField<'m>> {
    let delta = quantile(field, q)?;
    Ok(field.map(|v| v - delta))
}

/// Replace each value by the mean of its neighbours. Border nodes (fewer
/// than three neighbours) are set to zero.
pub fn relax_field<'m>(field: &HeightField<'m>) -> HeightField<'m> {
    let mesh = field.mesh;
    field.map_indexed(|i, _| {
        let nbs = mesh.neighbours(i);
        if nbs.len() < 3 {
            return 0.0;
        }
        nbs.iter().map(|&j| field.values[j]).sum::<f64>() / nbs.len() as f64
    })
}

/// Sink the map margin: subtracts `exp(10 * (|(2.4x/w, 2.4y/h)|_p - 1))`,
/// negligible in the middle and steep near the rectangle border.
pub fn drop_edge<'m>(field: &HeightField<'m>, p: f64) -> HeightField<'m> {
    let mesh = field.mesh;
    let extent = *mesh.extent();
    field.map_indexed(|i, v| {
        let node = mesh.node(i);
        let x = 2.4 * node.x / extent.width;
        let y = 2.4 * node.y / extent.height;
        let norm = (x.abs().powf(p) + y.abs().powf(p)).powf(1.0 / p);
        v - (10.0 * (norm - 1.0)).exp()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Extent;

    fn line_mesh(n: usize) -> Mesh {
        let nodes = (0..n).map(|i| Point::new(i as f64, 0.0)).collect();
        let adjacency = (0..n)
            .map(|i| {
                let mut nbs = Vec::new();
                if i > 0 {
                    nbs.push(i - 1);
                }
                if i + 1 < n {
                    nbs.push(i + 1);
                }
                nbs
            })
            .collect();
        Mesh::from_adjacency(nodes, adjacency, Extent::new(n as f64, 1.0)).unwrap()
    }

    #[test]
    fn test_sum_is_elementwise() {
        let mesh = line_mesh(4);
        let f = HeightField::from_values(&mesh, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let g = HeightField::from_values(&mesh, vec![0.5, -2.0, 0.0, 1.0]).unwrap();
        let s = sum(&[&f, &g]).unwrap();
        assert_eq!(s.values(), &[1.5, 0.0, 3.0, 5.0]);
        assert_eq!(f.add(&g).unwrap(), s);
    }

    #[test]
    fn test_sum_rejects_empty_and_foreign_meshes() {
        let a = line_mesh(3);
        let b = line_mesh(3);
        let fa = HeightField::from_fn(&a, |_, _| 1.0);
        let fb = HeightField::from_fn(&b, |_, _| 1.0);

        let empty: [&HeightField; 0] = [];
        assert_eq!(sum(&empty), Err(TerrainError::EmptyInput("sum needs at least one field")));
        assert_eq!(sum(&[&fa, &fb]), Err(TerrainError::MeshMismatch));
        assert_ne!(fa, fb);
    }

    #[test]
    fn test_from_values_checks_length() {
        let mesh = line_mesh(3);
        assert!(HeightField::from_values(&mesh, vec![1.0]).is_err());
    }

    #[test]
    fn test_normalize_range() {
        let mesh = line_mesh(5);
        let f = HeightField::from_values(&mesh, vec![-3.0, 1.0, 5.0, 0.0, 2.0]).unwrap();
        let n = normalize(&f);
        assert_eq!(n.min(), 0.0);
        assert_eq!(n.max(), 1.0);
        assert_eq!(n[1], 0.5);
    }

    #[test]
    fn test_normalize_flat_field_is_nan() {
        let mesh = line_mesh(3);
        let f = HeightField::from_fn(&mesh, |_, _| 7.0);
        assert!(normalize(&f).values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_peaky_and_spiky() {
        let mesh = line_mesh(3);
        let f = HeightField::from_values(&mesh, vec![0.0, 0.25, 1.0]).unwrap();
        assert_eq!(peaky(&f).values(), &[0.0, 0.5, 1.0]);
        assert_eq!(spiky(&f).values(), &[0.0, 0.0625, 1.0]);
    }

    #[test]
    fn test_quantile_interpolates() {
        let mesh = line_mesh(5);
        let f = HeightField::from_values(&mesh, vec![4.0, 0.0, 3.0, 1.0, 2.0]).unwrap();
        assert_eq!(quantile(&f, 0.0).unwrap(), 0.0);
        assert_eq!(quantile(&f, 0.5).unwrap(), 2.0);
        assert_eq!(quantile(&f, 1.0).unwrap(), 4.0);
        assert!((quantile(&f, 0.375).unwrap() - 1.5).abs() < 1e-12);
        assert_eq!(quantile(&f, 2.0).unwrap(), 4.0);
    }

    #[test]
    fn test_quantile_empty_field() {
        let mesh = Mesh::from_adjacency(Vec::new(), Vec::new(), Extent::default()).unwrap();
        let f = HeightField::from_fn(&mesh, |_, _| 0.0);
        assert!(matches!(quantile(&f, 0.5), Err(TerrainError::EmptyInput(_))));
    }

    #[test]
    fn test_set_sea_level_centers_median() {
        let mesh = line_mesh(5);
        let f = HeightField::from_values(&mesh, vec![4.0, 0.0, 3.0, 1.0, 2.0]).unwrap();
        let shifted = set_sea_level(&f, 0.5).unwrap();
        assert_eq!(shifted.values(), &[2.0, -2.0, 1.0, -1.0, 0.0]);
        assert_eq!(shifted.land_fraction(), 0.4);
    }

    #[test]
    fn test_relax_field_averages_interior() {
        let nodes = vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0), Point::new(-1.0, 0.0)];
        let adjacency = vec![vec![1, 2, 3], vec![0], vec![0], vec![0]];
        let mesh = Mesh::from_adjacency(nodes, adjacency, Extent::new(4.0, 4.0)).unwrap();
        let f = HeightField::from_values(&mesh, vec![10.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(relax_field(&f).values(), &[2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_drop_edge_lowers_margin_most() {
        let nodes = vec![Point::ZERO, Point::new(0.49, 0.0)];
        let mesh = Mesh::from_adjacency(nodes, vec![vec![1], vec![0]], Extent::new(1.0, 1.0)).unwrap();
        let f = HeightField::from_fn(&mesh, |_, _| 0.0);
        let dropped = drop_edge(&f, 4.0);
        assert!(dropped[0] > -1e-3);
        assert!(dropped[1] < -1.0);
    }
}
