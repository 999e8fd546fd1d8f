//! Coastal cleanup
//!
//! Removes single-node specks of land in the sea and of sea in the land.
//! Each iteration runs a land pass then a sea pass, the sea pass reading the
//! land pass's output.

use tracing::debug;

use crate::heightfield::HeightField;
use crate::mesh::Mesh;

// =============================================================================
// PASSES
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    /// Land nodes (> 0) with at most one land neighbour
    Land,
    /// Sea nodes (<= 0) with at most one sea neighbour
    Sea,
}

impl Pass {
    fn matches(self, value: f64) -> bool {
        match self {
            Pass::Land => value > 0.0,
            Pass::Sea => value <= 0.0,
        }
    }

    /// Replacement value for node `i`, or `None` if it fits in.
    ///
    /// Only interior nodes (three neighbours) qualify. The replacement is
    /// half the opposite-kind neighbour closest to zero.
    fn replacement(self, mesh: &Mesh, values: &[f64], i: usize) -> Option<f64> {
        let nbs = mesh.neighbours(i);
        if !self.matches(values[i]) || nbs.len() != 3 {
            return None;
        }
        let mut same = 0;
        let mut best: Option<f64> = None;
        for &j in nbs {
            let v = values[j];
            if self.matches(v) {
                same += 1;
            } else {
                best = Some(match (self, best) {
                    (_, None) => v,
                    (Pass::Land, Some(b)) => b.max(v),
                    (Pass::Sea, Some(b)) => b.min(v),
                });
            }
        }
        if same > 1 {
            return None;
        }
        best.map(|b| b / 2.0)
    }

    fn apply(self, mesh: &Mesh, values: &[f64]) -> (Vec<f64>, usize) {
        let mut changed = 0;
        let out = (0..values.len())
            .map(|i| match self.replacement(mesh, values, i) {
                Some(v) => {
                    changed += 1;
                    v
                }
                None => values[i],
            })
            .collect();
        (out, changed)
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

/// Run `iterations` rounds of land-then-sea anomaly removal.
pub fn clean_coast<'m>(field: &HeightField<'m>, iterations: usize) -> HeightField<'m> {
    let mesh = field.mesh();
    let mut values = field.values().to_vec();

    for iteration in 0..iterations {
        let (land, land_changed) = Pass::Land.apply(mesh, &values);
        let (sea, sea_changed) = Pass::Sea.apply(mesh, &land);
        values = sea;
        debug!(iteration, land_changed, sea_changed, "Coast cleanup pass");
        if land_changed + sea_changed == 0 {
            break;
        }
    }

    field.map_indexed(|i, _| values[i])
}

/// Number of nodes either pass would change on `field` as it stands.
pub fn coast_anomalies(field: &HeightField<'_>) -> usize {
    let mesh = field.mesh();
    let values = field.values();
    (0..values.len())
        .filter(|&i| {
            Pass::Land.replacement(mesh, values, i).is_some() || Pass::Sea.replacement(mesh, values, i).is_some()
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Extent, Point};
    use crate::heightmap::cone;
    use crate::mesh::generate_good_mesh;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// 3x3 grid of nodes:
    ///
    /// ```text
    /// 6 7 8
    /// 3 4 5
    /// 0 1 2
    /// ```
    ///
    /// Grid links, except 4-7, so the center has exactly three neighbours.
    fn grid_mesh() -> Mesh {
        let nodes = (0..9)
            .map(|i| Point::new((i % 3) as f64 * 0.5 - 0.5, (i / 3) as f64 * 0.5 - 0.5))
            .collect();
        let adjacency = vec![
            vec![1, 3],
            vec![0, 2, 4],
            vec![1, 5],
            vec![0, 4, 6],
            vec![1, 3, 5],
            vec![2, 4, 8],
            vec![3, 7],
            vec![6, 8],
            vec![5, 7],
        ];
        Mesh::from_adjacency(nodes, adjacency, Extent::new(2.0, 2.0)).unwrap()
    }

    #[test]
    fn test_sea_speck_is_filled() {
        let mesh = grid_mesh();
        let field = HeightField::from_values(&mesh, vec![1.0, 1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(coast_anomalies(&field), 1);

        let cleaned = clean_coast(&field, 1);
        assert_eq!(cleaned.values(), &[1.0, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(coast_anomalies(&cleaned), 0);
    }

    #[test]
    fn test_land_speck_is_sunk() {
        let mesh = grid_mesh();
        let field =
            HeightField::from_values(&mesh, vec![-1.0, -0.2, -1.0, -0.4, 2.0, -0.3, -1.0, -1.0, -1.0]).unwrap();
        let cleaned = clean_coast(&field, 1);
        assert_eq!(cleaned[4], -0.1);
        assert_eq!(cleaned[1], -0.2);
    }

    #[test]
    fn test_clean_field_is_unchanged() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mesh = generate_good_mesh(400, Extent::default(), 1, &mut rng);
        let field = cone(&mesh, -1.0).map(|v| v + 0.4);
        assert_eq!(coast_anomalies(&field), 0);
        assert_eq!(clean_coast(&field, 3), field);
    }

    #[test]
    fn test_zero_iterations() {
        let mesh = grid_mesh();
        let field = HeightField::from_values(&mesh, vec![1.0, 1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(clean_coast(&field, 0), field);
    }
}
