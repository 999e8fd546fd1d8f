use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::heightfield::HeightField;
use crate::mesh::Mesh;
use crate::random::RandomSource;

// =============================================================================
// GENERATOR PARAMETERS
// =============================================================================

/// Default radius of a `mountains` bump
pub const DEFAULT_MOUNTAIN_RADIUS: f64 = 0.05;

/// Parameters for a chain of ridges
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgeParams {
    /// Number of parallel ridges in the chain
    pub count: usize,
    /// Width of each bump (also the spacing unit)
    pub width: f64,
    /// Nominal ridge length, in units of `width`
    pub length: f64,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self {
            count: 5,
            width: 0.02,
            length: 20.0,
        }
    }
}

/// Parameters for coherent noise
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Output scale (noise itself is in [-1, 1])
    pub amplitude: f64,
    /// Base frequency in cycles per map unit
    pub frequency: f64,
    /// Number of noise octaves
    pub octaves: u32,
    /// Amplitude decay per octave (0.0-1.0)
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            frequency: 2.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

// =============================================================================
// NOISE SOURCE
// =============================================================================

/// A deterministic 2D coherent noise function.
pub trait NoiseSource {
    /// Sample at a map position; result in `[-1, 1]`.
    fn sample2d(&self, x: f64, y: f64) -> f64;
}

/// Multi-octave Perlin noise.
#[derive(Clone, Debug)]
pub struct FbmNoise {
    perlin: Perlin,
    frequency: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
}

impl FbmNoise {
    pub fn new(seed: u32, params: &NoiseParams) -> Self {
        Self {
            perlin: Perlin::new(seed),
            frequency: params.frequency,
            octaves: params.octaves.max(1),
            persistence: params.persistence,
            lacunarity: params.lacunarity,
        }
    }
}

impl NoiseSource for FbmNoise {
    fn sample2d(&self, x: f64, y: f64) -> f64 {
        fbm(
            &self.perlin,
            x * self.frequency,
            y * self.frequency,
            self.octaves,
            self.persistence,
            self.lacunarity,
        )
        .clamp(-1.0, 1.0)
    }
}

/// Fractional Brownian motion, normalized by the total amplitude
fn fbm(noise: &Perlin, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if max_value > 0.0 {
        total / max_value
    } else {
        0.0
    }
}

// =============================================================================
// GENERATORS
// =============================================================================

/// Constant zero.
pub fn zero(mesh: &Mesh) -> HeightField<'_> {
    HeightField::from_fn(mesh, |_, _| 0.0)
}

/// Inclined plane: `x*dx + y*dy`.
pub fn slope(mesh: &Mesh, direction: Point) -> HeightField<'_> {
    HeightField::from_fn(mesh, |_, p| p.dot(direction))
}

/// Valley along the vertical axis: both halves rise away from `x = 0`, with
/// a sinusoidal meander along y so the valley floor wanders.
pub fn slope_river(mesh: &Mesh, direction: Point) -> HeightField<'_> {
    HeightField::from_fn(mesh, |_, p| {
        let meander = (p.y * direction.x).sin() + (0.7 * p.y * direction.x).sin();
        if p.x < 0.0 {
            1.75 * p.x * -direction.x - meander
        } else {
            1.75 * p.x * direction.x + meander
        }
    })
}

/// Cone centered on the map: `steepness * r`. Negative steepness makes an
/// island, positive a basin.
pub fn cone(mesh: &Mesh, steepness: f64) -> HeightField<'_> {
    HeightField::from_fn(mesh, |_, p| steepness * p.length())
}

/// Sum of Gaussian bumps `exp(-d^2 / (2 r^2))^2` around each center.
pub fn radial_bumps<'m>(mesh: &'m Mesh, centers: &[Point], radius: f64) -> HeightField<'m> {
    bumps(mesh, centers, radius, 1.0)
}

fn bumps<'m>(mesh: &'m Mesh, centers: &[Point], radius: f64, weight: f64) -> HeightField<'m> {
    let denominator = 2.0 * radius * radius;
    HeightField::from_fn(mesh, |_, p| {
        centers
            .iter()
            .map(|&c| {
                let bump = (-p.distance_squared(c) / denominator).exp();
                weight * bump * bump
            })
            .sum()
    })
}

/// `n` bumps at random positions. Draws `2n` values (x then y per center).
pub fn mountains<'m, R: RandomSource + ?Sized>(mesh: &'m Mesh, n: usize, radius: f64, rng: &mut R) -> HeightField<'m> {
    let extent = *mesh.extent();
    let centers: Vec<Point> = (0..n)
        .map(|_| {
            let x = extent.width * (rng.next(0.0, 1.0) - 0.5);
            let y = extent.height * (rng.next(0.0, 1.0) - 0.5);
            Point::new(x, y)
        })
        .collect();
    radial_bumps(mesh, &centers, radius)
}

/// A chain of parallel ridges, each a jittered run of half-weight bumps.
///
/// One axis (center + angle) is chosen for the chain; ridges are laid out
/// along it and each ridge runs perpendicular to it. Draw order:
/// 2 (chain center) + 1 (angle) + `count` (spacings), then per ridge
/// 2 (offset jitter) + 1 (bump count), then per bump 5 (heading, 2 offset
/// jitter, 2 distance jitter).
pub fn ridge_chain<'m, R: RandomSource + ?Sized>(mesh: &'m Mesh, params: &RidgeParams, rng: &mut R) -> HeightField<'m> {
    let RidgeParams { count, width, length } = *params;

    let center = Point::new(
        (rng.next(0.0, 1.0) - 0.5) * 0.5,
        (rng.next(0.0, 1.0) - 0.5) * 0.5,
    );
    let angle = rng.next(0.0, 1.0) * 2.0 * std::f64::consts::PI;
    let ridge_angle = angle + std::f64::consts::FRAC_PI_2;

    let spacings: Vec<f64> = (0..count)
        .map(|_| (2.5 + rng.next(0.0, 1.0) * 0.5) * width)
        .collect();
    let half_span = spacings.iter().sum::<f64>() / 2.0;

    let mut centers = Vec::new();
    let mut offset_so_far = 0.0;
    for spacing in &spacings {
        let jitter_w = (rng.next(0.0, 1.0) - 0.5) * width * 2.0;
        let jitter_h = (rng.next(0.0, 1.0) - 0.5) * width * 2.0;
        let from_center = half_span - offset_so_far;
        let ridge_center = Point::new(
            center.x + angle.cos() * from_center + jitter_w,
            center.y + angle.sin() * from_center + jitter_h,
        );
        offset_so_far += spacing;

        let bump_count = (rng.next(0.0, 1.0) * (length + 1.0)).floor() + (length / 2.0).floor();
        let bump_count = bump_count.max(0.0) as usize;
        for j in 0..bump_count {
            let heading = ridge_angle + (rng.next(0.0, 1.0) - 0.5) * std::f64::consts::PI * 0.1;
            let cheat_w = (rng.next(0.0, 1.0) - 0.5) * width * 0.5;
            let cheat_h = (rng.next(0.0, 1.0) - 0.5) * width * 0.5;
            let along = width * (j as f64 - length / 2.0);
            let w_dist = along + (rng.next(0.0, 1.0) - 0.5) * width * 0.5;
            let h_dist = along + (rng.next(0.0, 1.0) - 0.5) * width * 0.5;
            centers.push(Point::new(
                ridge_center.x + heading.cos() * w_dist + cheat_w,
                ridge_center.y + heading.sin() * h_dist + cheat_h,
            ));
        }
    }

    bumps(mesh, &centers, width, 0.5)
}

/// Coherent noise from any source, scaled by `amplitude`. Draws nothing.
pub fn coherent_noise_with<'m, N: NoiseSource + ?Sized>(mesh: &'m Mesh, noise: &N, amplitude: f64) -> HeightField<'m> {
    HeightField::from_fn(mesh, |_, p| amplitude * noise.sample2d(p.x, p.y))
}

/// Multi-octave Perlin noise seeded with `seed`. Draws nothing from the
/// pipeline random source.
pub fn coherent_noise<'m>(mesh: &'m Mesh, params: &NoiseParams, seed: u32) -> HeightField<'m> {
    let noise = FbmNoise::new(seed, params);
    coherent_noise_with(mesh, &noise, params.amplitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Extent;
    use crate::heightfield::sum;
    use crate::mesh::generate_good_mesh;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pair_mesh() -> Mesh {
        let nodes = vec![Point::new(0.5, 0.0), Point::new(-0.5, 0.0)];
        Mesh::from_adjacency(nodes, vec![vec![1], vec![0]], Extent::new(2.0, 2.0)).unwrap()
    }

    fn random_mesh(seed: u64) -> Mesh {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generate_good_mesh(300, Extent::default(), 1, &mut rng)
    }

    struct Constant(f64);

    impl NoiseSource for Constant {
        fn sample2d(&self, _x: f64, _y: f64) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_slope_values() {
        let mesh = pair_mesh();
        let f = slope(&mesh, Point::new(1.0, 0.0));
        assert_eq!(f.values(), &[0.5, -0.5]);
    }

    #[test]
    fn test_zero_plus_zero() {
        let mesh = random_mesh(1);
        let z = zero(&mesh);
        assert_eq!(sum(&[&z, &zero(&mesh)]).unwrap(), z);
        assert_eq!(z.len(), mesh.node_count());
    }

    #[test]
    fn test_cone_scales_with_radius() {
        let mesh = pair_mesh();
        let f = cone(&mesh, -2.0);
        assert_eq!(f.values(), &[-1.0, -1.0]);
    }

    #[test]
    fn test_radial_bump_peaks_at_center() {
        let mesh = pair_mesh();
        let f = radial_bumps(&mesh, &[Point::new(0.5, 0.0)], 0.1);
        assert_eq!(f[0], 1.0);
        assert!(f[1] < 1e-10);
    }

    #[test]
    fn test_mountains_draw_count_and_determinism() {
        let mesh = random_mesh(2);
        let mut a = ChaCha8Rng::seed_from_u64(5);
        let mut b = ChaCha8Rng::seed_from_u64(5);
        let fa = mountains(&mesh, 7, DEFAULT_MOUNTAIN_RADIUS, &mut a);
        let fb = mountains(&mesh, 7, DEFAULT_MOUNTAIN_RADIUS, &mut b);
        assert_eq!(fa, fb);

        let mut c = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..14 {
            c.next(0.0, 1.0);
        }
        assert_eq!(a.next(0.0, 1.0), c.next(0.0, 1.0));
        assert!(fa.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_ridge_chain_is_deterministic() {
        let mesh = random_mesh(3);
        let params = RidgeParams::default();
        let mut a = ChaCha8Rng::seed_from_u64(17);
        let mut b = ChaCha8Rng::seed_from_u64(17);
        let fa = ridge_chain(&mesh, &params, &mut a);
        let fb = ridge_chain(&mesh, &params, &mut b);
        assert_eq!(fa, fb);
        assert!(fa.max() > 0.0);
        assert!(fa.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_coherent_noise_bounds() {
        let mesh = random_mesh(4);
        let params = NoiseParams {
            amplitude: 3.0,
            ..NoiseParams::default()
        };
        let f = coherent_noise(&mesh, &params, 42);
        assert!(f.values().iter().all(|v| v.abs() <= 3.0));
        assert_eq!(f, coherent_noise(&mesh, &params, 42));

        let flat = coherent_noise_with(&mesh, &Constant(0.5), 2.0);
        assert!(flat.values().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_slope_river_is_a_valley() {
        let nodes = vec![Point::new(-0.4, 0.0), Point::new(0.0, 0.0), Point::new(0.4, 0.0)];
        let adjacency = vec![vec![1], vec![0, 2], vec![1]];
        let mesh = Mesh::from_adjacency(nodes, adjacency, Extent::new(1.0, 1.0)).unwrap();
        let f = slope_river(&mesh, Point::new(1.0, 0.0));
        assert!(f[0] > f[1] && f[2] > f[1]);
    }
}
