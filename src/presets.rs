//! Preset terrain pipelines
//!
//! Each preset is a fixed sequence of generators, smoothing, reshaping,
//! erosion, sea level and cleanup. Random draws happen in the same order on
//! every run, so a seed reproduces the same terrain.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coastline::clean_coast;
use crate::error::Result;
use crate::erosion::Erosion;
use crate::geometry::Point;
use crate::heightfield::{peaky, relax_field, set_sea_level, sum, HeightField};
use crate::heightmap::{
    coherent_noise, cone, mountains, ridge_chain, slope, slope_river, NoiseParams, RidgeParams,
    DEFAULT_MOUNTAIN_RADIUS,
};
use crate::mesh::Mesh;
use crate::random::{random_vector, RandomSource};

/// Default coast cleanup rounds at the end of every preset.
pub const DEFAULT_CLEAN_ITERATIONS: usize = 3;

/// Terrain preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TerrainPreset {
    /// Tilted land falling into the sea on one side
    #[default]
    Coast,
    /// Steep coast cut by parallel ridges
    Fjord,
    /// Mostly land with scattered peaks
    Mountain,
    /// Central island with one or two ridge chains
    Island,
    /// Noisy land split by a meandering valley
    River,
}

/// Knobs that override a preset's own choices.
///
/// Overriding the sea level still consumes the draw the preset would have
/// used, so the rest of the pipeline sees the same random stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineOptions {
    /// Sea-level quantile in [0, 1]
    pub sea_level: Option<f64>,
    pub clean_iterations: usize,
    /// Coherent noise for presets that use it
    pub noise: NoiseParams,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sea_level: None,
            clean_iterations: DEFAULT_CLEAN_ITERATIONS,
            noise: NoiseParams::default(),
        }
    }
}

/// Per-preset finishing steps.
struct Finish {
    relax_passes: usize,
    erosion: (f64, f64),
    erosion_iterations: usize,
    sea_level: (f64, f64),
}

impl TerrainPreset {
    pub fn all() -> &'static [Self] {
        &[Self::Coast, Self::Fjord, Self::Mountain, Self::Island, Self::River]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Coast => "Sloped coastline with scattered hills",
            Self::Fjord => "Steep coast with parallel ridges",
            Self::Mountain => "Mostly land, many peaks, little sea",
            Self::Island => "Central island with ridge chains",
            Self::River => "Noisy terrain split by a river valley",
        }
    }

    fn finish(&self) -> Finish {
        match self {
            Self::Coast | Self::Fjord => Finish {
                relax_passes: 10,
                erosion: (0.0, 0.1),
                erosion_iterations: 5,
                sea_level: (0.2, 0.6),
            },
            Self::Mountain => Finish {
                relax_passes: 5,
                erosion: (0.05, 0.15),
                erosion_iterations: 5,
                sea_level: (0.0, 0.05),
            },
            Self::Island => Finish {
                relax_passes: 10,
                erosion: (0.05, 0.1),
                erosion_iterations: 5,
                sea_level: (0.6, 0.75),
            },
            Self::River => Finish {
                relax_passes: 4,
                erosion: (0.3, 0.3),
                erosion_iterations: 3,
                sea_level: (0.4, 0.4),
            },
        }
    }

    /// Run the preset's pipeline over `mesh`.
    ///
    /// `noise_seed` only matters for presets that use coherent noise; it
    /// draws nothing from `rng`.
    pub fn generate<'m, R, E>(
        &self,
        mesh: &'m Mesh,
        rng: &mut R,
        noise_seed: u32,
        erosion: &E,
        options: &PipelineOptions,
    ) -> Result<HeightField<'m>>
    where
        R: RandomSource + ?Sized,
        E: Erosion + ?Sized,
    {
        info!(preset = %self, nodes = mesh.node_count(), "Generating terrain");

        let mut field = self.base(mesh, rng, noise_seed, &options.noise)?;
        let finish = self.finish();

        for _ in 0..finish.relax_passes {
            field = relax_field(&field);
        }
        field = peaky(&field);

        let amount = rng.next(finish.erosion.0, finish.erosion.1);
        debug!(amount, iterations = finish.erosion_iterations, "Eroding");
        field = erosion.erode(&field, amount, finish.erosion_iterations);

        let drawn = rng.next(finish.sea_level.0, finish.sea_level.1);
        let sea_level = options.sea_level.unwrap_or(drawn);
        debug!(sea_level, "Setting sea level");
        field = set_sea_level(&field, sea_level)?;

        field = erosion.fill_sinks(&field);
        field = clean_coast(&field, options.clean_iterations);

        info!(
            land_fraction = field.land_fraction(),
            min = field.min(),
            max = field.max(),
            "Terrain generated"
        );
        Ok(field)
    }

    /// Sum of the preset's generators, before any smoothing.
    fn base<'m, R>(&self, mesh: &'m Mesh, rng: &mut R, noise_seed: u32, noise: &NoiseParams) -> Result<HeightField<'m>>
    where
        R: RandomSource + ?Sized,
    {
        match self {
            Self::Coast => {
                let tilt = slope(mesh, random_vector(rng, 4.0));
                let bowl = cone(mesh, rng.next(-0.5, -0.5));
                let hills = mountains(mesh, 40, DEFAULT_MOUNTAIN_RADIUS, rng);
                sum(&[tilt, bowl, hills])
            }
            Self::Fjord => {
                let tilt = slope(mesh, Point::new(4.0, 0.0));
                let bowl = cone(mesh, rng.next(-1.0, -1.0));
                let params = draw_ridge_params(rng, (3.0, 7.0));
                let ridges = ridge_chain(mesh, &params, rng);
                let hills = mountains(mesh, 30, DEFAULT_MOUNTAIN_RADIUS, rng);
                sum(&[tilt, bowl, ridges, hills])
            }
            Self::Mountain => {
                let tilt = slope(mesh, random_vector(rng, 4.0));
                let peaks = mountains(mesh, 50, DEFAULT_MOUNTAIN_RADIUS, rng);
                sum(&[tilt, peaks])
            }
            Self::Island => {
                let bowl = cone(mesh, rng.next(-1.0, -1.0));
                let peak_count = rng.next(10.0, 20.0).ceil() as usize;
                let peaks = mountains(mesh, peak_count, DEFAULT_MOUNTAIN_RADIUS, rng);
                let mut layers = vec![bowl, peaks];
                let chains = rng.next(1.0, 2.0).ceil() as usize;
                for _ in 0..chains {
                    let params = draw_ridge_params(rng, (1.0, 2.0));
                    layers.push(ridge_chain(mesh, &params, rng));
                }
                sum(&layers)
            }
            Self::River => {
                let valley = slope_river(mesh, Point::new(1.0, 0.0));
                let texture = coherent_noise(mesh, noise, noise_seed);
                sum(&[valley, texture])
            }
        }
    }
}

/// Ridge count, width and length, drawn in that order.
fn draw_ridge_params<R: RandomSource + ?Sized>(rng: &mut R, count: (f64, f64)) -> RidgeParams {
    let count = rng.next(count.0, count.1).ceil() as usize;
    let width = rng.next(0.02, 0.05);
    let length = rng.next(5.0, 15.0);
    RidgeParams { count, width, length }
}

impl std::fmt::Display for TerrainPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coast => write!(f, "coast"),
            Self::Fjord => write!(f, "fjord"),
            Self::Mountain => write!(f, "mountain"),
            Self::Island => write!(f, "island"),
            Self::River => write!(f, "river"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erosion::NoErosion;
    use crate::geometry::Extent;
    use crate::mesh::generate_good_mesh;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::cell::RefCell;

    fn test_mesh(seed: u64) -> Mesh {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generate_good_mesh(600, Extent::default(), 1, &mut rng)
    }

    /// Records every call and otherwise does nothing.
    #[derive(Default)]
    struct Recorder {
        erode_calls: RefCell<Vec<(f64, usize)>>,
        fill_calls: RefCell<usize>,
    }

    impl Erosion for Recorder {
        fn erode<'m>(&self, field: &HeightField<'m>, amount: f64, iterations: usize) -> HeightField<'m> {
            self.erode_calls.borrow_mut().push((amount, iterations));
            field.clone()
        }

        fn fill_sinks<'m>(&self, field: &HeightField<'m>) -> HeightField<'m> {
            *self.fill_calls.borrow_mut() += 1;
            field.clone()
        }

        fn erosion_rate<'m>(&self, field: &HeightField<'m>) -> HeightField<'m> {
            field.map(|_| 0.0)
        }
    }

    #[test]
    fn test_presets_are_deterministic() {
        let mesh = test_mesh(1);
        for preset in TerrainPreset::all() {
            let mut a = ChaCha8Rng::seed_from_u64(77);
            let mut b = ChaCha8Rng::seed_from_u64(77);
            let options = PipelineOptions::default();
            let fa = preset.generate(&mesh, &mut a, 3, &NoErosion, &options).unwrap();
            let fb = preset.generate(&mesh, &mut b, 3, &NoErosion, &options).unwrap();
            assert_eq!(fa, fb, "{} differs between runs", preset);
            assert_eq!(fa.len(), mesh.node_count());
        }
    }

    #[test]
    fn test_erosion_hook_is_called_with_preset_amounts() {
        let mesh = test_mesh(2);
        let recorder = Recorder::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        TerrainPreset::River
            .generate(&mesh, &mut rng, 0, &recorder, &PipelineOptions::default())
            .unwrap();
        assert_eq!(*recorder.erode_calls.borrow(), vec![(0.3, 3)]);
        assert_eq!(*recorder.fill_calls.borrow(), 1);

        let recorder = Recorder::default();
        TerrainPreset::Mountain
            .generate(&mesh, &mut rng, 0, &recorder, &PipelineOptions::default())
            .unwrap();
        let (amount, iterations) = recorder.erode_calls.borrow()[0];
        assert!((0.05..=0.15).contains(&amount));
        assert_eq!(iterations, 5);
    }

    #[test]
    fn test_sea_level_override_keeps_draw_order() {
        let mesh = test_mesh(3);
        let mut a = ChaCha8Rng::seed_from_u64(8);
        let mut b = ChaCha8Rng::seed_from_u64(8);
        let overridden = PipelineOptions {
            sea_level: Some(0.7),
            ..PipelineOptions::default()
        };
        TerrainPreset::Coast
            .generate(&mesh, &mut a, 0, &NoErosion, &PipelineOptions::default())
            .unwrap();
        let field = TerrainPreset::Coast
            .generate(&mesh, &mut b, 0, &NoErosion, &overridden)
            .unwrap();
        assert_eq!(a.next(0.0, 1.0), b.next(0.0, 1.0));
        assert!((field.land_fraction() - 0.3).abs() < 0.1);
    }

    #[test]
    fn test_island_is_mostly_sea() {
        let mesh = test_mesh(4);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let field = TerrainPreset::Island
            .generate(&mesh, &mut rng, 0, &NoErosion, &PipelineOptions::default())
            .unwrap();
        let land = field.land_fraction();
        assert!(land > 0.1 && land < 0.5, "land fraction {}", land);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(TerrainPreset::all().len(), 5);
        assert_eq!(TerrainPreset::Fjord.to_string(), "fjord");
        let parsed: TerrainPreset = serde_json::from_str("\"island\"").unwrap();
        assert_eq!(parsed, TerrainPreset::Island);
    }
}
