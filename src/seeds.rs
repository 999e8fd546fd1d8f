//! Seed management for terrain generation
//!
//! Provides separate seeds for each generation stage, so the mesh can be kept
//! fixed while the terrain or noise is varied (or the other way around).

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeds for all terrain generation stages.
///
/// Each stage gets its own seed, derived from a master seed by default.
/// Individual seeds can be overridden for experimentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Sample point placement (mesh shape)
    pub points: u64,
    /// Generator pipeline draws (slopes, mountains, ridges, sea level)
    pub terrain: u64,
    /// Coherent noise permutation tables
    pub noise: u64,
}

impl TerrainSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            points: derive_seed(master, "points"),
            terrain: derive_seed(master, "terrain"),
            noise: derive_seed(master, "noise"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> TerrainSeedsBuilder {
        TerrainSeedsBuilder::new(master)
    }

    /// Random stream for point placement.
    pub fn points_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.points)
    }

    /// Random stream for the generator pipeline.
    pub fn terrain_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.terrain)
    }

    /// Seed for `noise` crate generators, which take 32-bit seeds.
    pub fn noise_seed(&self) -> u32 {
        (self.noise ^ (self.noise >> 32)) as u32
    }
}

/// Builder for customizing individual seeds while deriving others from master
pub struct TerrainSeedsBuilder {
    seeds: TerrainSeeds,
}

impl TerrainSeedsBuilder {
    pub fn new(master: u64) -> Self {
        Self {
            seeds: TerrainSeeds::from_master(master),
        }
    }

    /// Override the point placement seed
    pub fn points(mut self, seed: u64) -> Self {
        self.seeds.points = seed;
        self
    }

    /// Override the terrain pipeline seed
    pub fn terrain(mut self, seed: u64) -> Self {
        self.seeds.terrain = seed;
        self
    }

    /// Override the noise seed
    pub fn noise(mut self, seed: u64) -> Self {
        self.seeds.noise = seed;
        self
    }

    pub fn build(self) -> TerrainSeeds {
        self.seeds
    }
}

/// Derive a sub-seed from a master seed and a stage name.
///
/// FNV-1a over the name, mixed with the master through splitmix64. Stable
/// across toolchains, unlike `DefaultHasher`.
fn derive_seed(master: u64, stage: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in stage.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    splitmix64(master ^ hash)
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl std::fmt::Display for TerrainSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TerrainSeeds {{ master: {}, points: {}, terrain: {}, noise: {} }}",
            self.master, self.points, self.terrain, self.noise,
        )
    }
}
