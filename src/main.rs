use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrain_mesh::config::GeneratorConfig;
use terrain_mesh::contour::{contour, contour_interior};
use terrain_mesh::erosion::NoErosion;
use terrain_mesh::gradient::{slope_field, DownhillIndex};
use terrain_mesh::mesh::generate_good_mesh;
use terrain_mesh::presets::TerrainPreset;
use terrain_mesh::seeds::TerrainSeeds;

#[derive(Parser, Debug)]
#[command(name = "terrain_mesh")]
#[command(about = "Generate terrain height fields over a relaxed Voronoi mesh")]
struct Args {
    /// JSON configuration file (flags below override it)
    #[arg(short, long)]
    config: Option<String>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of mesh sample points
    #[arg(short = 'n', long)]
    points: Option<usize>,

    /// Map width
    #[arg(short = 'W', long)]
    width: Option<f64>,

    /// Map height
    #[arg(short = 'H', long)]
    height: Option<f64>,

    /// Terrain preset
    #[arg(short, long, value_enum)]
    preset: Option<TerrainPreset>,

    /// Lloyd relaxation passes for the mesh
    #[arg(long)]
    relax: Option<usize>,

    /// Coast cleanup iterations
    #[arg(long)]
    clean: Option<usize>,

    /// Sea-level quantile (0-1), replacing the preset's own
    #[arg(long)]
    sea_level: Option<f64>,

    /// Level at which to extract contours
    #[arg(long)]
    contour_level: Option<f64>,

    /// Skip contour edges near the map border
    #[arg(long)]
    interior: bool,

    /// Override the derived mesh point seed
    #[arg(long)]
    points_seed: Option<u64>,

    /// Override the derived terrain seed
    #[arg(long)]
    terrain_seed: Option<u64>,

    /// Override the derived noise seed
    #[arg(long)]
    noise_seed: Option<u64>,

    /// List presets and exit
    #[arg(long)]
    list_presets: bool,
}

impl Args {
    fn seeds(&self, master: u64) -> TerrainSeeds {
        let mut builder = TerrainSeeds::builder(master);
        if let Some(seed) = self.points_seed {
            builder = builder.points(seed);
        }
        if let Some(seed) = self.terrain_seed {
            builder = builder.terrain(seed);
        }
        if let Some(seed) = self.noise_seed {
            builder = builder.noise(seed);
        }
        builder.build()
    }

    fn into_config(&self) -> anyhow::Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::from_json_file(path)?,
            None => GeneratorConfig::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(points) = self.points {
            config.mesh.points = points;
        }
        if let Some(width) = self.width {
            config.mesh.extent.width = width;
        }
        if let Some(height) = self.height {
            config.mesh.extent.height = height;
        }
        if let Some(preset) = self.preset {
            config.preset = preset;
        }
        if let Some(relax) = self.relax {
            config.mesh.relax_iterations = relax;
        }
        if let Some(clean) = self.clean {
            config.clean_iterations = clean;
        }
        if self.sea_level.is_some() {
            config.sea_level = self.sea_level;
        }
        if let Some(level) = self.contour_level {
            config.contour_level = level;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list_presets {
        for preset in TerrainPreset::all() {
            println!("{:<10} {}", preset, preset.description());
        }
        return Ok(());
    }

    let config = args.into_config()?;
    let seed = config.seed.unwrap_or_else(rand::random);
    let seeds = args.seeds(seed);

    println!("Generating terrain with seed: {}", seed);
    println!("{}", seeds);
    println!("Preset: {} ({})", config.preset, config.preset.description());
    println!(
        "Mesh: {} points over {}x{}",
        config.mesh.points, config.mesh.extent.width, config.mesh.extent.height
    );

    // Build the mesh
    println!("Building mesh...");
    let mut points_rng = seeds.points_rng();
    let mesh = generate_good_mesh(
        config.mesh.points,
        config.mesh.extent,
        config.mesh.relax_iterations,
        &mut points_rng,
    );
    println!(
        "Mesh has {} nodes ({} on the boundary), {} edges",
        mesh.node_count(),
        mesh.boundary_count(),
        mesh.edges().len()
    );

    // Run the preset pipeline
    println!("Generating heights...");
    let mut terrain_rng = seeds.terrain_rng();
    let heights = config.preset.generate(
        &mesh,
        &mut terrain_rng,
        seeds.noise_seed(),
        &NoErosion,
        &config.pipeline_options(),
    )?;
    println!(
        "Height range: {:.3} to {:.3} ({:.1}% above sea level)",
        heights.min(),
        heights.max(),
        heights.land_fraction() * 100.0
    );

    // Analysis
    let slopes = slope_field(&heights);
    let downhill = DownhillIndex::compute(&heights);
    println!("Steepest slope: {:.3}, {} sinks", slopes.max(), downhill.sink_count());

    let lines = if args.interior {
        contour_interior(&heights, config.contour_level)
    } else {
        contour(&heights, config.contour_level)
    };
    let closed = lines.iter().filter(|l| l.is_closed()).count();
    let total_length: f64 = lines.iter().map(|l| l.length()).sum();
    println!(
        "Contour at {}: {} polylines ({} closed), total length {:.3}",
        config.contour_level,
        lines.len(),
        closed,
        total_length
    );

    println!("Done!");
    Ok(())
}
