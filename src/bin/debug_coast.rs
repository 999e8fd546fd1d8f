//! Debug tool: how many coastal anomalies survive each cleanup round.
//!
//! Runs a preset with cleanup disabled, then applies 0..=N cleanup
//! iterations and reports the anomaly count and land fraction after each.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrain_mesh::coastline::{clean_coast, coast_anomalies};
use terrain_mesh::erosion::NoErosion;
use terrain_mesh::geometry::Extent;
use terrain_mesh::mesh::{generate_good_mesh, DEFAULT_RELAX_ITERATIONS};
use terrain_mesh::presets::{PipelineOptions, TerrainPreset};
use terrain_mesh::seeds::TerrainSeeds;

#[derive(Parser, Debug)]
#[command(name = "debug_coast")]
#[command(about = "Report coastal anomalies per cleanup iteration")]
struct Args {
    #[arg(short, long, default_value = "42")]
    seed: u64,

    #[arg(short = 'n', long, default_value = "4096")]
    points: usize,

    #[arg(short, long, value_enum, default_value = "coast")]
    preset: TerrainPreset,

    /// Highest cleanup iteration count to try
    #[arg(short, long, default_value = "5")]
    iterations: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let seeds = TerrainSeeds::from_master(args.seed);
    println!("{}", seeds);

    let mesh = generate_good_mesh(
        args.points,
        Extent::default(),
        DEFAULT_RELAX_ITERATIONS,
        &mut seeds.points_rng(),
    );

    let options = PipelineOptions {
        clean_iterations: 0,
        ..PipelineOptions::default()
    };
    let raw = args
        .preset
        .generate(&mesh, &mut seeds.terrain_rng(), seeds.noise_seed(), &NoErosion, &options)?;

    println!("{:>10} {:>10} {:>8}", "iterations", "anomalies", "land %");
    for iterations in 0..=args.iterations {
        let cleaned = clean_coast(&raw, iterations);
        println!(
            "{:>10} {:>10} {:>7.2}%",
            iterations,
            coast_anomalies(&cleaned),
            cleaned.land_fraction() * 100.0
        );
    }
    Ok(())
}
