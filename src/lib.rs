//! Voronoi terrain library
//!
//! Builds a relaxed Voronoi mesh, composes height fields over it, and
//! extracts gradients, downhill pointers, contours and cleaned coastlines.
//! Re-exports modules for use by binaries and tools.

pub mod coastline;
pub mod config;
pub mod contour;
pub mod erosion;
pub mod error;
pub mod geometry;
pub mod gradient;
pub mod heightfield;
pub mod heightmap;
pub mod mesh;
pub mod presets;
pub mod random;
pub mod seeds;
pub mod voronoi;

pub use coastline::{clean_coast, coast_anomalies};
pub use config::{GeneratorConfig, MeshParams};
pub use contour::{contour, relax_path, stitch, Polyline};
pub use erosion::{Erosion, NoErosion};
pub use error::{Result, TerrainError};
pub use geometry::{Extent, Point};
pub use gradient::{slope_field, steepness, trislope, Downhill, DownhillIndex};
pub use heightfield::HeightField;
pub use mesh::{generate_good_mesh, Mesh};
pub use presets::{PipelineOptions, TerrainPreset};
pub use random::RandomSource;
pub use seeds::TerrainSeeds;
