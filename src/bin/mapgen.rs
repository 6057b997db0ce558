use clap::Parser;
use geopath::cli_utils::*;
use geopath::errors::{GeoPathError, GeoPathResult};
use geopath::geo::HeightMapGeo;
use geopath::terrain_generation::{open_cells, scatter_walls};
use std::path::PathBuf;

mod mapgen {
    pub mod terrain_builder;
}

use mapgen::terrain_builder::TerrainBuilder;

#[derive(Parser, Clone)]
#[command(name = "mapgen")]
#[command(about = "Generate heightmap geodata files for geopath")]
struct Args {
    /// Map size in grid cells (format: WIDTHxHEIGHT)
    #[arg(long, default_value = "128x128")]
    size: String,

    /// Output map file
    #[arg(long, default_value = "map.bin")]
    output: PathBuf,

    /// Terrain type preset (flat, hills, mountains) or algorithm (perlin, ridged)
    #[arg(long, default_value = "flat")]
    terrain_type: String,

    /// Random seed for reproducible terrain
    #[arg(long)]
    seed: Option<u32>,

    /// Terrain amplitude in geodata height units
    #[arg(long)]
    amplitude: Option<f64>,

    /// Base frequency for noise (terrain feature density)
    #[arg(long)]
    frequency: Option<f64>,

    /// Number of noise octaves for detail
    #[arg(long)]
    octaves: Option<u32>,

    /// Largest height difference between walkable neighbours
    #[arg(long)]
    max_step: Option<i32>,

    /// Fraction of cells turned into walls (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    walls: f64,

    /// Seed for wall placement
    #[arg(long, default_value = "1")]
    wall_seed: u64,
}

fn generate(args: &Args) -> GeoPathResult<HeightMapGeo> {
    let (width, height) = parse_size(&args.size)?;

    let generator = TerrainBuilder::new(args.terrain_type.clone())
        .seed(args.seed)
        .amplitude(args.amplitude)
        .frequency(args.frequency)
        .octaves(args.octaves)
        .max_step(args.max_step)
        .build()?;

    println!("Generating {width}x{height} map (seed: {})", generator.seed);
    let mut geo = generator.generate(width, height)?;

    let density = validate_density(args.walls);
    if density > 0.0 {
        let walls = scatter_walls(&mut geo, density, args.wall_seed)?;
        println!("Placed {walls} walls");
    }

    Ok(geo)
}

fn main() -> GeoPathResult<()> {
    let args = Args::parse();

    if args.output.is_dir() {
        return Err(GeoPathError::InvalidMapData {
            reason: format!("Output path {} is a directory", args.output.display()),
        });
    }

    let geo = generate(&args)?;
    geo.save_to_file(&args.output)?;

    print_map_summary(&geo, &args.output);
    Ok(())
}

fn print_map_summary(geo: &HeightMapGeo, output: &std::path::Path) {
    let total = geo.width as usize * geo.height as usize;
    let open = open_cells(geo).len();
    let (low, high) = (0..geo.height as i32)
        .flat_map(|y| (0..geo.width as i32).map(move |x| (x, y)))
        .filter_map(|(x, y)| geo.cell_height(x, y))
        .fold((i32::MAX, i32::MIN), |(low, high), z| (low.min(z), high.max(z)));

    println!("Map saved successfully to: {}", output.display());
    println!("\nMap summary:");
    println!("  Cells: {}x{} ({total} total)", geo.width, geo.height);
    println!("  Heights: {low} to {high}, max step {}", geo.max_step);
    println!("  Walls: {}", geo.blocked_count());
    println!("  Cells with a way out: {open}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(terrain_type: &str) -> Args {
        Args {
            size: "32x24".to_string(),
            output: std::env::temp_dir().join("geopath_mapgen_test.bin"),
            terrain_type: terrain_type.to_string(),
            seed: Some(12345),
            amplitude: None,
            frequency: None,
            octaves: None,
            max_step: None,
            walls: 0.1,
            wall_seed: 7,
        }
    }

    #[test]
    fn test_main_integration() {
        let args = args("hills");
        let geo = generate(&args).unwrap();
        assert_eq!((geo.width, geo.height), (32, 24));
        assert!(geo.blocked_count() > 0);

        geo.save_to_file(&args.output).unwrap();
        let loaded = HeightMapGeo::load_from_file(&args.output).unwrap();
        std::fs::remove_file(&args.output).ok();
        assert_eq!(loaded.blocked_count(), geo.blocked_count());
    }

    #[test]
    fn test_unknown_terrain_type_fails() {
        assert!(generate(&args("swamp")).is_err());
    }
}
