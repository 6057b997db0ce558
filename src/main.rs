use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use clap::Parser;
use geopath::cli_utils::*;
use geopath::components::{NavAgent, WorldPosition};
use geopath::config::{self, BufferTierConfig, GeoPathConfig};
use geopath::errors::GeoPathResult;
use geopath::geo::{GeoEngine, HeightMapGeo};
use geopath::pathfinding::{MoverKind, PathFinder};
use geopath::plugins::GeoPathPlugin;
use geopath::terrain_generation::scatter_walls;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Clone)]
#[command(name = "geopath")]
#[command(about = "Find a walkable path between two points on a geodata map")]
struct Args {
    /// Map file written by mapgen; a flat map is generated when omitted
    #[arg(long)]
    map: Option<PathBuf>,

    /// Size of the generated map in cells (format: WIDTHxHEIGHT)
    #[arg(long, default_value = "64x64")]
    size: String,

    /// Fraction of cells turned into walls on the generated map
    #[arg(long, default_value = "0.0")]
    walls: f64,

    /// Random seed for wall placement
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Start position (format: X,Y,Z in world units, or X,Y with --cells)
    #[arg(long)]
    from: String,

    /// Target position (format: X,Y,Z in world units, or X,Y with --cells)
    #[arg(long)]
    to: String,

    /// Read --from and --to as grid cells instead of world positions
    #[arg(long)]
    cells: bool,

    /// Config file; defaults to the user config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override buffer tiers (format: SIZExCOUNT;SIZExCOUNT)
    #[arg(long)]
    buffers: Option<String>,

    /// Search as a non-playable mover (no smoothing)
    #[arg(long)]
    npc: bool,

    /// Print buffer pool and post-filter statistics
    #[arg(long)]
    stats: bool,

    /// Log search details
    #[arg(long)]
    verbose: bool,
}

fn load_geo(args: &Args) -> GeoPathResult<HeightMapGeo> {
    if let Some(path) = &args.map {
        return HeightMapGeo::load_from_file(path);
    }

    let (width, height) = parse_size(&args.size)?;
    let mut geo = HeightMapGeo::flat(width, height, 0)?;
    let density = validate_density(args.walls);
    if density > 0.0 {
        let walls = scatter_walls(&mut geo, density, args.seed)?;
        info!("Placed {walls} walls on a {width}x{height} map");
    }
    Ok(geo)
}

fn build_config(args: &Args) -> GeoPathResult<GeoPathConfig> {
    let config = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config(),
    };

    match &args.buffers {
        Some(buffers) => Ok(config.with_buffers(BufferTierConfig::parse_list(buffers)?)),
        None => Ok(config),
    }
}

fn parse_endpoint<G: GeoEngine + ?Sized>(input: &str, cells: bool, geo: &G) -> GeoPathResult<IVec3> {
    if cells {
        let cell = parse_cell(input)?;
        Ok(IVec3::new(geo.world_x(cell.x), geo.world_y(cell.y), 0))
    } else {
        parse_position(input)
    }
}

fn main() -> GeoPathResult<()> {
    let args = Args::parse();

    let mut app = App::new();
    app.add_plugins(LogPlugin {
        level: if args.verbose { Level::DEBUG } else { Level::INFO },
        ..default()
    });

    let geo = Arc::new(load_geo(&args)?);
    let config = build_config(&args)?;
    info!("Buffer tiers: {}", config.buffers_display());

    let start = parse_endpoint(&args.from, args.cells, geo.as_ref())?;
    let target = parse_endpoint(&args.to, args.cells, geo.as_ref())?;
    let mover = if args.npc {
        MoverKind::Npc
    } else {
        MoverKind::Playable
    };

    let finder = PathFinder::new(Arc::clone(&geo), config)?;
    app.add_plugins(GeoPathPlugin::new(finder.clone()));

    let mut agent = NavAgent::new(mover);
    agent.go_to(target);
    let entity = app.world_mut().spawn((agent, WorldPosition(start))).id();
    app.update();

    let waypoints = app
        .world()
        .get::<NavAgent>(entity)
        .map(|agent| agent.waypoints().to_vec())
        .unwrap_or_default();

    if waypoints.is_empty() {
        println!("No path from {start} to {target}");
    } else {
        println!("Path from {start} to {target} ({mover}):");
        for (i, waypoint) in waypoints.iter().enumerate() {
            println!(
                "  {:>3}: cell {} world {}",
                i + 1,
                waypoint,
                waypoint.to_world(geo.as_ref())
            );
        }
    }

    if args.stats {
        println!();
        for line in finder.report() {
            println!("{line}");
        }
    }

    Ok(())
}
