use crate::errors::{GeoPathError, GeoPathResult};
use crate::geo::HeightMapGeo;
use crate::geo::heightmap::DEFAULT_MAX_STEP;
use bevy::prelude::*;
use noise::{MultiFractal, NoiseFn, Perlin, RidgedMulti};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Terrain generation algorithms; heights are in geodata units
#[derive(Debug, Clone)]
pub enum TerrainAlgorithm {
    Flat {
        height: i32,
    },
    Perlin {
        amplitude: f64,
        frequency: f64,
        octaves: u32,
    },
    Ridged {
        amplitude: f64,
        frequency: f64,
        octaves: u32,
    },
}

/// Seeded heightmap generator
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    pub seed: u32,
    pub algorithm: TerrainAlgorithm,
    pub max_step: i32,
}

impl TerrainGenerator {
    pub fn new(seed: u32, algorithm: TerrainAlgorithm) -> Self {
        Self {
            seed,
            algorithm,
            max_step: DEFAULT_MAX_STEP,
        }
    }

    /// Generate a `width × height` cell heightmap anchored at the world origin
    pub fn generate(&self, width: u32, height: u32) -> GeoPathResult<HeightMapGeo> {
        let total_cells = width as usize * height as usize;
        let mut heights = Vec::with_capacity(total_cells);

        match &self.algorithm {
            TerrainAlgorithm::Flat { height: z } => {
                heights.resize(total_cells, *z);
            }
            TerrainAlgorithm::Perlin {
                amplitude,
                frequency,
                octaves,
            } => {
                let perlin = Perlin::new(self.seed);

                for y in 0..height {
                    for x in 0..width {
                        let mut value = 0.0;
                        let mut current_amplitude = *amplitude;
                        let mut current_frequency = *frequency;

                        for _ in 0..*octaves {
                            value += perlin.get([
                                f64::from(x) * current_frequency,
                                f64::from(y) * current_frequency,
                            ]) * current_amplitude;
                            current_amplitude *= 0.5; // Persistence
                            current_frequency *= 2.0; // Lacunarity
                        }

                        heights.push(value.round() as i32);
                    }
                }
            }
            TerrainAlgorithm::Ridged {
                amplitude,
                frequency,
                octaves,
            } => {
                let ridged = RidgedMulti::<Perlin>::new(self.seed)
                    .set_octaves(*octaves as usize)
                    .set_frequency(*frequency);

                for y in 0..height {
                    for x in 0..width {
                        let value = ridged.get([f64::from(x), f64::from(y)]) * amplitude;
                        heights.push(value.round() as i32);
                    }
                }
            }
        }

        HeightMapGeo::new(width, height, IVec2::ZERO, heights, self.max_step)
    }
}

/// Get a predefined terrain preset
pub fn get_terrain_preset(name: &str, seed: Option<u32>) -> Option<TerrainGenerator> {
    let seed = seed.unwrap_or_else(rand::random);

    match name {
        "flat" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::Flat { height: 0 },
        )),
        "hills" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::Perlin {
                amplitude: 160.0,
                frequency: 0.04,
                octaves: 4,
            },
        )),
        "mountains" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::Ridged {
                amplitude: 480.0,
                frequency: 0.02,
                octaves: 5,
            },
        )),
        _ => None,
    }
}

/// Block roughly `density` of the cells at random; returns how many were blocked
pub fn scatter_walls(geo: &mut HeightMapGeo, density: f64, seed: u64) -> GeoPathResult<usize> {
    if !(0.0..=1.0).contains(&density) {
        return Err(GeoPathError::InvalidMapData {
            reason: format!("Wall density {density} must be between 0.0 and 1.0"),
        });
    }

    let mut rng = Pcg64::seed_from_u64(seed);
    let mut walls = Vec::new();
    for y in 0..geo.height as i32 {
        for x in 0..geo.width as i32 {
            if rng.gen_bool(density) {
                walls.push(IVec2::new(x, y));
            }
        }
    }

    let count = walls.len();
    geo.block_cells(walls);
    Ok(count)
}

/// Cells that have at least one way out
pub fn open_cells(geo: &HeightMapGeo) -> Vec<IVec2> {
    (0..geo.height as i32)
        .flat_map(|y| (0..geo.width as i32).map(move |x| IVec2::new(x, y)))
        .filter(|cell| {
            geo.cell_flags(cell.x, cell.y)
                .is_some_and(|flags| !flags.can_go_none())
        })
        .collect()
}
