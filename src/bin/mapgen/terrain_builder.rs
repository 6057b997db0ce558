use geopath::errors::{GeoPathError, GeoPathResult};
use geopath::terrain_generation::{TerrainAlgorithm, TerrainGenerator, get_terrain_preset};

/// Builds a terrain generator from a preset or algorithm name plus optional overrides
pub struct TerrainBuilder {
    terrain_type: String,
    seed: Option<u32>,
    amplitude: Option<f64>,
    frequency: Option<f64>,
    octaves: Option<u32>,
    max_step: Option<i32>,
}

impl TerrainBuilder {
    pub fn new(terrain_type: String) -> Self {
        Self {
            terrain_type,
            seed: None,
            amplitude: None,
            frequency: None,
            octaves: None,
            max_step: None,
        }
    }

    pub fn seed(mut self, seed: Option<u32>) -> Self {
        self.seed = seed;
        self
    }

    pub fn amplitude(mut self, amplitude: Option<f64>) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn frequency(mut self, frequency: Option<f64>) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn octaves(mut self, octaves: Option<u32>) -> Self {
        self.octaves = octaves;
        self
    }

    pub fn max_step(mut self, max_step: Option<i32>) -> Self {
        self.max_step = max_step;
        self
    }

    fn has_manual_parameters(&self) -> bool {
        self.amplitude.is_some() || self.frequency.is_some() || self.octaves.is_some()
    }

    pub fn build(self) -> GeoPathResult<TerrainGenerator> {
        let mut generator = match get_terrain_preset(&self.terrain_type, self.seed) {
            Some(mut generator) => {
                if self.has_manual_parameters() {
                    generator.algorithm = self.override_preset_params(generator.algorithm);
                }
                generator
            }
            None => {
                let algorithm = match self.terrain_type.as_str() {
                    "perlin" => TerrainAlgorithm::Perlin {
                        amplitude: self.amplitude.unwrap_or(160.0),
                        frequency: self.frequency.unwrap_or(0.04),
                        octaves: self.octaves.unwrap_or(4),
                    },
                    "ridged" => TerrainAlgorithm::Ridged {
                        amplitude: self.amplitude.unwrap_or(480.0),
                        frequency: self.frequency.unwrap_or(0.02),
                        octaves: self.octaves.unwrap_or(5),
                    },
                    _ => {
                        return Err(GeoPathError::InvalidMapData {
                            reason: format!(
                                "Unknown terrain type: '{}'. Available presets: flat, hills, mountains. Custom algorithms: perlin, ridged",
                                self.terrain_type
                            ),
                        });
                    }
                };
                TerrainGenerator::new(self.seed.unwrap_or_else(rand::random), algorithm)
            }
        };

        if let Some(max_step) = self.max_step {
            generator.max_step = max_step;
        }
        Ok(generator)
    }

    fn override_preset_params(&self, algorithm: TerrainAlgorithm) -> TerrainAlgorithm {
        match algorithm {
            TerrainAlgorithm::Flat { height } => {
                println!(
                    "Warning: Manual terrain parameters (amplitude, frequency, octaves) are ignored for 'flat' terrain type"
                );
                TerrainAlgorithm::Flat { height }
            }
            TerrainAlgorithm::Perlin {
                amplitude,
                frequency,
                octaves,
            } => TerrainAlgorithm::Perlin {
                amplitude: self.amplitude.unwrap_or(amplitude),
                frequency: self.frequency.unwrap_or(frequency),
                octaves: self.octaves.unwrap_or(octaves),
            },
            TerrainAlgorithm::Ridged {
                amplitude,
                frequency,
                octaves,
            } => TerrainAlgorithm::Ridged {
                amplitude: self.amplitude.unwrap_or(amplitude),
                frequency: self.frequency.unwrap_or(frequency),
                octaves: self.octaves.unwrap_or(octaves),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_builder_default() {
        let generator = TerrainBuilder::new("hills".to_string())
            .seed(Some(12345))
            .build()
            .unwrap();
        assert_eq!(generator.seed, 12345);
        assert_eq!(generator.max_step, 32);
    }

    #[test]
    fn test_terrain_builder_with_manual_params() {
        let generator = TerrainBuilder::new("hills".to_string())
            .seed(Some(12345))
            .amplitude(Some(100.0))
            .octaves(Some(6))
            .max_step(Some(8))
            .build()
            .unwrap();

        assert_eq!(generator.max_step, 8);
        match generator.algorithm {
            TerrainAlgorithm::Perlin {
                amplitude,
                frequency,
                octaves,
            } => {
                assert_eq!(amplitude, 100.0);
                // Untouched parameters keep the preset value
                assert_eq!(frequency, 0.04);
                assert_eq!(octaves, 6);
            }
            _ => panic!("Expected Perlin algorithm"),
        }
    }

    #[test]
    fn test_terrain_builder_custom_algorithm() {
        let generator = TerrainBuilder::new("ridged".to_string())
            .seed(Some(12345))
            .frequency(Some(0.05))
            .build()
            .unwrap();
        assert_eq!(generator.seed, 12345);

        match generator.algorithm {
            TerrainAlgorithm::Ridged {
                amplitude,
                frequency,
                octaves,
            } => {
                assert_eq!(amplitude, 480.0);
                assert_eq!(frequency, 0.05);
                assert_eq!(octaves, 5);
            }
            _ => panic!("Expected Ridged algorithm"),
        }
    }

    #[test]
    fn test_terrain_builder_unknown_type() {
        let builder = TerrainBuilder::new("unknown".to_string());
        assert!(builder.build().is_err());
    }
}
