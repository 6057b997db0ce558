use crate::config::range_types::{EdgeWeight, PassCount};
use crate::errors::{GeoPathError, GeoPathResult};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// One pool tier: buffers of `size × size` nodes, at most `count` of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, Validate)]
#[display("{size}x{count}")]
pub struct BufferTierConfig {
    #[validate(range(min = 1, max = 4096))]
    pub size: usize,
    #[validate(range(min = 1, max = 1024))]
    pub count: usize,
}

impl BufferTierConfig {
    pub fn new(size: usize, count: usize) -> Self {
        Self { size, count }
    }

    /// Parse a tier list like `100x6;128x6;192x6`
    pub fn parse_list(input: &str) -> GeoPathResult<Vec<Self>> {
        input
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for BufferTierConfig {
    type Err = GeoPathError;

    /// Parse `SIZExCOUNT`
    fn from_str(input: &str) -> GeoPathResult<Self> {
        let parts: Vec<&str> = input.trim().split('x').collect();
        let [size, count] = parts.as_slice() else {
            return Err(GeoPathError::InvalidBufferConfig {
                reason: format!("Invalid buffer tier '{input}'. Expected SIZExCOUNT"),
            });
        };

        let parse = |value: &str, what: &str| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| GeoPathError::InvalidBufferConfig {
                    reason: format!("Invalid buffer {what} '{value}' in tier '{input}'"),
                })
        };

        let tier = Self::new(parse(size, "size")?, parse(count, "count")?);
        tier.validate()
            .map_err(|e| GeoPathError::InvalidBufferConfig {
                reason: format!("Buffer tier '{input}' out of range: {e}"),
            })?;
        Ok(tier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
// NOTE: When adding new fields, update the config.toml example in the project root
pub struct GeoPathConfig {
    /// Buffer pool tiers; any order, sorted by size when the pool is built
    #[validate(length(min = 1), nested)]
    pub buffers: Vec<BufferTierConfig>,

    // Edge weights
    pub low_weight: EdgeWeight,
    pub medium_weight: EdgeWeight,
    pub high_weight: EdgeWeight,
    pub diagonal_weight: EdgeWeight,

    /// Expand diagonal neighbours (with the corner rule)
    pub advanced_diagonal_strategy: bool,

    /// Smoothing passes for playable movers; 0 disables smoothing
    pub max_postfilter_passes: PassCount,
}

impl Default for GeoPathConfig {
    fn default() -> Self {
        Self {
            buffers: vec![
                BufferTierConfig::new(100, 6),
                BufferTierConfig::new(128, 6),
                BufferTierConfig::new(192, 6),
                BufferTierConfig::new(256, 4),
                BufferTierConfig::new(320, 4),
                BufferTierConfig::new(384, 4),
                BufferTierConfig::new(500, 2),
            ],

            low_weight: EdgeWeight::new(0.5),
            medium_weight: EdgeWeight::new(2.0),
            high_weight: EdgeWeight::new(3.0),
            diagonal_weight: EdgeWeight::new(0.707),

            advanced_diagonal_strategy: true,
            max_postfilter_passes: PassCount::new(3),
        }
    }
}

impl GeoPathConfig {
    /// Check the settings a pool cannot work without
    pub fn check(&self) -> GeoPathResult<()> {
        self.validate().map_err(|e| GeoPathError::InvalidBufferConfig {
            reason: e.to_string(),
        })
    }

    /// Same config with the buffer tiers replaced
    pub fn with_buffers(mut self, buffers: Vec<BufferTierConfig>) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn buffers_display(&self) -> String {
        self.buffers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}
