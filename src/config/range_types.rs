use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A search edge weight constrained to [0.01, 100.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct EdgeWeight(f32);

impl EdgeWeight {
    const MIN: f32 = 0.01;
    const MAX: f32 = 100.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl From<f32> for EdgeWeight {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<EdgeWeight> for f32 {
    fn from(weight: EdgeWeight) -> Self {
        weight.0
    }
}

impl Default for EdgeWeight {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Number of post-filter passes constrained to [0, 16]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct PassCount(u32);

impl PassCount {
    const MAX: u32 = 16;

    pub fn new(value: u32) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for PassCount {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<PassCount> for u32 {
    fn from(count: PassCount) -> Self {
        count.0
    }
}

impl Default for PassCount {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_weight_clamping() {
        assert_eq!(EdgeWeight::new(0.0).get(), 0.01);
        assert_eq!(EdgeWeight::new(0.707).get(), 0.707);
        assert_eq!(EdgeWeight::new(1000.0).get(), 100.0);
    }

    #[test]
    fn test_pass_count_clamping() {
        assert_eq!(PassCount::new(0).get(), 0);
        assert_eq!(PassCount::new(3).get(), 3);
        assert_eq!(PassCount::new(99).get(), 16);
    }

    #[test]
    fn test_deserialization_clamps() {
        #[derive(Deserialize)]
        struct Holder {
            weight: EdgeWeight,
            passes: PassCount,
        }

        let holder: Holder = toml::from_str("weight = -4.0\npasses = 40").unwrap();
        assert_eq!(holder.weight.get(), 0.01);
        assert_eq!(holder.passes.get(), 16);
    }
}
