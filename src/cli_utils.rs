//! Argument parsing shared by the command line tools

use crate::errors::{GeoPathError, GeoPathResult};
use bevy::prelude::*;
use std::str::FromStr;

/// Largest map edge the tools accept, in cells
pub const MAX_MAP_EDGE: u32 = 4096;

/// Generic parser for delimited strings that return fixed-size arrays
pub fn parse_delimited<T, const N: usize>(
    input: &str,
    delimiter: char,
    type_name: &str,
) -> GeoPathResult<[T; N]>
where
    T: Copy + Default + FromStr,
{
    let parts: Vec<&str> = input.split(delimiter).collect();
    if parts.len() != N {
        return Err(GeoPathError::InvalidMapData {
            reason: format!(
                "Invalid {type_name} format '{input}'. Expected {N} {delimiter}-separated values"
            ),
        });
    }

    let mut result = [T::default(); N];
    for (i, part) in parts.iter().enumerate() {
        result[i] = part.trim().parse().map_err(|_| GeoPathError::InvalidMapData {
            reason: format!("Invalid {type_name} value: '{part}'"),
        })?;
    }

    Ok(result)
}

/// Parse size string "WIDTHxHEIGHT" with validation
pub fn parse_size(size_str: &str) -> GeoPathResult<(u32, u32)> {
    let [width, height] = parse_delimited::<u32, 2>(size_str, 'x', "size")?;

    if width == 0 || height == 0 {
        return Err(GeoPathError::InvalidMapData {
            reason: "Width and height must be greater than 0".to_string(),
        });
    }

    if width > MAX_MAP_EDGE || height > MAX_MAP_EDGE {
        return Err(GeoPathError::InvalidMapData {
            reason: format!("Width and height must not exceed {MAX_MAP_EDGE}"),
        });
    }

    Ok((width, height))
}

/// Parse world position string "X,Y,Z"
pub fn parse_position(pos_str: &str) -> GeoPathResult<IVec3> {
    let [x, y, z] = parse_delimited::<i32, 3>(pos_str, ',', "position")?;
    Ok(IVec3::new(x, y, z))
}

/// Parse grid cell string "X,Y"
pub fn parse_cell(cell_str: &str) -> GeoPathResult<IVec2> {
    let [x, y] = parse_delimited::<i32, 2>(cell_str, ',', "cell")?;
    Ok(IVec2::new(x, y))
}

/// Validate wall density and clamp to valid range
pub fn validate_density(density: f64) -> f64 {
    if !(0.0..=1.0).contains(&density) {
        warn!("Wall density {density} is out of range [0.0, 1.0], clamping to valid range");
        density.clamp(0.0, 1.0)
    } else {
        density
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64x64").unwrap(), (64, 64));
        assert_eq!(parse_size("128x256").unwrap(), (128, 256));
        assert_eq!(parse_size("1x1").unwrap(), (1, 1));

        assert!(parse_size("64").is_err());
        assert!(parse_size("0x64").is_err());
        assert!(parse_size("5000x64").is_err());
        assert!(parse_size("12.5x64").is_err());
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("0,16,-8").unwrap(), IVec3::new(0, 16, -8));
        assert_eq!(parse_position(" 40, 72, 0").unwrap(), IVec3::new(40, 72, 0));

        assert!(parse_position("0,1").is_err());
        assert!(parse_position("abc,def,ghi").is_err());
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("3,9").unwrap(), IVec2::new(3, 9));
        assert!(parse_cell("3;9").is_err());
        assert!(parse_cell("3,9,1").is_err());
    }

    #[test]
    fn test_validate_density() {
        assert_eq!(validate_density(0.5), 0.5);
        assert_eq!(validate_density(-0.1), 0.0);
        assert_eq!(validate_density(1.5), 1.0);
    }
}
