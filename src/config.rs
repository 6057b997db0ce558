use crate::errors::{GeoPathError, GeoPathResult};
use std::fs;
use std::path::{Path, PathBuf};

pub mod range_types;
pub mod settings;

pub use range_types::*;
pub use settings::*;

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().and_then(|mut path| {
        path.push("geopath");
        fs::create_dir_all(&path).ok()?;
        path.push("config.toml");
        Some(path)
    })
}

/// Load the user config, falling back to defaults when it is missing or unreadable
pub fn load_config() -> GeoPathConfig {
    if let Some(config_path) = get_config_path() {
        if let Ok(contents) = fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<GeoPathConfig>(&contents) {
                return config;
            }
        }
    }
    GeoPathConfig::default()
}

/// Load a config file that must exist and parse
pub fn load_config_from<P: AsRef<Path>>(path: P) -> GeoPathResult<GeoPathConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(GeoPathError::ConfigFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = fs::read_to_string(path)?;
    let config: GeoPathConfig = toml::from_str(&contents)?;
    config.check()?;
    Ok(config)
}

pub fn save_config(config: &GeoPathConfig) -> GeoPathResult<()> {
    let config_path = get_config_path().ok_or(GeoPathError::ConfigDirNotFound)?;
    save_config_to(config, config_path)
}

pub fn save_config_to<P: AsRef<Path>>(config: &GeoPathConfig, path: P) -> GeoPathResult<()> {
    let contents = toml::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("geopath_{name}_{}.toml", std::process::id()))
    }

    #[test]
    fn test_save_and_load_config() {
        let path = temp_config_path("roundtrip");
        let config = GeoPathConfig {
            advanced_diagonal_strategy: false,
            ..GeoPathConfig::default()
        }
        .with_buffers(vec![BufferTierConfig::new(64, 2)]);

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_config() {
        let result = load_config_from("/no/such/geopath/config.toml");
        assert!(matches!(result, Err(GeoPathError::ConfigFileNotFound { .. })));
    }

    #[test]
    fn test_load_malformed_config() {
        let path = temp_config_path("malformed");
        fs::write(&path, "buffers = \"not a list\"").unwrap();
        let result = load_config_from(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(GeoPathError::DeserializationFailed(_))));
    }

    #[test]
    fn test_load_config_with_empty_tiers_fails_loudly() {
        let path = temp_config_path("empty_tiers");
        fs::write(&path, "buffers = []").unwrap();
        let result = load_config_from(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(GeoPathError::InvalidBufferConfig { .. })));
    }
}
