use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoPathError {
    // Config-related errors
    #[error("Failed to get config directory")]
    ConfigDirNotFound,

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize config: {0}")]
    SerializationFailed(#[from] toml::ser::Error),

    #[error("Failed to deserialize config: {0}")]
    DeserializationFailed(#[from] toml::de::Error),

    #[error("Config file not found at path: {path}")]
    ConfigFileNotFound { path: PathBuf },

    #[error("Invalid buffer configuration: {reason}")]
    InvalidBufferConfig { reason: String },

    // Map-related errors
    #[error("Invalid map data: {reason}")]
    InvalidMapData { reason: String },

    #[error("Map file not found at path: {path}")]
    MapFileNotFound { path: PathBuf },

    #[error("Corrupted map file: {reason}")]
    CorruptedMapFile { reason: String },

    // Search-related errors
    #[error("Corrupted search state: {reason}")]
    CorruptedSearch { reason: String },
}

/// Result type alias for all fallible operations
pub type GeoPathResult<T> = Result<T, GeoPathError>;
