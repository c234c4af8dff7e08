//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A lower bound exceeds its upper bound.
    #[error("invalid range in [{section}]: {field} min {min} is greater than max {max}")]
    InvalidRange {
        section: &'static str,
        field: &'static str,
        min: u64,
        max: u64,
    },

    /// A value is below its minimum.
    #[error("'{field}' in [{section}] must be at least {min}")]
    TooSmall {
        section: &'static str,
        field: &'static str,
        min: u64,
    },

    /// A value that must be positive is zero.
    #[error("'{field}' in [{section}] must be greater than zero")]
    Zero {
        section: &'static str,
        field: &'static str,
    },
}
