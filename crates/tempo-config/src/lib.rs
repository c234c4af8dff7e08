//! Configuration for the Tempo pacing engine.
//!
//! Provides TOML-based configuration with:
//! - Reveal pacing rate and frame cadence (`[pacer]`)
//! - Simulated feed chunking and delays (`[feed]`)
//! - Phase durations and the keyword classifier tables (`[sequencer]`, `[classifier]`)
//! - Scroll-follow threshold and store limits (`[scroll]`, `[store]`)
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    Discovery, Layer, LayerKind, LoadedConfig, config_dir, load_config, load_explicit,
    read_config, user_config_path, write_config,
};
pub use error::{ConfigError, Result};
pub use types::*;
