//! Locating and layering config files.
//!
//! Layers, lowest precedence first: `config.toml` in the user config
//! directory, then `tempo.toml` in the project directory. An explicit file
//! replaces discovery entirely.

use std::io;
use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, TempoConfig};

/// File name inside the user config directory.
pub const USER_FILE: &str = "config.toml";

/// File name of the project-local layer.
pub const PROJECT_FILE: &str = "tempo.toml";

/// Overrides the user config directory when set and non-empty.
pub const CONFIG_DIR_ENV: &str = "TEMPO_CONFIG_DIR";

/// Which layer a file was considered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    User,
    Project,
    Explicit,
}

/// One file that was considered while loading.
#[derive(Debug, Clone)]
pub struct Layer {
    pub kind: LayerKind,
    pub path: PathBuf,
    /// False when the file was absent or failed to load.
    pub loaded: bool,
}

/// The merged configuration and a report of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TempoConfig,
    /// Considered layers, lowest precedence first.
    pub layers: Vec<Layer>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the layers that contributed.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.layers
            .iter()
            .filter_map(|layer| layer.loaded.then_some(layer.path.as_path()))
            .collect()
    }

    /// The lowest loaded layer, which is where `config init` would write.
    pub fn primary(&self) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.loaded)
    }

    /// Out-of-range values never abort startup; the whole config falls
    /// back to defaults with a warning.
    fn checked(mut self) -> Self {
        if let Err(e) = self.config.validate() {
            self.warnings
                .push(format!("Invalid configuration, using defaults: {e}"));
            self.config = TempoConfig::new();
        }
        self
    }
}

/// Where to look for config layers.
#[derive(Debug, Clone)]
pub struct Discovery {
    user_dir: Option<PathBuf>,
    project_dir: PathBuf,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    /// The user config directory and the current directory.
    pub fn new() -> Self {
        Self {
            user_dir: config_dir(),
            project_dir: PathBuf::from("."),
        }
    }

    pub fn with_user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    /// Merge every layer that exists. Unreadable layers become warnings.
    pub fn load(&self) -> LoadedConfig {
        let mut loaded = LoadedConfig {
            config: TempoConfig::new(),
            layers: Vec::new(),
            warnings: Vec::new(),
        };

        let candidates = self
            .user_dir
            .as_ref()
            .map(|dir| (LayerKind::User, dir.join(USER_FILE)))
            .into_iter()
            .chain([(LayerKind::Project, self.project_dir.join(PROJECT_FILE))]);

        for (kind, path) in candidates {
            let mut layer = Layer {
                kind,
                path,
                loaded: false,
            };
            if layer.path.is_file() {
                match read_config(&layer.path) {
                    Ok(config) => {
                        loaded.config.merge(config);
                        layer.loaded = true;
                    }
                    Err(e) => loaded
                        .warnings
                        .push(format!("Failed to load {}: {e}", layer.path.display())),
                }
            }
            loaded.layers.push(layer);
        }

        loaded.checked()
    }
}

/// Discover layers from the user config directory and `project_dir`
/// (the current directory when `None`).
pub fn load_config(project_dir: Option<&Path>) -> LoadedConfig {
    let discovery = Discovery::new();
    match project_dir {
        Some(dir) => discovery.with_project_dir(dir).load(),
        None => discovery.load(),
    }
}

/// Load a single file named on the command line.
///
/// Unlike discovered layers, a missing or unparseable file is an error.
pub fn load_explicit(path: &Path) -> Result<LoadedConfig> {
    let config = read_config(path)?;
    let loaded = LoadedConfig {
        config,
        layers: vec![Layer {
            kind: LayerKind::Explicit,
            path: path.to_path_buf(),
            loaded: true,
        }],
        warnings: Vec::new(),
    };
    Ok(loaded.checked())
}

/// Parse one config file.
pub fn read_config(path: &Path) -> Result<TempoConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    TempoConfig::from_toml(&contents)
}

/// Write `config` as TOML, creating missing parent directories.
pub fn write_config(config: &TempoConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_error(path, e))
}

/// The user config directory: `$TEMPO_CONFIG_DIR`, else `<platform config dir>/tempo`.
pub fn config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|base| base.join("tempo")),
    }
}

/// The user config file inside [`config_dir`].
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(USER_FILE))
}

fn read_error(path: &Path, source: io::Error) -> ConfigError {
    ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    }
}

fn write_error(path: &Path, source: io::Error) -> ConfigError {
    ConfigError::WriteFile {
        path: path.display().to_string(),
        source,
    }
}
