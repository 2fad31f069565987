use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::consts::{
    DEFAULT_ARTIFACT_DIR, DEFAULT_LOG_CANDIDATES, DEFAULT_RECORDED_ROOTS, DEFAULT_VOLUMES,
};
use crate::core::VolumeTag;
use crate::error::AppError;
use crate::source::{DEFAULT_MARKER_PATTERNS, MarkerPattern};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfigSortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct VolumeConfig {
    pub(crate) root: PathBuf,
    pub(crate) id: u32,
}

impl VolumeConfig {
    /// Parse a `ROOT=ID` command line override
    pub(crate) fn parse_override(input: &str) -> Result<Self, AppError> {
        let invalid = || AppError::InvalidVolume {
            input: input.to_string(),
        };
        let (root, id) = input.rsplit_once('=').ok_or_else(invalid)?;
        let root = root.trim();
        if root.is_empty() {
            return Err(invalid());
        }
        let id = id.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self {
            root: PathBuf::from(root),
            id,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) volumes: Vec<VolumeConfig>,
    pub(crate) log_candidates: Vec<PathBuf>,
    pub(crate) marker_patterns: Vec<MarkerPattern>,
    pub(crate) artifact_dir: PathBuf,
    pub(crate) recorded_roots: Vec<String>,
    pub(crate) order: Option<ConfigSortOrder>,
    pub(crate) no_color: bool,
    pub(crate) debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            volumes: DEFAULT_VOLUMES
                .iter()
                .map(|(root, id)| VolumeConfig {
                    root: PathBuf::from(root),
                    id: *id,
                })
                .collect(),
            log_candidates: DEFAULT_LOG_CANDIDATES.iter().map(PathBuf::from).collect(),
            marker_patterns: DEFAULT_MARKER_PATTERNS.to_vec(),
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            recorded_roots: DEFAULT_RECORDED_ROOTS.iter().map(|s| s.to_string()).collect(),
            order: None,
            no_color: false,
            debug: false,
        }
    }
}

impl Config {
    /// Load the config named on the command line, or the first usable file
    /// from the standard locations. Returns the path it came from, if any.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), AppError> {
        if let Some(path) = explicit {
            let content = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
            let config = Self::parse(&content).map_err(|message| AppError::ConfigParse {
                path: path.to_path_buf(),
                message,
            })?;
            return Ok((config, Some(path.to_path_buf())));
        }

        for path in Self::get_config_paths() {
            if path.exists()
                && let Ok(content) = fs::read_to_string(&path)
            {
                match Self::parse(&content) {
                    Ok(config) => return Ok((config, Some(path))),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok((Self::default(), None))
    }

    fn parse(content: &str) -> Result<Self, String> {
        let mut config = toml::from_str::<Config>(content).map_err(|e| e.to_string())?;
        // Empty lists mean the defaults.
        if config.log_candidates.is_empty() {
            config.log_candidates = Config::default().log_candidates;
        }
        if config.marker_patterns.is_empty() {
            config.marker_patterns = DEFAULT_MARKER_PATTERNS.to_vec();
        }
        Ok(config)
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/flightlog/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("flightlog").join("config.toml"));
        }

        // 2. Platform config dir (Application Support, %APPDATA%)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("flightlog").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        // 3. Home directory: ~/.flightlog.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".flightlog.toml"));
        }

        paths
    }

    pub(crate) fn volume_tags(&self) -> Vec<VolumeTag> {
        self.volumes
            .iter()
            .map(|v| VolumeTag::new(v.root.clone(), v.id))
            .collect()
    }
}
