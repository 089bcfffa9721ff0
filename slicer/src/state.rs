use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::env;

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::colors::Colors;
use crate::dimension::{get_dimension, Dimension};

pub const STATE_PATH_ENV: &str = "SLICER_STATE_PATH";

#[derive(Debug, thiserror::Error)]
pub enum StatePersistenceError {
    #[error("config directory unavailable")]
    MissingConfigDir,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Persisted dashboard view: the known dimensions and the current split
/// color assignment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    version: u64,
    #[serde(default)]
    dimensions: Vec<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    colors: Option<Colors>,
}

impl DashboardState {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        get_dimension(&self.dimensions, name)
    }

    pub fn colors(&self) -> Option<&Colors> {
        self.colors.as_ref()
    }

    /// Registers `dimension`, replacing any existing one with the same name.
    pub fn add_dimension(&mut self, dimension: Dimension) -> u64 {
        let wanted = dimension.name().to_lowercase();
        match self
            .dimensions
            .iter_mut()
            .find(|existing| existing.name().to_lowercase() == wanted)
        {
            Some(existing) if *existing == dimension => return self.version,
            Some(existing) => *existing = dimension,
            None => self.dimensions.push(dimension),
        }

        self.version += 1;
        self.version
    }

    /// Stores a new assignment. The version only moves when it changed.
    pub fn set_colors(&mut self, colors: Colors) -> u64 {
        if self.colors.as_ref() != Some(&colors) {
            self.colors = Some(colors);
            self.version += 1;
        }
        self.version
    }

    pub fn save(&self) -> Result<(), StatePersistenceError> {
        let path = get_storage_path()?;
        self.save_to_path(path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), StatePersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        debug!(path = %path.display(), version = self.version, "saved dashboard state");
        Ok(())
    }

    pub fn load() -> Result<Self, StatePersistenceError> {
        let path = get_storage_path()?;
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, StatePersistenceError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no saved dashboard state, starting fresh");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}

pub fn get_storage_path() -> Result<PathBuf, StatePersistenceError> {
    if let Ok(custom) = env::var(STATE_PATH_ENV) {
        return Ok(PathBuf::from(custom));
    }
    let base = config_dir().ok_or(StatePersistenceError::MissingConfigDir)?;
    Ok(base.join("slicer").join("state.json"))
}
