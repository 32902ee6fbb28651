//! The install state file
//!
//! A single JSON document per install directory recording, for every asset
//! resolved by a previous invocation, its name and the files it produced.
//! Later invocations offer these files to each asset's `load` so earlier
//! work is reused without regenerating it.

use crate::asset::file::{check_relative, same_files, File};
use crate::error::{ForgeError, ForgeResult};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// State file name inside the install directory
pub const STATE_FILE_NAME: &str = ".forge_install_state.json";

/// Serialized cache of resolved assets, keyed by asset name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// Version of forge that wrote the file
    pub version: String,

    /// Files recorded per asset name
    #[serde(default)]
    pub assets: BTreeMap<String, Vec<File>>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            assets: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Path of the state file for an install directory
    pub fn path(directory: &Path) -> PathBuf {
        directory.join(STATE_FILE_NAME)
    }

    /// Load the state file. A missing file yields an empty cache.
    pub async fn load(directory: &Path) -> ForgeResult<Self> {
        let path = Self::path(directory);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, starting from an empty cache", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ForgeError::io(format!("reading state file {}", path.display()), e))
            }
        };

        let state: StateFile =
            serde_json::from_str(&content).map_err(|e| ForgeError::StateFileInvalid {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        for (name, files) in &state.assets {
            for file in files {
                check_relative(&file.filename).map_err(|e| ForgeError::StateFileInvalid {
                    path: path.clone(),
                    reason: format!("{}: {}", name, e),
                })?;
            }
        }

        if !state.is_compatible()? {
            warn!(
                "State file {} was written by forge {}, ignoring it",
                path.display(),
                state.version
            );
            return Ok(Self::default());
        }

        debug!("Loaded {} asset(s) from {}", state.assets.len(), path.display());
        Ok(state)
    }

    /// Whether this build of forge can reuse the recorded files
    fn is_compatible(&self) -> ForgeResult<bool> {
        let invalid = |reason: String| ForgeError::StateFileInvalid {
            path: PathBuf::from(STATE_FILE_NAME),
            reason,
        };
        let written_by = Version::parse(&self.version)
            .map_err(|e| invalid(format!("version {:?}: {}", self.version, e)))?;
        let current = Version::parse(env!("CARGO_PKG_VERSION"))
            .map_err(|e| ForgeError::Internal(e.to_string()))?;
        let req = VersionReq::parse(&format!("^{}", written_by))
            .map_err(|e| invalid(e.to_string()))?;
        Ok(req.matches(&current))
    }

    /// Write the state file into `directory`
    pub async fn save(&self, directory: &Path) -> ForgeResult<()> {
        let path = Self::path(directory);
        fs::create_dir_all(directory)
            .await
            .map_err(|e| ForgeError::Persist {
                path: directory.to_path_buf(),
                source: e,
            })?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .await
            .map_err(|e| ForgeError::Persist {
                path: path.clone(),
                source: e,
            })?;

        debug!("Saved {} asset(s) to {}", self.assets.len(), path.display());
        Ok(())
    }

    /// Remove the state file. Returns whether a file was removed.
    pub async fn remove(directory: &Path) -> ForgeResult<bool> {
        let path = Self::path(directory);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ForgeError::io(format!("removing {}", path.display()), e)),
        }
    }

    /// Recorded files for an asset
    pub fn entry(&self, name: &str) -> Option<&[File]> {
        self.assets.get(name).map(Vec::as_slice)
    }

    /// Record (or replace) an asset's files
    pub fn insert(&mut self, name: impl Into<String>, files: Vec<File>) {
        self.assets.insert(name.into(), files);
    }

    /// Whether the recorded files for `name` equal `files`
    pub fn matches(&self, name: &str, files: &[File]) -> bool {
        self.entry(name).is_some_and(|recorded| same_files(recorded, files))
    }

    /// Find a recorded file by filename across all assets
    pub fn find_file(&self, filename: &str) -> Option<(&str, &File)> {
        self.assets.iter().find_map(|(name, files)| {
            files
                .iter()
                .find(|f| f.filename == filename)
                .map(|f| (name.as_str(), f))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
