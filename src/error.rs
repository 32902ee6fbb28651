//! Error types for Forge
//!
//! All modules use `ForgeResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Forge operations
pub type ForgeResult<T> = Result<T, ForgeError>;

/// All errors that can occur in Forge
#[derive(Error, Debug)]
pub enum ForgeError {
    // Graph resolution errors
    #[error("failed to fetch {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: Box<ForgeError>,
    },

    #[error("dependency cycle detected: {chain}")]
    DependencyCycle { chain: String },

    #[error("{asset} requested {parent}, which is not one of its declared dependencies")]
    UndeclaredParent { asset: String, parent: String },

    #[error("{name} already failed earlier in this run")]
    PreviouslyFailed { name: String },

    // Generation errors
    #[error("{asset}: {reason}")]
    Generate { asset: String, reason: String },

    #[error("invalid install config: {field}: {reason}")]
    InstallConfigInvalid { field: String, reason: String },

    #[error("provisioner command failed: {command}, exit code: {code}")]
    ProvisionFailed { command: String, code: i32 },

    // Load errors
    #[error("failed to load {path}: {reason}")]
    InvalidAssetFile { path: PathBuf, reason: String },

    #[error("{0} is not a path inside the install directory")]
    UnsafePath(String),

    #[error("{path} already exists. There may already be a running cluster")]
    ClusterExists { path: PathBuf },

    // Persistence errors
    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid state file {path}: {reason}")]
    StateFileInvalid { path: PathBuf, reason: String },

    // Lookup errors
    #[error("unknown target: {0}")]
    TargetNotFound(String),

    #[error("file not found in state: {0}")]
    FileNotInState(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} needs confirmation and no terminal is attached")]
    ConfirmationRequired(String),

    #[error("interrupted")]
    Interrupted,

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

/// Process exit codes used by the installer flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Failure,
    InstallConfig,
    Infrastructure,
    Bootstrap,
    Install,
    OperatorStability,
    Interrupted,
}

impl ExitStatus {
    /// Numeric process exit code
    pub fn code(self) -> u8 {
        match self {
            Self::Failure => 1,
            Self::InstallConfig => 3,
            Self::Infrastructure => 4,
            Self::Bootstrap => 5,
            Self::Install => 6,
            Self::OperatorStability => 7,
            Self::Interrupted => 130,
        }
    }
}

impl ForgeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a domain failure raised while generating an asset
    pub fn generate(asset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Generate {
            asset: asset.into(),
            reason: reason.into(),
        }
    }

    /// Create an error for an asset file that exists but cannot be used
    pub fn invalid_file(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidAssetFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an install-config validation error
    pub fn install_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstallConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error with the name of the asset whose fetch it aborted
    pub fn fetch(name: impl Into<String>, source: ForgeError) -> Self {
        Self::Fetch {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Names along the fetch chain, outermost first
    pub fn fetch_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self;
        while let Self::Fetch { name, source } = current {
            chain.push(name.as_str());
            current = source;
        }
        chain
    }

    /// The error underneath all fetch wrappers
    pub fn root_cause(&self) -> &ForgeError {
        let mut current = self;
        while let Self::Fetch { source, .. } = current {
            current = source;
        }
        current
    }

    /// Check if the error is a graph-shape problem rather than a runtime failure
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::DependencyCycle { .. } | Self::UndeclaredParent { .. }
        )
    }

    /// Map the error onto the installer exit-code convention
    pub fn exit_status(&self) -> ExitStatus {
        let innermost_asset = self.fetch_chain().last().copied();
        match self.root_cause() {
            Self::Interrupted => ExitStatus::Interrupted,
            Self::InstallConfigInvalid { .. } => ExitStatus::InstallConfig,
            Self::ProvisionFailed { .. } | Self::ClusterExists { .. } => {
                ExitStatus::Infrastructure
            }
            _ if innermost_asset == Some(crate::installer::InstallConfig::NAME) => {
                ExitStatus::InstallConfig
            }
            _ => ExitStatus::Failure,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self.root_cause() {
            Self::TargetNotFound(_) => Some("Run: forge create --help"),
            Self::ClusterExists { .. } => Some("Run: forge destroy cluster"),
            Self::StateFileInvalid { .. } => {
                Some("Remove .forge_install_state.json to start from a clean cache")
            }
            Self::InstallConfigInvalid { .. } => {
                Some("Fix install-config.yaml or the [install] section of your config")
            }
            Self::ProvisionFailed { .. } => Some("Run with -vv to see provisioner output"),
            Self::ConfirmationRequired(_) => Some("Pass --yes to confirm"),
            Self::UnsafePath(_) => Some("Check asset filenames in .forge_install_state.json"),
            _ => None,
        }
    }
}
