//! Configuration schema for Forge
//!
//! Configuration is stored at `~/.config/forge/config.toml`

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Install defaults used when no install-config.yaml is present
    pub install: InstallDefaults,

    /// External provisioning commands
    pub provision: ProvisionConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Install-config defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallDefaults {
    /// Cluster name, must be a DNS label
    pub cluster_name: String,

    /// Base DNS domain of the cluster
    pub base_domain: String,

    /// Platform name ("none", "aws", "libvirt", ...)
    pub platform: String,

    /// Control plane machine count
    pub control_plane_replicas: u32,

    /// Compute machine count
    pub compute_replicas: u32,

    /// Pull secret JSON
    pub pull_secret: String,

    /// Public SSH key for the core user
    pub ssh_key: Option<String>,

    /// Machine network CIDR
    pub machine_network: String,

    /// Pod network CIDR
    pub cluster_network: String,

    /// Service network CIDR
    pub service_network: String,
}

impl Default for InstallDefaults {
    fn default() -> Self {
        Self {
            cluster_name: "forge".to_string(),
            base_domain: "example.com".to_string(),
            platform: "none".to_string(),
            control_plane_replicas: 3,
            compute_replicas: 3,
            pull_secret: r#"{"auths":{}}"#.to_string(),
            ssh_key: None,
            machine_network: "10.0.0.0/16".to_string(),
            cluster_network: "10.128.0.0/14".to_string(),
            service_network: "172.30.0.0/16".to_string(),
        }
    }
}

/// Provisioning commands run in the install directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// argv run by `create cluster`; empty skips provisioning
    pub apply_command: Vec<String>,

    /// argv run by `destroy cluster`; empty skips teardown
    pub destroy_command: Vec<String>,
}
