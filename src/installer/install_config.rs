//! `install-config.yaml`, the user-facing description of the cluster

use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::config::InstallDefaults;
use crate::error::{ForgeError, ForgeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tracing::debug;

pub const INSTALL_CONFIG_FILE: &str = "install-config.yaml";

/// Parsed install config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfigData {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub base_domain: String,
    pub platform: String,
    pub control_plane: MachinePool,
    #[serde(default)]
    pub compute: Vec<MachinePool>,
    pub networking: Networking,
    pub pull_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePool {
    pub name: String,
    pub replicas: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    pub machine_network: Vec<MachineNetwork>,
    pub cluster_network: Vec<ClusterNetwork>,
    pub service_network: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineNetwork {
    pub cidr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    pub cidr: String,
    pub host_prefix: u8,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl InstallConfigData {
    pub fn from_defaults(defaults: &InstallDefaults) -> Self {
        Self {
            api_version: default_api_version(),
            metadata: ObjectMeta {
                name: defaults.cluster_name.clone(),
            },
            base_domain: defaults.base_domain.clone(),
            platform: defaults.platform.clone(),
            control_plane: MachinePool {
                name: "master".to_string(),
                replicas: defaults.control_plane_replicas,
            },
            compute: vec![MachinePool {
                name: "worker".to_string(),
                replicas: defaults.compute_replicas,
            }],
            networking: Networking {
                machine_network: vec![MachineNetwork {
                    cidr: defaults.machine_network.clone(),
                }],
                cluster_network: vec![ClusterNetwork {
                    cidr: defaults.cluster_network.clone(),
                    host_prefix: 23,
                }],
                service_network: vec![defaults.service_network.clone()],
            },
            pull_secret: defaults.pull_secret.clone(),
            ssh_key: defaults.ssh_key.clone(),
        }
    }

    /// `<name>.<baseDomain>`
    pub fn cluster_domain(&self) -> String {
        format!("{}.{}", self.metadata.name, self.base_domain)
    }

    pub fn compute_replicas(&self) -> u32 {
        self.compute.iter().map(|p| p.replicas).sum()
    }

    pub fn machine_cidr(&self) -> &str {
        self.networking
            .machine_network
            .first()
            .map(|n| n.cidr.as_str())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> ForgeResult<()> {
        if self.api_version != "v1" {
            return Err(ForgeError::install_config(
                "apiVersion",
                format!("unsupported version {:?}", self.api_version),
            ));
        }
        validate_dns_label("metadata.name", &self.metadata.name)?;

        if self.base_domain.is_empty() {
            return Err(ForgeError::install_config("baseDomain", "must not be empty"));
        }
        for label in self.base_domain.split('.') {
            validate_dns_label("baseDomain", label)?;
        }

        if self.platform.is_empty() {
            return Err(ForgeError::install_config("platform", "must not be empty"));
        }
        if self.control_plane.replicas < 1 {
            return Err(ForgeError::install_config(
                "controlPlane.replicas",
                "must be at least 1",
            ));
        }

        let secret: serde_json::Value = serde_json::from_str(&self.pull_secret)
            .map_err(|e| ForgeError::install_config("pullSecret", format!("not valid JSON: {e}")))?;
        if !secret.is_object() {
            return Err(ForgeError::install_config("pullSecret", "must be a JSON object"));
        }

        let networking = &self.networking;
        if networking.machine_network.is_empty() {
            return Err(ForgeError::install_config(
                "networking.machineNetwork",
                "at least one network is required",
            ));
        }
        for net in &networking.machine_network {
            validate_cidr("networking.machineNetwork", &net.cidr)?;
        }
        for net in &networking.cluster_network {
            let prefix = validate_cidr("networking.clusterNetwork", &net.cidr)?;
            if net.host_prefix < prefix || net.host_prefix > 32 {
                return Err(ForgeError::install_config(
                    "networking.clusterNetwork.hostPrefix",
                    format!("{} does not fit {}", net.host_prefix, net.cidr),
                ));
            }
        }
        for cidr in &networking.service_network {
            validate_cidr("networking.serviceNetwork", cidr)?;
        }

        Ok(())
    }
}

fn validate_dns_label(field: &str, value: &str) -> ForgeResult<()> {
    let valid_chars = value
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if value.is_empty()
        || value.len() > 63
        || !valid_chars
        || value.starts_with('-')
        || value.ends_with('-')
    {
        return Err(ForgeError::install_config(
            field,
            format!("{value:?} is not a valid DNS label"),
        ));
    }
    Ok(())
}

/// Check `a.b.c.d/n` and return the prefix length
fn validate_cidr(field: &str, value: &str) -> ForgeResult<u8> {
    let invalid = || ForgeError::install_config(field, format!("{value:?} is not a valid IPv4 CIDR"));

    let (addr, prefix) = value.split_once('/').ok_or_else(invalid)?;
    addr.parse::<Ipv4Addr>().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    if prefix > 32 {
        return Err(invalid());
    }
    Ok(prefix)
}

/// The install config asset
#[derive(Debug, Default)]
pub struct InstallConfig {
    pub config: InstallConfigData,
    files: Vec<File>,
}

impl InstallConfig {
    pub const NAME: &'static str = "Install Config";
}

#[async_trait]
impl Asset for InstallConfig {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![]
    }

    async fn generate(&mut self, cx: &GenerateContext, _parents: &Parents<'_>) -> ForgeResult<()> {
        debug!("Building install config from [install] defaults");
        let config = InstallConfigData::from_defaults(&cx.install);
        config.validate()?;

        let yaml = serde_yaml::to_string(&config)?;
        self.files = vec![File::new(INSTALL_CONFIG_FILE, yaml)];
        self.config = config;
        Ok(())
    }

    fn as_writable(&self) -> Option<&dyn WritableAsset> {
        Some(self)
    }

    fn as_loadable(&mut self) -> Option<&mut dyn LoadableAsset> {
        Some(self)
    }
}

impl WritableAsset for InstallConfig {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for InstallConfig {
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        let Some(file) = fetcher.fetch_by_name(INSTALL_CONFIG_FILE).await? else {
            return Ok(false);
        };

        let config: InstallConfigData = serde_yaml::from_slice(&file.data)
            .map_err(|e| ForgeError::invalid_file(INSTALL_CONFIG_FILE, e))?;
        config.validate()?;

        self.config = config;
        self.files = vec![file];
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{DiskFetcher, MemoryFetcher};
    use crate::config::Config;
    use tempfile::TempDir;

    fn valid() -> InstallConfigData {
        InstallConfigData::from_defaults(&InstallDefaults::default())
    }

    #[tokio::test]
    async fn generate_from_defaults() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.install.cluster_name = "lab".to_string();
        let cx = GenerateContext::new(temp.path(), &config);

        let mut asset = InstallConfig::default();
        asset.generate(&cx, &Parents::new(InstallConfig::NAME, [])).await.unwrap();

        assert_eq!(asset.config.metadata.name, "lab");
        assert_eq!(asset.files().len(), 1);
        let text = asset.files()[0].text();
        assert!(text.contains("baseDomain: example.com"));
        assert!(text.contains("name: lab"));
    }

    #[tokio::test]
    async fn load_round_trips_generated_file() {
        let temp = TempDir::new().unwrap();
        let cx = GenerateContext::new(temp.path(), &Config::default());
        let mut generated = InstallConfig::default();
        generated
            .generate(&cx, &Parents::new(InstallConfig::NAME, []))
            .await
            .unwrap();

        let mut loaded = InstallConfig::default();
        let found = loaded.load(&MemoryFetcher::new(generated.files())).await.unwrap();

        assert!(found);
        assert_eq!(loaded.config, generated.config);
    }

    #[tokio::test]
    async fn load_absent_is_not_found() {
        let temp = TempDir::new().unwrap();
        let mut asset = InstallConfig::default();
        assert!(!asset.load(&DiskFetcher::new(temp.path())).await.unwrap());
    }

    #[tokio::test]
    async fn load_malformed_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(INSTALL_CONFIG_FILE), "metadata: [unclosed").unwrap();

        let mut asset = InstallConfig::default();
        let err = asset.load(&DiskFetcher::new(temp.path())).await.err().unwrap();
        assert!(matches!(err, ForgeError::InvalidAssetFile { .. }));
    }

    #[tokio::test]
    async fn load_invalid_values_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut data = valid();
        data.metadata.name = "Not_A_Label".to_string();
        std::fs::write(
            temp.path().join(INSTALL_CONFIG_FILE),
            serde_yaml::to_string(&data).unwrap(),
        )
        .unwrap();

        let mut asset = InstallConfig::default();
        let err = asset.load(&DiskFetcher::new(temp.path())).await.err().unwrap();
        assert!(matches!(err, ForgeError::InstallConfigInvalid { .. }));
    }

    #[test]
    fn validate_accepts_defaults() {
        valid().validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let mut zero_masters = valid();
        zero_masters.control_plane.replicas = 0;
        assert!(zero_masters.validate().is_err());

        let mut bad_secret = valid();
        bad_secret.pull_secret = "not json".to_string();
        assert!(bad_secret.validate().is_err());

        let mut bad_cidr = valid();
        bad_cidr.networking.service_network = vec!["172.30.0.0/40".to_string()];
        assert!(bad_cidr.validate().is_err());

        let mut bad_domain = valid();
        bad_domain.base_domain = "example..com".to_string();
        assert!(bad_domain.validate().is_err());
    }

    #[test]
    fn cidr_parsing() {
        assert_eq!(validate_cidr("f", "10.0.0.0/16").unwrap(), 16);
        assert!(validate_cidr("f", "10.0.0.0").is_err());
        assert!(validate_cidr("f", "300.0.0.0/8").is_err());
    }

    #[test]
    fn derived_values() {
        let data = valid();
        assert_eq!(data.cluster_domain(), "forge.example.com");
        assert_eq!(data.compute_replicas(), 3);
        assert_eq!(data.machine_cidr(), "10.0.0.0/16");
    }
}
