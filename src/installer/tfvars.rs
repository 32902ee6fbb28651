//! `terraform.tfvars.json`, the input handed to the provisioner

use super::{BootstrapIgnition, ClusterMetadata, InstallConfig, MasterIgnition};
use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::error::{ForgeError, ForgeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const TFVARS_FILE: &str = "terraform.tfvars.json";

/// Optional platform-specific variables, picked up when present
const PLATFORM_TFVARS_FILE: &str = "terraform.platform.auto.tfvars.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfVars {
    pub cluster_id: String,
    pub cluster_domain: String,
    pub base_domain: String,
    pub machine_v4_cidrs: Vec<String>,
    pub master_count: u32,
    pub ignition_bootstrap: String,
    /// Bootstrap config size rounded up to a 512-byte block
    pub ignition_bootstrap_file_size: usize,
    pub ignition_master: String,
}

fn round_to_block(len: usize) -> usize {
    len.div_ceil(512) * 512
}

#[derive(Debug, Default)]
pub struct TerraformVariables {
    files: Vec<File>,
}

#[async_trait]
impl Asset for TerraformVariables {
    fn name(&self) -> &'static str {
        "Terraform Variables"
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![
            Box::new(ClusterMetadata::default()),
            Box::new(InstallConfig::default()),
            Box::new(BootstrapIgnition::default()),
            Box::new(MasterIgnition::default()),
        ]
    }

    async fn generate(&mut self, _cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()> {
        let metadata = &parents.get::<ClusterMetadata>()?.metadata;
        let install = &parents.get::<InstallConfig>()?.config;
        let bootstrap = parents.get::<BootstrapIgnition>()?;
        let master = parents.get::<MasterIgnition>()?;

        if install.control_plane.replicas == 0 {
            return Err(ForgeError::generate(self.name(), "master count cannot be zero"));
        }

        let bootstrap_ign = bootstrap.files().first().map(File::text).unwrap_or_default();
        let vars = TfVars {
            cluster_id: metadata.infra_id.clone(),
            cluster_domain: install.cluster_domain(),
            base_domain: install.base_domain.clone(),
            machine_v4_cidrs: install
                .networking
                .machine_network
                .iter()
                .map(|n| n.cidr.clone())
                .collect(),
            master_count: install.control_plane.replicas,
            ignition_bootstrap_file_size: round_to_block(bootstrap_ign.len()),
            ignition_bootstrap: bootstrap_ign,
            ignition_master: master.files().first().map(File::text).unwrap_or_default(),
        };

        self.files = vec![super::to_json_file(TFVARS_FILE, &vars)?];
        Ok(())
    }

    fn as_writable(&self) -> Option<&dyn WritableAsset> {
        Some(self)
    }

    fn as_loadable(&mut self) -> Option<&mut dyn LoadableAsset> {
        Some(self)
    }
}

impl WritableAsset for TerraformVariables {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for TerraformVariables {
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        let Some(file) = fetcher.fetch_by_name(TFVARS_FILE).await? else {
            return Ok(false);
        };
        serde_json::from_slice::<TfVars>(&file.data)
            .map_err(|e| ForgeError::invalid_file(TFVARS_FILE, e))?;

        let mut files = vec![file];
        if let Some(platform) = fetcher.fetch_by_name(PLATFORM_TFVARS_FILE).await? {
            files.push(platform);
        }
        self.files = files;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryFetcher;

    #[test]
    fn bootstrap_size_rounds_up() {
        assert_eq!(round_to_block(0), 0);
        assert_eq!(round_to_block(1), 512);
        assert_eq!(round_to_block(512), 512);
        assert_eq!(round_to_block(513), 1024);
    }

    #[tokio::test]
    async fn load_includes_platform_vars() {
        let vars = TfVars {
            cluster_id: "lab-abcde".to_string(),
            cluster_domain: "lab.example.com".to_string(),
            base_domain: "example.com".to_string(),
            machine_v4_cidrs: vec!["10.0.0.0/16".to_string()],
            master_count: 3,
            ignition_bootstrap: "{}".to_string(),
            ignition_bootstrap_file_size: 512,
            ignition_master: "{}".to_string(),
        };
        let files = vec![
            File::new(TFVARS_FILE, serde_json::to_vec(&vars).unwrap()),
            File::new(PLATFORM_TFVARS_FILE, "{}"),
        ];

        let mut asset = TerraformVariables::default();
        assert!(asset.load(&MemoryFetcher::new(&files)).await.unwrap());
        assert_eq!(asset.files().len(), 2);
    }

    #[tokio::test]
    async fn load_rejects_unexpected_shape() {
        let files = vec![File::new(TFVARS_FILE, r#"{"cluster_id": 5}"#)];
        let mut asset = TerraformVariables::default();
        assert!(asset.load(&MemoryFetcher::new(&files)).await.is_err());
    }
}
