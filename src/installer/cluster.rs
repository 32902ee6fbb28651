//! The running cluster, created by the configured provisioner

use super::{to_json_file, ClusterMetadata, TerraformVariables, TFVARS_FILE};
use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::error::{ForgeError, ForgeResult};
use crate::provision;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

pub const CLUSTER_STATE_FILE: &str = "cluster-state.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterState {
    #[serde(rename = "infraID")]
    pub infra_id: String,
    pub cluster_name: String,
    pub created_at: DateTime<Utc>,
    /// Command line that provisioned the cluster, if any
    pub provisioner: Option<String>,
}

#[derive(Debug, Default)]
pub struct Cluster {
    files: Vec<File>,
}

#[async_trait]
impl Asset for Cluster {
    fn name(&self) -> &'static str {
        "Cluster"
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![
            Box::new(ClusterMetadata::default()),
            Box::new(TerraformVariables::default()),
        ]
    }

    async fn generate(&mut self, cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()> {
        let metadata = &parents.get::<ClusterMetadata>()?.metadata;
        parents.get::<TerraformVariables>()?;

        let command = &cx.provision.apply_command;
        let provisioner = if command.is_empty() {
            warn!("No provision.apply_command configured, skipping infrastructure creation");
            None
        } else {
            let env = [
                ("FORGE_INFRA_ID", metadata.infra_id.clone()),
                ("FORGE_TFVARS", TFVARS_FILE.to_string()),
            ];
            provision::run(command, cx.directory(), &env).await?;
            info!("Provisioned infrastructure for {}", metadata.infra_id);
            Some(command.join(" "))
        };

        let state = ClusterState {
            infra_id: metadata.infra_id.clone(),
            cluster_name: metadata.cluster_name.clone(),
            created_at: Utc::now(),
            provisioner,
        };
        self.files = vec![to_json_file(CLUSTER_STATE_FILE, &state)?];
        Ok(())
    }

    fn as_writable(&self) -> Option<&dyn WritableAsset> {
        Some(self)
    }

    fn as_loadable(&mut self) -> Option<&mut dyn LoadableAsset> {
        Some(self)
    }
}

impl WritableAsset for Cluster {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for Cluster {
    /// A cluster is never reused: finding its state means one was already
    /// created from this directory.
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        match fetcher.fetch_by_name(CLUSTER_STATE_FILE).await? {
            Some(_) => Err(ForgeError::ClusterExists {
                path: PathBuf::from(CLUSTER_STATE_FILE),
            }),
            None => Ok(false),
        }
    }
}
