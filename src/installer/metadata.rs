//! `metadata.json`: identifiers destroy needs to find the cluster again

use super::{load_json, random_string, to_json_file, InstallConfig, LOWER_ALNUM};
use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::error::ForgeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const METADATA_FILE: &str = "metadata.json";

/// Longest cluster-name prefix kept in the infra id
const INFRA_PREFIX_LEN: usize = 21;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataData {
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    #[serde(rename = "infraID")]
    pub infra_id: String,
    pub platform: String,
}

#[derive(Debug, Default)]
pub struct ClusterMetadata {
    pub metadata: MetadataData,
    files: Vec<File>,
}

/// `<name prefix>-<5 random chars>`, unique per cluster
fn infra_id(cluster_name: &str) -> String {
    let prefix: String = cluster_name.chars().take(INFRA_PREFIX_LEN).collect();
    let prefix = prefix.trim_end_matches('-');
    format!("{}-{}", prefix, random_string(5, LOWER_ALNUM))
}

#[async_trait]
impl Asset for ClusterMetadata {
    fn name(&self) -> &'static str {
        "Metadata"
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![Box::new(InstallConfig::default())]
    }

    async fn generate(&mut self, _cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()> {
        let install = &parents.get::<InstallConfig>()?.config;

        let metadata = MetadataData {
            cluster_name: install.metadata.name.clone(),
            cluster_id: Uuid::new_v4().to_string(),
            infra_id: infra_id(&install.metadata.name),
            platform: install.platform.clone(),
        };
        self.files = vec![to_json_file(METADATA_FILE, &metadata)?];
        self.metadata = metadata;
        Ok(())
    }

    fn as_writable(&self) -> Option<&dyn WritableAsset> {
        Some(self)
    }

    fn as_loadable(&mut self) -> Option<&mut dyn LoadableAsset> {
        Some(self)
    }
}

impl WritableAsset for ClusterMetadata {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for ClusterMetadata {
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        match load_json::<MetadataData>(fetcher, METADATA_FILE).await? {
            Some((metadata, file)) => {
                self.metadata = metadata;
                self.files = vec![file];
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
