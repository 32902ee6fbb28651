//! Cluster manifests under `manifests/`

use super::{ClusterMetadata, InstallConfig};
use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::error::{ForgeError, ForgeResult};
use async_trait::async_trait;
use serde_json::json;

const MANIFEST_DIR: &str = "manifests";

/// Parse `data` as YAML, rejecting files that exist but do not parse
pub(super) fn check_yaml(file: &File) -> ForgeResult<()> {
    serde_yaml::from_slice::<serde_yaml::Value>(&file.data)
        .map(|_| ())
        .map_err(|e| ForgeError::invalid_file(&file.filename, e))
}

pub(super) fn yaml_file(filename: String, value: &serde_json::Value) -> ForgeResult<File> {
    Ok(File::new(filename, serde_yaml::to_string(value)?))
}

/// Kubernetes manifests derived from the install config
#[derive(Debug, Default)]
pub struct Manifests {
    files: Vec<File>,
}

#[async_trait]
impl Asset for Manifests {
    fn name(&self) -> &'static str {
        "Common Manifests"
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![
            Box::new(InstallConfig::default()),
            Box::new(ClusterMetadata::default()),
        ]
    }

    async fn generate(&mut self, _cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()> {
        let install_config = parents.get::<InstallConfig>()?;
        let install = &install_config.config;
        let metadata = &parents.get::<ClusterMetadata>()?.metadata;

        let embedded = install_config
            .files()
            .first()
            .map(File::text)
            .unwrap_or_default();

        let cluster_config = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "cluster-config-v1", "namespace": "kube-system" },
            "data": { "install-config": embedded },
        });

        let infrastructure = json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "Infrastructure",
            "metadata": { "name": "cluster" },
            "spec": {},
            "status": {
                "infrastructureName": metadata.infra_id,
                "platform": install.platform,
                "apiServerURL": format!("https://api.{}:6443", install.cluster_domain()),
                "apiServerInternalURI": format!("https://api-int.{}:6443", install.cluster_domain()),
            },
        });

        let dns = json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "DNS",
            "metadata": { "name": "cluster" },
            "spec": { "baseDomain": install.cluster_domain() },
        });

        let network = json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "Network",
            "metadata": { "name": "cluster" },
            "spec": {
                "clusterNetwork": install.networking.cluster_network.iter()
                    .map(|n| json!({ "cidr": n.cidr, "hostPrefix": n.host_prefix }))
                    .collect::<Vec<_>>(),
                "serviceNetwork": install.networking.service_network,
            },
        });

        self.files = vec![
            yaml_file(format!("{MANIFEST_DIR}/cluster-config.yaml"), &cluster_config)?,
            yaml_file(format!("{MANIFEST_DIR}/cluster-dns-02-config.yml"), &dns)?,
            yaml_file(format!("{MANIFEST_DIR}/cluster-infrastructure-02-config.yml"), &infrastructure)?,
            yaml_file(format!("{MANIFEST_DIR}/cluster-network-02-config.yml"), &network)?,
        ];
        Ok(())
    }

    fn as_writable(&self) -> Option<&dyn WritableAsset> {
        Some(self)
    }

    fn as_loadable(&mut self) -> Option<&mut dyn LoadableAsset> {
        Some(self)
    }
}

impl WritableAsset for Manifests {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for Manifests {
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        let files = fetcher.fetch_by_pattern(&format!("{MANIFEST_DIR}/*")).await?;
        if files.is_empty() {
            return Ok(false);
        }
        for file in &files {
            check_yaml(file)?;
        }
        self.files = files;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::DiskFetcher;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_picks_up_user_edits() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(MANIFEST_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("extra.yaml"), "kind: ConfigMap\n").unwrap();

        let mut asset = Manifests::default();
        assert!(asset.load(&DiskFetcher::new(temp.path())).await.unwrap());
        assert_eq!(asset.files()[0].filename, "manifests/extra.yaml");
    }

    #[tokio::test]
    async fn load_rejects_broken_yaml() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(MANIFEST_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("bad.yaml"), "key: [").unwrap();

        let mut asset = Manifests::default();
        assert!(asset.load(&DiskFetcher::new(temp.path())).await.is_err());
    }

    #[tokio::test]
    async fn empty_directory_is_not_found() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(MANIFEST_DIR)).unwrap();

        let mut asset = Manifests::default();
        assert!(!asset.load(&DiskFetcher::new(temp.path())).await.unwrap());
    }
}
