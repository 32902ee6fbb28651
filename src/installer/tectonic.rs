//! OpenShift-specific manifests under `openshift/`

use super::manifests::{check_yaml, yaml_file};
use super::{InstallConfig, KubeadminPassword};
use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::error::ForgeResult;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

const OPENSHIFT_DIR: &str = "openshift";

#[derive(Debug, Default)]
pub struct Tectonic {
    files: Vec<File>,
}

#[async_trait]
impl Asset for Tectonic {
    fn name(&self) -> &'static str {
        "Tectonic Manifests"
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![
            Box::new(InstallConfig::default()),
            Box::new(KubeadminPassword::default()),
        ]
    }

    async fn generate(&mut self, _cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()> {
        let install = &parents.get::<InstallConfig>()?.config;
        let password = parents.get::<KubeadminPassword>()?;

        let secret = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "type": "Opaque",
            "metadata": { "name": "kubeadmin", "namespace": "kube-system" },
            "data": { "kubeadmin": STANDARD.encode(password.digest()) },
        });

        let machine_counts = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "machine-counts", "namespace": "openshift-config" },
            "data": {
                "controlPlane": install.control_plane.replicas.to_string(),
                "compute": install.compute_replicas().to_string(),
            },
        });

        self.files = vec![
            yaml_file(format!("{OPENSHIFT_DIR}/99_kubeadmin-password-secret.yaml"), &secret)?,
            yaml_file(format!("{OPENSHIFT_DIR}/99_machine-counts.yaml"), &machine_counts)?,
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

impl WritableAsset for Tectonic {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for Tectonic {
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        let files = fetcher.fetch_by_pattern(&format!("{OPENSHIFT_DIR}/*")).await?;
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
