//! Named bundles of root assets exposed by `forge create`

use crate::asset::{files_of, persist_to_file, Asset, AssetId};
use crate::error::{ForgeError, ForgeResult};
use crate::installer::{
    BootstrapIgnition, Cluster, ClusterMetadata, InstallConfig, KubeadminPassword, Manifests,
    MasterIgnition, Tectonic, TerraformVariables, WorkerIgnition,
};
use crate::store::Store;
use tracing::{debug, info};

/// A CLI-visible target
pub struct Target {
    pub name: &'static str,
    pub description: &'static str,
    roots: fn() -> Vec<Box<dyn Asset>>,
}

impl Target {
    pub fn new(
        name: &'static str,
        description: &'static str,
        roots: fn() -> Vec<Box<dyn Asset>>,
    ) -> Self {
        Self {
            name,
            description,
            roots,
        }
    }

    /// Fresh instances of the target's root assets, in creation order
    pub fn roots(&self) -> Vec<Box<dyn Asset>> {
        (self.roots)()
    }

    /// Identities of the root assets, kept on disk by purge
    pub fn root_ids(&self) -> Vec<AssetId> {
        self.roots().iter().map(|a| AssetId::of_val(a.as_ref())).collect()
    }
}

/// Every target the CLI knows, constructed once at startup
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl TargetRegistry {
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    /// The installer's targets, in the order a full install reaches them
    pub fn installer() -> Self {
        Self::new(vec![
            Target::new(
                "install-config",
                "Generates the Install Config asset",
                || vec![Box::new(InstallConfig::default())],
            ),
            Target::new(
                "manifests",
                "Generates the Kubernetes manifests",
                || {
                    vec![
                        Box::new(Manifests::default()),
                        Box::new(Tectonic::default()),
                    ]
                },
            ),
            Target::new(
                "ignition-configs",
                "Generates the Ignition Config asset",
                || {
                    vec![
                        Box::new(BootstrapIgnition::default()),
                        Box::new(MasterIgnition::default()),
                        Box::new(WorkerIgnition::default()),
                        Box::new(KubeadminPassword::default()),
                        Box::new(ClusterMetadata::default()),
                    ]
                },
            ),
            Target::new("cluster", "Create a cluster", || {
                vec![
                    Box::new(ClusterMetadata::default()),
                    Box::new(KubeadminPassword::default()),
                    Box::new(TerraformVariables::default()),
                    Box::new(Cluster::default()),
                ]
            }),
        ])
    }

    /// Look up a target by name
    pub fn get(&self, name: &str) -> ForgeResult<&Target> {
        self.targets
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ForgeError::TargetNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.targets.iter().map(|t| t.name).collect()
    }
}

/// Outcome of building one target
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Relative paths written, in write order
    pub written: Vec<String>,
    /// Assets consumed from the install directory
    pub purged: Vec<&'static str>,
}

/// Fetch, persist and record every root of `target`, then purge consumed
/// inputs.
///
/// Each root is saved to disk and to the state file before the next one is
/// fetched, so a later failure leaves earlier roots in place. Purge only
/// runs once every root succeeded. `on_root` is told each root's name
/// before it is fetched.
pub async fn build_target(
    store: &mut Store,
    target: &Target,
    mut on_root: impl FnMut(&str),
) -> ForgeResult<BuildReport> {
    let mut report = BuildReport::default();
    let directory = store.directory().to_path_buf();

    for root in target.roots() {
        on_root(root.name());
        let asset = store.fetch(root).await?;
        debug!("Writing {}", asset.name());
        persist_to_file(asset, &directory).await?;
        report
            .written
            .extend(files_of(asset).iter().map(|f| f.filename.clone()));
        store.save_state().await?;
    }

    report.purged = store.purge(&target.root_ids()).await?;
    info!(
        "Created {} ({} files written)",
        target.name,
        report.written.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{GenerateContext, WritableAsset};
    use crate::config::Config;
    use crate::installer::INSTALL_CONFIG_FILE;
    use crate::store::AssetSource;
    use tempfile::TempDir;

    async fn store_in(dir: &std::path::Path) -> Store {
        Store::open(GenerateContext::new(dir, &Config::default()))
            .await
            .unwrap()
    }

    #[test]
    fn registry_lookup() {
        let registry = TargetRegistry::installer();
        assert_eq!(
            registry.names(),
            vec!["install-config", "manifests", "ignition-configs", "cluster"]
        );
        assert_eq!(registry.get("manifests").unwrap().roots().len(), 2);

        let err = registry.get("kubeconfig").err().unwrap();
        assert!(matches!(err, ForgeError::TargetNotFound(_)));
    }

    #[tokio::test]
    async fn manifests_on_fresh_directory() {
        let temp = TempDir::new().unwrap();
        let registry = TargetRegistry::installer();
        let mut store = store_in(temp.path()).await;

        let mut seen = Vec::new();
        let report = build_target(&mut store, registry.get("manifests").unwrap(), |name| {
            seen.push(name.to_string())
        })
        .await
        .unwrap();

        assert_eq!(seen, vec!["Common Manifests", "Tectonic Manifests"]);

        let manifests = store.get::<Manifests>().unwrap().files().len();
        let tectonic = store.get::<Tectonic>().unwrap().files().len();
        assert_eq!(report.written.len(), manifests + tectonic);
        for file in &report.written {
            assert!(temp.path().join(file).exists(), "{file} missing");
        }

        // One install config serves both roots
        assert_eq!(store.source_of::<InstallConfig>(), Some(AssetSource::Generated));
        let install_generations = store
            .generated()
            .iter()
            .filter(|name| **name == InstallConfig::NAME)
            .count();
        assert_eq!(install_generations, 1);
        assert_eq!(
            store.generated(),
            [
                InstallConfig::NAME,
                "Metadata",
                "Common Manifests",
                "Kubeadmin Password",
                "Tectonic Manifests",
            ]
        );
        let install_yaml = store.get::<InstallConfig>().unwrap().files()[0].text();
        let cluster_config = std::fs::read_to_string(temp.path().join("manifests/cluster-config.yaml")).unwrap();
        let embedded: serde_yaml::Value = serde_yaml::from_str(&cluster_config).unwrap();
        assert_eq!(embedded["data"]["install-config"].as_str(), Some(install_yaml.as_str()));

        // Not a root of this target and never on disk
        assert!(!temp.path().join(INSTALL_CONFIG_FILE).exists());
        assert!(report.purged.is_empty());
    }

    #[tokio::test]
    async fn later_target_consumes_earlier_outputs() {
        let temp = TempDir::new().unwrap();
        let registry = TargetRegistry::installer();

        let mut first = store_in(temp.path()).await;
        build_target(&mut first, registry.get("install-config").unwrap(), |_| {})
            .await
            .unwrap();
        assert!(temp.path().join(INSTALL_CONFIG_FILE).exists());

        let mut second = store_in(temp.path()).await;
        let report = build_target(&mut second, registry.get("manifests").unwrap(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.purged, vec![InstallConfig::NAME]);
        assert!(!temp.path().join(INSTALL_CONFIG_FILE).exists());
        assert_eq!(second.source_of::<InstallConfig>(), Some(AssetSource::OnDisk));
        assert!(temp.path().join("manifests/cluster-config.yaml").exists());
    }

    #[tokio::test]
    async fn ignition_configs_consume_manifests() {
        let temp = TempDir::new().unwrap();
        let registry = TargetRegistry::installer();

        let mut first = store_in(temp.path()).await;
        build_target(&mut first, registry.get("manifests").unwrap(), |_| {})
            .await
            .unwrap();

        let mut second = store_in(temp.path()).await;
        let report = build_target(&mut second, registry.get("ignition-configs").unwrap(), |_| {})
            .await
            .unwrap();

        assert!(report.purged.contains(&"Common Manifests"));
        assert!(!temp.path().join("manifests").exists());
        assert!(!temp.path().join("openshift").exists());
        for file in ["bootstrap.ign", "master.ign", "worker.ign", "metadata.json", "auth/kubeadmin-password"] {
            assert!(temp.path().join(file).exists(), "{file} missing");
        }
        // Metadata comes back from the state file, so the infra id is stable
        assert_eq!(
            first.get::<ClusterMetadata>().unwrap().metadata,
            second.get::<ClusterMetadata>().unwrap().metadata
        );
    }

    #[tokio::test]
    async fn failing_root_keeps_earlier_roots() {
        let temp = TempDir::new().unwrap();
        let registry = TargetRegistry::installer();
        std::fs::write(temp.path().join("cluster-state.json"), "{}").unwrap();

        let mut store = store_in(temp.path()).await;
        let err = build_target(&mut store, registry.get("cluster").unwrap(), |_| {})
            .await
            .err()
            .unwrap();

        assert!(matches!(err.root_cause(), ForgeError::ClusterExists { .. }));
        assert_eq!(err.fetch_chain(), vec!["Cluster"]);
        // Metadata, password and tfvars were written before Cluster failed
        assert!(temp.path().join("metadata.json").exists());
        assert!(temp.path().join("terraform.tfvars.json").exists());
        assert!(store.state().entry("Terraform Variables").is_some());
    }

    #[tokio::test]
    async fn cluster_without_provisioner_records_state() {
        let temp = TempDir::new().unwrap();
        let registry = TargetRegistry::installer();
        let mut store = store_in(temp.path()).await;

        build_target(&mut store, registry.get("cluster").unwrap(), |_| {})
            .await
            .unwrap();

        let state = std::fs::read_to_string(temp.path().join("cluster-state.json")).unwrap();
        let state: crate::installer::ClusterState = serde_json::from_str(&state).unwrap();
        assert_eq!(state.cluster_name, "forge");
        assert!(state.provisioner.is_none());
    }
}
