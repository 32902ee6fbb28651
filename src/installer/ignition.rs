//! Ignition configs: `bootstrap.ign`, `master.ign`, `worker.ign`
//!
//! The bootstrap config carries every manifest as an embedded data URL.
//! Master and worker configs are pointers to the machine-config server.

use super::{load_json, to_json_file, InstallConfig, Manifests, Tectonic};
use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::error::ForgeResult;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

const IGNITION_VERSION: &str = "3.2.0";

/// Where embedded manifests land on the bootstrap host
const BOOTSTRAP_ROOT: &str = "/opt/forge";

/// Port of the machine-config server on the internal API endpoint
const MCS_PORT: u16 = 22623;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnitionConfig {
    pub ignition: IgnitionMeta,
    #[serde(default, skip_serializing_if = "Passwd::is_empty")]
    pub passwd: Passwd,
    #[serde(default, skip_serializing_if = "Storage::is_empty")]
    pub storage: Storage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnitionMeta {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigReference {
    pub merge: Vec<Resource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Passwd {
    pub users: Vec<PasswdUser>,
}

impl Passwd {
    fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswdUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    pub files: Vec<IgnitionFile>,
}

impl Storage {
    fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnitionFile {
    pub path: String,
    pub mode: u32,
    pub overwrite: bool,
    pub contents: Resource,
}

impl IgnitionConfig {
    pub fn new() -> Self {
        Self {
            ignition: IgnitionMeta {
                version: IGNITION_VERSION.to_string(),
                config: None,
            },
            ..Default::default()
        }
    }

    /// Config that only merges the config served at `source`
    pub fn pointer(source: impl Into<String>) -> Self {
        let mut config = Self::new();
        config.ignition.config = Some(ConfigReference {
            merge: vec![Resource {
                source: source.into(),
            }],
        });
        config
    }

    /// Authorize `key` for the `core` user
    pub fn add_ssh_key(&mut self, key: &str) {
        match self.passwd.users.iter_mut().find(|u| u.name == "core") {
            Some(user) => user.ssh_authorized_keys.push(key.to_string()),
            None => self.passwd.users.push(PasswdUser {
                name: "core".to_string(),
                ssh_authorized_keys: vec![key.to_string()],
            }),
        }
    }

    /// Embed `data` at `path`, replacing an earlier file at the same path
    pub fn add_file(&mut self, path: impl Into<String>, data: &[u8]) {
        let file = IgnitionFile {
            path: path.into(),
            mode: 0o644,
            overwrite: true,
            contents: Resource {
                source: format!(
                    "data:text/plain;charset=utf-8;base64,{}",
                    STANDARD.encode(data)
                ),
            },
        };
        match self.storage.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.storage.files.push(file),
        }
    }
}

/// Bootstrap node config embedding every generated manifest
#[derive(Debug, Default)]
pub struct BootstrapIgnition {
    pub config: IgnitionConfig,
    files: Vec<File>,
}

impl BootstrapIgnition {
    const FILE: &'static str = "bootstrap.ign";

    fn embed(config: &mut IgnitionConfig, files: &[File]) {
        for file in files {
            config.add_file(format!("{}/{}", BOOTSTRAP_ROOT, file.filename), &file.data);
        }
    }
}

#[async_trait]
impl Asset for BootstrapIgnition {
    fn name(&self) -> &'static str {
        "Bootstrap Ignition Config"
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![
            Box::new(InstallConfig::default()),
            Box::new(Manifests::default()),
            Box::new(Tectonic::default()),
        ]
    }

    async fn generate(&mut self, _cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()> {
        let install = parents.get::<InstallConfig>()?;
        let manifests = parents.get::<Manifests>()?;
        let tectonic = parents.get::<Tectonic>()?;

        let mut config = IgnitionConfig::new();
        if let Some(key) = &install.config.ssh_key {
            config.add_ssh_key(key);
        }
        Self::embed(&mut config, install.files());
        Self::embed(&mut config, manifests.files());
        Self::embed(&mut config, tectonic.files());

        self.files = vec![to_json_file(Self::FILE, &config)?];
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

impl WritableAsset for BootstrapIgnition {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for BootstrapIgnition {
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        match load_json::<IgnitionConfig>(fetcher, Self::FILE).await? {
            Some((config, file)) => {
                self.config = config;
                self.files = vec![file];
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Pointer config for one machine role
macro_rules! pointer_ignition {
    ($(#[$doc:meta])* $ty:ident, $name:literal, $role:literal) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $ty {
            pub config: IgnitionConfig,
            files: Vec<File>,
        }

        impl $ty {
            const FILE: &'static str = concat!($role, ".ign");
        }

        #[async_trait]
        impl Asset for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn dependencies(&self) -> Vec<Box<dyn Asset>> {
                vec![Box::new(InstallConfig::default())]
            }

            async fn generate(&mut self, _cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()> {
                let install = &parents.get::<InstallConfig>()?.config;
                let source = format!(
                    "https://api-int.{}:{}/config/{}",
                    install.cluster_domain(),
                    MCS_PORT,
                    $role
                );
                let mut config = IgnitionConfig::pointer(source);
                if let Some(key) = &install.ssh_key {
                    config.add_ssh_key(key);
                }

                self.files = vec![to_json_file(Self::FILE, &config)?];
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

        impl WritableAsset for $ty {
            fn files(&self) -> &[File] {
                &self.files
            }
        }

        #[async_trait]
        impl LoadableAsset for $ty {
            async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
                match load_json::<IgnitionConfig>(fetcher, Self::FILE).await? {
                    Some((config, file)) => {
                        self.config = config;
                        self.files = vec![file];
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    };
}

pointer_ignition!(
    /// `master.ign`
    MasterIgnition,
    "Master Ignition Config",
    "master"
);
pointer_ignition!(
    /// `worker.ign`
    WorkerIgnition,
    "Worker Ignition Config",
    "worker"
);
