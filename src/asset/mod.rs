//! The asset contract
//!
//! Every artifact the installer produces is an [`Asset`]: a node that
//! declares its dependencies and knows how to generate its own content from
//! them. Optional capabilities are exposed through [`Asset::as_writable`]
//! (the asset has files to persist) and [`Asset::as_loadable`] (the asset can
//! be rehydrated from previously written files).

pub mod fetcher;
pub mod file;
pub mod parents;
pub mod persist;

pub use fetcher::{DiskFetcher, FileFetcher, MemoryFetcher};
pub use file::{upsert, File};
pub use parents::Parents;
pub use persist::{delete_from_disk, persist_to_file};

use crate::config::{Config, InstallDefaults, ProvisionConfig};
use crate::error::ForgeResult;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::fmt;
use std::path::{Path, PathBuf};

/// Upcast helper so resolved assets can be downcast to their concrete type
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A node in the dependency graph
#[async_trait]
pub trait Asset: AsAny + Send + Sync {
    /// Human-readable name, also the key in the state file
    fn name(&self) -> &'static str;

    /// Fresh instances of every asset this one needs before it can generate
    fn dependencies(&self) -> Vec<Box<dyn Asset>>;

    /// Produce the asset's content from its resolved dependencies
    async fn generate(&mut self, cx: &GenerateContext, parents: &Parents<'_>) -> ForgeResult<()>;

    /// Files to persist, if the asset has any
    fn as_writable(&self) -> Option<&dyn WritableAsset> {
        None
    }

    /// Rehydration from previously written files, if supported
    fn as_loadable(&mut self) -> Option<&mut dyn LoadableAsset> {
        None
    }
}

/// Capability: the asset produces files under the install directory
pub trait WritableAsset {
    fn files(&self) -> &[File];
}

/// Capability: the asset can be rebuilt purely from files
#[async_trait]
pub trait LoadableAsset: Send {
    /// Returns `Ok(false)` when the expected files are absent, and an error
    /// only when files exist but cannot be used.
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool>;
}

/// Stable identity of an asset kind, used as the memoization key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(TypeId);

impl AssetId {
    pub fn of<A: Asset + 'static>() -> Self {
        Self(TypeId::of::<A>())
    }

    pub fn of_val(asset: &dyn Asset) -> Self {
        Self(asset.as_any().type_id())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({:?})", self.0)
    }
}

/// Files an asset currently holds (empty for non-writable assets)
pub fn files_of(asset: &dyn Asset) -> &[File] {
    asset.as_writable().map(|w| w.files()).unwrap_or(&[])
}

/// Settings handed to every `generate` call
#[derive(Debug, Clone)]
pub struct GenerateContext {
    /// Install directory the assets are written to
    pub directory: PathBuf,

    /// Defaults used when no install-config.yaml is supplied
    pub install: InstallDefaults,

    /// External provisioning commands
    pub provision: ProvisionConfig,
}

impl GenerateContext {
    pub fn new(directory: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            directory: directory.into(),
            install: config.install.clone(),
            provision: config.provision.clone(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    #[async_trait]
    impl Asset for Plain {
        fn name(&self) -> &'static str {
            "Plain"
        }

        fn dependencies(&self) -> Vec<Box<dyn Asset>> {
            vec![]
        }

        async fn generate(&mut self, _: &GenerateContext, _: &Parents<'_>) -> ForgeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn asset_id_matches_concrete_type() {
        let boxed: Box<dyn Asset> = Box::new(Plain);
        assert_eq!(AssetId::of_val(boxed.as_ref()), AssetId::of::<Plain>());
    }

    #[test]
    fn non_writable_has_no_files() {
        assert!(files_of(&Plain).is_empty());
    }
}
