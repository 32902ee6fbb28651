//! Asset store: dependency resolution, memoization and caching
//!
//! The store resolves a requested asset by walking its dependency graph in
//! post-order. Each distinct asset kind is resolved at most once per store,
//! so shared dependencies are computed a single time no matter how many
//! dependents need them.
//!
//! For every asset, in order of preference:
//!
//! | Source | When |
//! |--------|------|
//! | On disk | `load` finds the asset's files in the install directory |
//! | State file | the previous run recorded it and no dependency changed |
//! | Generated | neither of the above |
//!
//! Traversal is iterative over an arena of nodes. The `Resolving` marker is
//! the cycle detector: entering a node that is still resolving means it is
//! on the current path.

pub mod state;

pub use state::{StateFile, STATE_FILE_NAME};

use crate::asset::{
    delete_from_disk, files_of, Asset, AssetId, DiskFetcher, File, GenerateContext,
    MemoryFetcher, Parents,
};
use crate::error::{ForgeError, ForgeResult};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Resolution status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Unresolved,
    Resolving,
    Resolved,
    Failed,
}

/// Where a resolved asset's content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Generated,
    OnDisk,
    StateFile,
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Generated => "generated",
            Self::OnDisk => "on disk",
            Self::StateFile => "state file",
        };
        write!(f, "{}", s)
    }
}

struct Node {
    /// `None` only while the asset is being loaded or generated
    asset: Option<Box<dyn Asset>>,
    name: &'static str,
    status: Status,
    deps: Vec<usize>,
    source: Option<AssetSource>,
    /// Content differs from what the state file recorded
    dirty: bool,
    /// Loaded from the install directory in this run
    present_on_disk: bool,
}

impl Node {
    fn new(asset: Box<dyn Asset>) -> Self {
        Self {
            name: asset.name(),
            asset: Some(asset),
            status: Status::Unresolved,
            deps: Vec::new(),
            source: None,
            dirty: false,
            present_on_disk: false,
        }
    }
}

enum Step {
    Enter(usize),
    Exit(usize),
}

/// Memoizing resolver for assets in one install directory
pub struct Store {
    context: GenerateContext,
    nodes: Vec<Node>,
    index: HashMap<AssetId, usize>,
    state: StateFile,
    /// Names of assets generated by this store, in order
    generated: Vec<&'static str>,
}

impl Store {
    /// Open the store for the install directory named by `context`,
    /// reading the state file left by earlier runs.
    pub async fn open(context: GenerateContext) -> ForgeResult<Self> {
        let state = StateFile::load(context.directory()).await?;
        Ok(Self {
            context,
            nodes: Vec::new(),
            index: HashMap::new(),
            state,
            generated: Vec::new(),
        })
    }

    /// Install directory
    pub fn directory(&self) -> &Path {
        self.context.directory()
    }

    /// State recorded by previous runs, merged with this run after `save_state`
    pub fn state(&self) -> &StateFile {
        &self.state
    }

    /// Resolve `asset` and everything it depends on.
    ///
    /// Returns the store's instance, which is the same for every request of
    /// the same asset kind.
    pub async fn fetch(&mut self, asset: Box<dyn Asset>) -> ForgeResult<&dyn Asset> {
        let root = self.intern(asset);
        self.resolve(root).await?;
        self.nodes[root]
            .asset
            .as_deref()
            .ok_or_else(|| ForgeError::Internal(format!("{} missing after fetch", self.nodes[root].name)))
    }

    /// Assets generated rather than loaded, in generation order
    pub fn generated(&self) -> &[&'static str] {
        &self.generated
    }

    /// Typed access to a resolved asset
    pub fn get<A: Asset + 'static>(&self) -> Option<&A> {
        let node = self.node::<A>()?;
        if node.status != Status::Resolved {
            return None;
        }
        node.asset.as_deref()?.as_any().downcast_ref::<A>()
    }

    /// Resolution status of an asset kind
    pub fn status_of<A: Asset + 'static>(&self) -> Status {
        self.node::<A>().map_or(Status::Unresolved, |n| n.status)
    }

    /// Where a resolved asset came from
    pub fn source_of<A: Asset + 'static>(&self) -> Option<AssetSource> {
        self.node::<A>().and_then(|n| n.source)
    }

    fn node<A: Asset + 'static>(&self) -> Option<&Node> {
        self.index.get(&AssetId::of::<A>()).map(|&i| &self.nodes[i])
    }

    fn intern(&mut self, asset: Box<dyn Asset>) -> usize {
        let id = AssetId::of_val(asset.as_ref());
        if let Some(&i) = self.index.get(&id) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(Node::new(asset));
        self.index.insert(id, i);
        i
    }

    async fn resolve(&mut self, root: usize) -> ForgeResult<()> {
        let mut stack = vec![Step::Enter(root)];
        // Nodes currently marked Resolving, outermost first
        let mut path: Vec<usize> = Vec::new();

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(i) => match self.nodes[i].status {
                    Status::Resolved => {}
                    Status::Failed => {
                        let err = ForgeError::PreviouslyFailed {
                            name: self.nodes[i].name.to_string(),
                        };
                        return Err(self.unwind(&path, err));
                    }
                    Status::Resolving => {
                        let start = path.iter().position(|&p| p == i).unwrap_or(0);
                        let chain = path[start..]
                            .iter()
                            .chain(std::iter::once(&i))
                            .map(|&p| self.nodes[p].name)
                            .collect::<Vec<_>>()
                            .join(" -> ");
                        return Err(self.unwind(&path, ForgeError::DependencyCycle { chain }));
                    }
                    Status::Unresolved => {
                        self.nodes[i].status = Status::Resolving;
                        path.push(i);

                        let declared = match self.nodes[i].asset.as_deref() {
                            Some(asset) => asset.dependencies(),
                            None => {
                                let name = self.nodes[i].name;
                                return Err(self.unwind(
                                    &path,
                                    ForgeError::Internal(format!("{} has no instance", name)),
                                ));
                            }
                        };
                        let deps: Vec<usize> =
                            declared.into_iter().map(|d| self.intern(d)).collect();

                        stack.push(Step::Exit(i));
                        stack.extend(deps.iter().rev().map(|&d| Step::Enter(d)));
                        self.nodes[i].deps = deps;
                    }
                },
                Step::Exit(i) => {
                    path.pop();
                    match self.load_or_generate(i).await {
                        Ok(()) => self.nodes[i].status = Status::Resolved,
                        Err(e) => {
                            self.nodes[i].status = Status::Failed;
                            let err = ForgeError::fetch(self.nodes[i].name, e);
                            return Err(self.unwind(&path, err));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Mark every node on `path` failed and wrap `err` with their names
    fn unwind(&mut self, path: &[usize], mut err: ForgeError) -> ForgeError {
        for &i in path.iter().rev() {
            self.nodes[i].status = Status::Failed;
            err = ForgeError::fetch(self.nodes[i].name, err);
        }
        err
    }

    async fn load_or_generate(&mut self, i: usize) -> ForgeResult<()> {
        let name = self.nodes[i].name;
        let parents_dirty = self.nodes[i].deps.iter().any(|&d| self.nodes[d].dirty);

        let mut asset = self.nodes[i]
            .asset
            .take()
            .ok_or_else(|| ForgeError::Internal(format!("{} is already being resolved", name)))?;
        let result = self.populate(i, asset.as_mut(), parents_dirty).await;
        let files = files_of(asset.as_ref()).to_vec();
        self.nodes[i].asset = Some(asset);
        let source = result?;

        let dirty = match source {
            AssetSource::StateFile => false,
            AssetSource::OnDisk => !self.state.matches(name, &files),
            AssetSource::Generated => parents_dirty || !self.state.matches(name, &files),
        };

        if source == AssetSource::Generated {
            self.generated.push(name);
        }
        let node = &mut self.nodes[i];
        node.source = Some(source);
        node.dirty = dirty;
        node.present_on_disk = source == AssetSource::OnDisk;
        Ok(())
    }

    async fn populate(
        &self,
        i: usize,
        asset: &mut dyn Asset,
        parents_dirty: bool,
    ) -> ForgeResult<AssetSource> {
        let name = asset.name();

        if let Some(loadable) = asset.as_loadable() {
            if loadable.load(&DiskFetcher::new(self.directory())).await? {
                if parents_dirty {
                    warn!(
                        "Using {} from the install directory although one of its dependencies changed",
                        name
                    );
                }
                debug!("Loading {} from install directory", name);
                return Ok(AssetSource::OnDisk);
            }

            match self.state.entry(name) {
                Some(_) if parents_dirty => {
                    debug!("Ignoring {} in state file, a dependency changed", name);
                }
                Some(files) => {
                    if loadable.load(&MemoryFetcher::new(files)).await? {
                        debug!("Loading {} from state file", name);
                        return Ok(AssetSource::StateFile);
                    }
                }
                None => {}
            }
        }

        let parents = Parents::new(
            name,
            self.nodes[i]
                .deps
                .iter()
                .filter_map(|&d| self.nodes[d].asset.as_deref()),
        );
        debug!("Generating {}", name);
        asset.generate(&self.context, &parents).await?;
        Ok(AssetSource::Generated)
    }

    /// Record every resolved asset in the state file and write it.
    ///
    /// Entries from earlier runs that were not touched are kept.
    pub async fn save_state(&mut self) -> ForgeResult<()> {
        for node in &self.nodes {
            if node.status != Status::Resolved {
                continue;
            }
            if let Some(asset) = node.asset.as_deref() {
                self.state.insert(node.name, files_of(asset).to_vec());
            }
        }
        self.state.version = env!("CARGO_PKG_VERSION").to_string();
        self.state.save(self.context.directory()).await
    }

    /// Delete the on-disk files of assets that were consumed from the
    /// install directory in this run, except for `preserved`.
    ///
    /// Returns the names of the purged assets.
    pub async fn purge(&mut self, preserved: &[AssetId]) -> ForgeResult<Vec<&'static str>> {
        let mut purged = Vec::new();
        let directory = self.context.directory().to_path_buf();

        for (id, &i) in &self.index {
            let node = &self.nodes[i];
            if !node.present_on_disk || preserved.contains(id) {
                continue;
            }
            if let Some(asset) = node.asset.as_deref() {
                info!("Consuming {} from target directory", node.name);
                delete_from_disk(files_of(asset), &directory).await?;
                purged.push(node.name);
            }
        }

        for name in &purged {
            if let Some(node) = self.nodes.iter_mut().find(|n| n.name == *name) {
                node.present_on_disk = false;
            }
        }

        purged.sort_unstable();
        Ok(purged)
    }

    /// Remove one asset's files from the install directory.
    ///
    /// Uses the resolved instance when there is one, otherwise the state
    /// file entry; unknown assets are a no-op.
    pub async fn destroy(&mut self, asset: &dyn Asset) -> ForgeResult<()> {
        let resolved = self
            .index
            .get(&AssetId::of_val(asset))
            .copied()
            .filter(|&i| self.nodes[i].status == Status::Resolved);

        let files: Vec<File> = match resolved {
            Some(i) => self.nodes[i]
                .asset
                .as_deref()
                .map(|a| files_of(a).to_vec())
                .unwrap_or_default(),
            None => match self.state.entry(asset.name()) {
                Some(files) => files.to_vec(),
                None => {
                    debug!("Nothing recorded for {}, skipping", asset.name());
                    return Ok(());
                }
            },
        };

        delete_from_disk(&files, self.context.directory()).await?;
        if let Some(i) = resolved {
            self.nodes[i].present_on_disk = false;
        }
        info!("Destroyed {}", asset.name());
        Ok(())
    }

    /// Remove the state file so the next run starts from a clean cache
    pub async fn destroy_state(&mut self) -> ForgeResult<()> {
        if StateFile::remove(self.context.directory()).await? {
            debug!("Removed {}", StateFile::path(self.context.directory()).display());
        }
        self.state = StateFile::default();
        Ok(())
    }
}
