//! File fetchers used by `LoadableAsset::load`
//!
//! Assets never touch the filesystem directly when loading; they ask a
//! fetcher for files by relative name or by a `<dir>/<glob>` pattern. The
//! install directory and a single state-file entry both implement the same
//! interface, so an asset's load logic serves both sources.

use super::file::{install_path, sort_files, File};
use crate::error::{ForgeError, ForgeResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use wildmatch::WildMatch;

/// Source of previously written asset files
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetch one file by its relative name. `None` means the file is absent.
    async fn fetch_by_name(&self, name: &str) -> ForgeResult<Option<File>>;

    /// Fetch every file matching `pattern`, sorted by filename.
    ///
    /// Wildcards (`*`, `?`) are honored in the final path component only.
    async fn fetch_by_pattern(&self, pattern: &str) -> ForgeResult<Vec<File>>;
}

/// Fetches files from the install directory
#[derive(Debug, Clone)]
pub struct DiskFetcher {
    directory: PathBuf,
}

impl DiskFetcher {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    async fn read(&self, name: &str) -> ForgeResult<Option<File>> {
        let path = install_path(&self.directory, name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(File::new(name, data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ForgeError::io(format!("reading {}", path.display()), e)),
        }
    }
}

#[async_trait]
impl FileFetcher for DiskFetcher {
    async fn fetch_by_name(&self, name: &str) -> ForgeResult<Option<File>> {
        self.read(name).await
    }

    async fn fetch_by_pattern(&self, pattern: &str) -> ForgeResult<Vec<File>> {
        let (dir, name_pattern) = split_pattern(pattern);
        let search_dir = match dir {
            Some(dir) => self.directory.join(dir),
            None => self.directory.clone(),
        };

        let mut entries = match fs::read_dir(&search_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(ForgeError::io(
                    format!("reading directory {}", search_dir.display()),
                    e,
                ))
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ForgeError::io(format!("listing {}", search_dir.display()), e))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !glob_match(name_pattern, &file_name) || !is_file(&entry.path()).await {
                continue;
            }
            let relative = match dir {
                Some(dir) => format!("{}/{}", dir, file_name),
                None => file_name,
            };
            if let Some(file) = self.read(&relative).await? {
                files.push(file);
            }
        }

        sort_files(&mut files);
        Ok(files)
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Serves the files recorded for one asset in the state file
#[derive(Debug, Clone, Copy)]
pub struct MemoryFetcher<'a> {
    files: &'a [File],
}

impl<'a> MemoryFetcher<'a> {
    pub fn new(files: &'a [File]) -> Self {
        Self { files }
    }
}

#[async_trait]
impl FileFetcher for MemoryFetcher<'_> {
    async fn fetch_by_name(&self, name: &str) -> ForgeResult<Option<File>> {
        Ok(self.files.iter().find(|f| f.filename == name).cloned())
    }

    async fn fetch_by_pattern(&self, pattern: &str) -> ForgeResult<Vec<File>> {
        let (dir, name_pattern) = split_pattern(pattern);
        let mut files: Vec<File> = self
            .files
            .iter()
            .filter(|f| {
                let (file_dir, file_name) = split_pattern(&f.filename);
                file_dir == dir && glob_match(name_pattern, file_name)
            })
            .cloned()
            .collect();
        sort_files(&mut files);
        Ok(files)
    }
}

/// Split `a/b/c*` into (`Some("a/b")`, `"c*"`)
fn split_pattern(pattern: &str) -> (Option<&str>, &str) {
    match pattern.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, pattern),
    }
}

/// Match a single path component against `*` and `?` wildcards
fn glob_match(pattern: &str, name: &str) -> bool {
    WildMatch::new(pattern).matches(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn glob_matches_wildcards() {
        assert!(glob_match("*", "anything.yaml"));
        assert!(glob_match("*.yaml", "cluster-config.yaml"));
        assert!(!glob_match("*.yaml", "cluster-dns.yml"));
        assert!(glob_match("99_*-secret.yaml", "99_kubeadmin-password-secret.yaml"));
        assert!(glob_match("master-?.ign", "master-0.ign"));
        assert!(!glob_match("master-?.ign", "master-10.ign"));
    }

    #[test]
    fn split_pattern_cases() {
        assert_eq!(split_pattern("manifests/*"), (Some("manifests"), "*"));
        assert_eq!(split_pattern("a/b/c*"), (Some("a/b"), "c*"));
        assert_eq!(split_pattern("*.ign"), (None, "*.ign"));
    }

    #[tokio::test]
    async fn disk_fetch_by_name_absent_is_none() {
        let temp = TempDir::new().unwrap();
        let fetcher = DiskFetcher::new(temp.path());
        assert!(fetcher.fetch_by_name("missing.yaml").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disk_fetch_by_pattern_sorted() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manifests");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("b.yaml"), "b").unwrap();
        std::fs::write(dir.join("a.yaml"), "a").unwrap();
        std::fs::write(dir.join("c.txt"), "c").unwrap();

        let fetcher = DiskFetcher::new(temp.path());
        let files = fetcher.fetch_by_pattern("manifests/*.yaml").await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["manifests/a.yaml", "manifests/b.yaml"]);

        // Directories are skipped
        let all = fetcher.fetch_by_pattern("manifests/*").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn disk_fetch_refuses_names_outside_directory() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("install");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(temp.path().join("secret"), "s").unwrap();

        let fetcher = DiskFetcher::new(&install);
        let err = fetcher.fetch_by_name("../secret").await.unwrap_err();
        assert!(matches!(err, ForgeError::UnsafePath(_)));
    }

    #[tokio::test]
    async fn disk_fetch_by_pattern_missing_dir() {
        let temp = TempDir::new().unwrap();
        let fetcher = DiskFetcher::new(temp.path());
        assert!(fetcher.fetch_by_pattern("openshift/*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_fetcher_filters_by_directory() {
        let files = vec![
            File::new("manifests/a.yaml", "a"),
            File::new("manifests/deep/b.yaml", "b"),
            File::new("metadata.json", "{}"),
        ];
        let fetcher = MemoryFetcher::new(&files);

        let found = fetcher.fetch_by_pattern("manifests/*").await.unwrap();
        assert_eq!(found, vec![File::new("manifests/a.yaml", "a")]);

        let root = fetcher.fetch_by_pattern("*.json").await.unwrap();
        assert_eq!(root.len(), 1);

        assert!(fetcher.fetch_by_name("metadata.json").await.unwrap().is_some());
        assert!(fetcher.fetch_by_name("nope").await.unwrap().is_none());
    }
}
