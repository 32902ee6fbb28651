//! Writing and removing asset files under the install directory

use super::file::{check_relative, install_path};
use super::{files_of, Asset, File};
use crate::error::{ForgeError, ForgeResult};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Write every file of `asset` under `directory`, creating parent
/// directories as needed. Non-writable assets are a no-op.
pub async fn persist_to_file(asset: &dyn Asset, directory: &Path) -> ForgeResult<()> {
    let files = files_of(asset);
    for file in files {
        check_relative(&file.filename)?;
    }
    for file in files {
        write_file(file, directory).await?;
    }
    Ok(())
}

async fn write_file(file: &File, directory: &Path) -> ForgeResult<()> {
    let path = install_path(directory, &file.filename)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ForgeError::Persist {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    fs::write(&path, &file.data)
        .await
        .map_err(|e| ForgeError::Persist {
            path: path.clone(),
            source: e,
        })?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Remove `files` from `directory`, then prune directories they leave empty.
///
/// Files that are already gone are ignored. Nothing is removed when any
/// filename would leave `directory`.
pub async fn delete_from_disk(files: &[File], directory: &Path) -> ForgeResult<()> {
    for file in files {
        check_relative(&file.filename)?;
    }
    for file in files {
        let path = directory.join(&file.filename);
        match fs::remove_file(&path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ForgeError::io(format!("removing {}", path.display()), e));
            }
        }
        prune_empty_parents(&path, directory).await;
    }
    Ok(())
}

/// Walk upward from `path` removing empty directories, stopping at `root`
async fn prune_empty_parents(path: &Path, root: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk
        if fs::remove_dir(dir).await.is_err() {
            break;
        }
        current = dir.parent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{GenerateContext, Parents, WritableAsset};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Docs {
        files: Vec<File>,
    }

    #[async_trait]
    impl Asset for Docs {
        fn name(&self) -> &'static str {
            "Docs"
        }
        fn dependencies(&self) -> Vec<Box<dyn Asset>> {
            vec![]
        }
        async fn generate(&mut self, _: &GenerateContext, _: &Parents<'_>) -> ForgeResult<()> {
            Ok(())
        }
        fn as_writable(&self) -> Option<&dyn WritableAsset> {
            Some(self)
        }
    }

    impl WritableAsset for Docs {
        fn files(&self) -> &[File] {
            &self.files
        }
    }

    #[tokio::test]
    async fn persist_creates_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let docs = Docs {
            files: vec![
                File::new("auth/kubeconfig", "config"),
                File::new("metadata.json", "{}"),
            ],
        };

        persist_to_file(&docs, temp.path()).await.unwrap();

        let written = std::fs::read_to_string(temp.path().join("auth/kubeconfig")).unwrap();
        assert_eq!(written, "config");
        assert!(temp.path().join("metadata.json").exists());
    }

    #[tokio::test]
    async fn delete_prunes_empty_dirs_only() {
        let temp = TempDir::new().unwrap();
        let docs = Docs {
            files: vec![File::new("manifests/a.yaml", "a")],
        };
        persist_to_file(&docs, temp.path()).await.unwrap();
        std::fs::create_dir_all(temp.path().join("auth")).unwrap();
        std::fs::write(temp.path().join("auth/keep"), "k").unwrap();

        delete_from_disk(
            &[File::new("manifests/a.yaml", ""), File::new("auth/missing", "")],
            temp.path(),
        )
        .await
        .unwrap();

        assert!(!temp.path().join("manifests").exists());
        assert!(temp.path().join("auth/keep").exists());
        assert!(temp.path().exists());
    }

    #[tokio::test]
    async fn delete_refuses_paths_outside_directory() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("install");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(install.join("a.txt"), "a").unwrap();
        let victim = temp.path().join("victim.txt");
        std::fs::write(&victim, "keep").unwrap();

        let files = [
            File::new("a.txt", ""),
            File::new(victim.to_string_lossy(), ""),
            File::new("../victim.txt", ""),
        ];
        let err = delete_from_disk(&files, &install).await.unwrap_err();

        assert!(matches!(err, ForgeError::UnsafePath(_)));
        assert!(victim.exists());
        assert!(install.join("a.txt").exists());
    }

    #[tokio::test]
    async fn persist_refuses_absolute_filenames() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside.txt");
        let docs = Docs {
            files: vec![File::new(outside.to_string_lossy(), "x")],
        };

        assert!(persist_to_file(&docs, &temp.path().join("install")).await.is_err());
        assert!(!outside.exists());
    }
}
