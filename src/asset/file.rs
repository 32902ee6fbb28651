//! Artifact files produced by writable assets

use crate::error::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A single artifact: a path relative to the install directory and its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Path relative to the install directory, always `/`-separated
    pub filename: String,

    /// File contents
    #[serde(with = "serde_b64")]
    pub data: Vec<u8>,
}

impl File {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Contents as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Insert `file`, replacing any existing entry with the same filename.
///
/// Replacement keeps the original position so composed artifacts stay stable.
pub fn upsert(files: &mut Vec<File>, file: File) {
    match files.iter_mut().find(|f| f.filename == file.filename) {
        Some(existing) => *existing = file,
        None => files.push(file),
    }
}

/// Reject filenames that are empty, absolute or step outside their root
pub fn check_relative(filename: &str) -> ForgeResult<()> {
    let contained = Path::new(filename)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if filename.is_empty() || !contained {
        return Err(ForgeError::UnsafePath(filename.to_string()));
    }
    Ok(())
}

/// `directory/filename`, only for filenames that stay inside `directory`
pub fn install_path(directory: &Path, filename: &str) -> ForgeResult<PathBuf> {
    check_relative(filename)?;
    Ok(directory.join(filename))
}

/// Sort files by filename
pub fn sort_files(files: &mut [File]) {
    files.sort_by(|a, b| a.filename.cmp(&b.filename));
}

/// Compare two file sets ignoring order
pub fn same_files(a: &[File], b: &[File]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&File> = a.iter().collect();
    let mut b: Vec<&File> = b.iter().collect();
    a.sort_by(|x, y| x.filename.cmp(&y.filename));
    b.sort_by(|x, y| x.filename.cmp(&y.filename));
    a == b
}

/// Serde bridge for `Vec<u8>` as standard base64.
mod serde_b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
