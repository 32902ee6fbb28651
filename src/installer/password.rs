//! Generated password for the temporary `kubeadmin` user

use super::random_string;
use crate::asset::{Asset, File, FileFetcher, GenerateContext, LoadableAsset, Parents, WritableAsset};
use crate::error::{ForgeError, ForgeResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

pub const PASSWORD_FILE: &str = "auth/kubeadmin-password";

const PASSWORD_ALPHABET: &[u8] = b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// `xxxxx-xxxxx-xxxxx-xxxxx`
#[derive(Debug, Default)]
pub struct KubeadminPassword {
    pub password: String,
    files: Vec<File>,
}

impl KubeadminPassword {
    /// Hex SHA-256 of the password, what the cluster stores
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.password.as_bytes()))
    }
}

fn is_well_formed(password: &str) -> bool {
    let groups: Vec<&str> = password.split('-').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| g.len() == 5 && g.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)))
}

#[async_trait]
impl Asset for KubeadminPassword {
    fn name(&self) -> &'static str {
        "Kubeadmin Password"
    }

    fn dependencies(&self) -> Vec<Box<dyn Asset>> {
        vec![]
    }

    async fn generate(&mut self, _cx: &GenerateContext, _parents: &Parents<'_>) -> ForgeResult<()> {
        let raw = random_string(20, PASSWORD_ALPHABET);
        let groups: Vec<&str> = (0..4).map(|i| &raw[i * 5..(i + 1) * 5]).collect();
        self.password = groups.join("-");
        self.files = vec![File::new(PASSWORD_FILE, self.password.clone())];
        Ok(())
    }

    fn as_writable(&self) -> Option<&dyn WritableAsset> {
        Some(self)
    }

    fn as_loadable(&mut self) -> Option<&mut dyn LoadableAsset> {
        Some(self)
    }
}

impl WritableAsset for KubeadminPassword {
    fn files(&self) -> &[File] {
        &self.files
    }
}

#[async_trait]
impl LoadableAsset for KubeadminPassword {
    async fn load(&mut self, fetcher: &dyn FileFetcher) -> ForgeResult<bool> {
        let Some(file) = fetcher.fetch_by_name(PASSWORD_FILE).await? else {
            return Ok(false);
        };

        let password = file.text().trim().to_string();
        if !is_well_formed(&password) {
            return Err(ForgeError::invalid_file(
                PASSWORD_FILE,
                "expected four dash-separated groups of five characters",
            ));
        }

        self.password = password;
        self.files = vec![file];
        Ok(true)
    }
}
