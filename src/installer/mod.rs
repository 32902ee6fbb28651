//! Installer asset catalog
//!
//! The concrete assets behind the `create` targets. Each one is a leaf
//! implementation of the [`Asset`](crate::asset::Asset) contract; the store
//! decides whether it is loaded, restored from the state file or generated.
//!
//! ```text
//! InstallConfig       <- ClusterMetadata, Manifests, Tectonic, *Ignition
//! ClusterMetadata     <- Manifests, TerraformVariables, Cluster
//! KubeadminPassword   <- Tectonic
//! Manifests, Tectonic <- BootstrapIgnition
//! Bootstrap/Master    <- TerraformVariables <- Cluster
//! ```

mod cluster;
mod ignition;
mod install_config;
mod manifests;
mod metadata;
mod password;
mod tectonic;
mod tfvars;

pub use cluster::{Cluster, ClusterState, CLUSTER_STATE_FILE};
pub use ignition::{BootstrapIgnition, IgnitionConfig, MasterIgnition, WorkerIgnition};
pub use install_config::{InstallConfig, InstallConfigData, INSTALL_CONFIG_FILE};
pub use manifests::Manifests;
pub use metadata::{ClusterMetadata, MetadataData, METADATA_FILE};
pub use password::{KubeadminPassword, PASSWORD_FILE};
pub use tectonic::Tectonic;
pub use tfvars::{TerraformVariables, TFVARS_FILE};

use crate::asset::{File, FileFetcher};
use crate::error::{ForgeError, ForgeResult};
use rand::Rng;
use serde::de::DeserializeOwned;

const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random string over `alphabet`, each character drawn uniformly
pub(crate) fn random_string(len: usize, alphabet: &[u8]) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Fetch one file and parse it as JSON.
///
/// `Ok(None)` when the file is absent; a parse failure is an error because
/// the file exists but cannot be used.
pub(crate) async fn load_json<T: DeserializeOwned>(
    fetcher: &dyn FileFetcher,
    filename: &str,
) -> ForgeResult<Option<(T, File)>> {
    let Some(file) = fetcher.fetch_by_name(filename).await? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&file.data)
        .map_err(|e| ForgeError::invalid_file(filename, e))?;
    Ok(Some((value, file)))
}

/// Pretty JSON with a trailing newline, the on-disk format of JSON assets
pub(crate) fn to_json_file(filename: &str, value: &impl serde::Serialize) -> ForgeResult<File> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    Ok(File::new(filename, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_string_has_requested_shape() {
        let s = random_string(40, LOWER_ALNUM);
        assert_eq!(s.len(), 40);
        assert!(s.bytes().all(|b| LOWER_ALNUM.contains(&b)));
        assert_ne!(random_string(16, LOWER_ALNUM), random_string(16, LOWER_ALNUM));
    }

    #[test]
    fn every_position_covers_the_alphabet() {
        let mut seen: Vec<HashSet<u8>> = vec![HashSet::new(); 20];
        for _ in 0..5000 {
            for (i, b) in random_string(20, LOWER_ALNUM).bytes().enumerate() {
                seen[i].insert(b);
            }
        }

        for (i, chars) in seen.iter().enumerate() {
            assert_eq!(chars.len(), LOWER_ALNUM.len(), "position {i} is biased");
        }
    }
}
