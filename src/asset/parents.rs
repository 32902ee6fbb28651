//! Resolved view of an asset's declared dependencies

use super::{Asset, AssetId};
use crate::error::{ForgeError, ForgeResult};
use std::collections::HashMap;

/// The already-resolved dependencies handed to [`Asset::generate`].
///
/// Only the dependencies the asset declared are present; asking for any
/// other kind is a contract violation and returns
/// [`ForgeError::UndeclaredParent`].
pub struct Parents<'a> {
    owner: &'static str,
    resolved: HashMap<AssetId, &'a dyn Asset>,
}

impl<'a> Parents<'a> {
    /// Build a view for `owner` from its resolved dependencies
    pub fn new(owner: &'static str, resolved: impl IntoIterator<Item = &'a dyn Asset>) -> Self {
        let resolved = resolved
            .into_iter()
            .map(|asset| (AssetId::of_val(asset), asset))
            .collect();
        Self { owner, resolved }
    }

    /// Typed access to a resolved dependency
    pub fn get<A: Asset + 'static>(&self) -> ForgeResult<&'a A> {
        self.resolved
            .get(&AssetId::of::<A>())
            .copied()
            .and_then(|asset| asset.as_any().downcast_ref::<A>())
            .ok_or_else(|| ForgeError::UndeclaredParent {
                asset: self.owner.to_string(),
                parent: short_type_name::<A>().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

fn short_type_name<A>() -> &'static str {
    let full = std::any::type_name::<A>();
    full.rsplit("::").next().unwrap_or(full)
}
