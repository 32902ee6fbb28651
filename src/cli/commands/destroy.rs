//! Destroy command - tear down the cluster and forget its assets

use crate::asset::{DiskFetcher, GenerateContext, LoadableAsset, MemoryFetcher};
use crate::cli::args::{DestroyArgs, DestroyTarget};
use crate::config::Config;
use crate::error::{ForgeError, ForgeResult};
use crate::installer::ClusterMetadata;
use crate::provision;
use crate::store::Store;
use crate::targets::TargetRegistry;
use crate::ui::{self, TaskSpinner, UiContext};
use std::path::Path;
use tracing::debug;

/// Execute the destroy command
pub async fn execute(
    args: DestroyArgs,
    dir: &Path,
    config: &Config,
    registry: &TargetRegistry,
) -> ForgeResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let DestroyTarget::Cluster = args.what;

    if !ctx.is_interactive() && !ctx.auto_yes() {
        return Err(ForgeError::ConfirmationRequired(
            "destroy cluster".to_string(),
        ));
    }

    let prompt = format!("Destroy the cluster created from {}?", dir.display());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::outro_warn(&ctx, "Nothing destroyed (pass --yes to skip this prompt)");
        return Ok(());
    }

    ui::intro(&ctx, "forge destroy cluster");
    let mut store = Store::open(GenerateContext::new(dir, config)).await?;

    run_destroy_command(&ctx, &store, dir, config).await?;

    let target = registry.get("cluster")?;
    for asset in target.roots() {
        store.destroy(asset.as_ref()).await?;
        ui::step_ok(&ctx, &format!("Removed {}", asset.name()));
    }
    store.destroy_state().await?;

    ui::outro_success(&ctx, "Cluster destroyed");
    Ok(())
}

async fn run_destroy_command(
    ctx: &UiContext,
    store: &Store,
    dir: &Path,
    config: &Config,
) -> ForgeResult<()> {
    let command = &config.provision.destroy_command;
    if command.is_empty() {
        ui::step_warn(ctx, "No provision.destroy_command configured, only local assets are removed");
        return Ok(());
    }

    let mut env = Vec::new();
    if let Some(metadata) = find_metadata(store, dir).await? {
        env.push(("FORGE_INFRA_ID", metadata.metadata.infra_id.clone()));
    } else {
        debug!("No cluster metadata found, running destroy command without FORGE_INFRA_ID");
    }

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Destroying infrastructure...");
    match provision::run(command, dir, &env).await {
        Ok(_) => {
            spinner.stop("Infrastructure destroyed");
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Destroy command failed");
            Err(e)
        }
    }
}

/// Metadata from the install directory, else from the state file
async fn find_metadata(store: &Store, dir: &Path) -> ForgeResult<Option<ClusterMetadata>> {
    let mut metadata = ClusterMetadata::default();
    if metadata.load(&DiskFetcher::new(dir)).await? {
        return Ok(Some(metadata));
    }
    if let Some(files) = store.state().entry("Metadata") {
        if metadata.load(&MemoryFetcher::new(files)).await? {
            return Ok(Some(metadata));
        }
    }
    Ok(None)
}
