//! Create command - build a target's assets in the install directory

use crate::asset::GenerateContext;
use crate::cli::args::CreateArgs;
use crate::config::Config;
use crate::error::{ForgeError, ForgeResult};
use crate::installer::PASSWORD_FILE;
use crate::store::Store;
use crate::targets::{build_target, TargetRegistry};
use crate::ui::{self, FetchProgress, UiContext};
use std::path::Path;
use tokio::fs;

/// Execute the create command
pub async fn execute(
    args: CreateArgs,
    dir: &Path,
    config: &Config,
    registry: &TargetRegistry,
) -> ForgeResult<()> {
    let ctx = UiContext::detect();
    let target = registry.get(&args.target)?;

    ui::intro(&ctx, &format!("forge create {}", target.name));

    fs::create_dir_all(dir)
        .await
        .map_err(|e| ForgeError::io(format!("creating install directory {}", dir.display()), e))?;

    let mut store = Store::open(GenerateContext::new(dir, config)).await?;
    let mut progress = FetchProgress::new(&ctx, target.name, target.roots().len());
    let result = build_target(&mut store, target, |name| progress.advance(name)).await;
    progress.finish();
    let report = result?;

    ui::section(&ctx, "Written");
    for file in &report.written {
        ui::step_ok(&ctx, file);
    }
    ui::remark(
        &ctx,
        &format!("Generated {} asset(s) in this run", store.generated().len()),
    );
    for name in &report.purged {
        ui::remark(&ctx, &format!("Consumed {} from {}", name, dir.display()));
    }

    if report.written.iter().any(|f| f == PASSWORD_FILE) {
        ui::step_info(
            &ctx,
            &format!(
                "Log in as kubeadmin with the password in {}",
                dir.join(PASSWORD_FILE).display()
            ),
        );
    }

    ui::outro_success(&ctx, &format!("Created {}", target.name));
    Ok(())
}
