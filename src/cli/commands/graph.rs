//! Graph command - emit the asset dependency graph

use crate::cli::args::GraphArgs;
use crate::error::{ForgeError, ForgeResult};
use crate::graph::render_dot;
use crate::targets::TargetRegistry;
use crate::ui::{self, UiContext};
use tokio::fs;

/// Execute the graph command
pub async fn execute(args: GraphArgs, registry: &TargetRegistry) -> ForgeResult<()> {
    let dot = render_dot(registry);

    match args.output {
        Some(path) => {
            fs::write(&path, &dot)
                .await
                .map_err(|e| ForgeError::io(format!("writing graph to {}", path.display()), e))?;
            let ctx = UiContext::detect();
            ui::step_ok_detail(&ctx, "Graph written", &path.display().to_string());
        }
        None => print!("{}", dot),
    }

    Ok(())
}
