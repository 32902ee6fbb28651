//! View command - inspect assets recorded by earlier runs
//!
//! Reads the state file only; nothing is generated.

use crate::cli::args::{OutputFormat, ViewArgs};
use crate::error::{ForgeError, ForgeResult};
use crate::store::StateFile;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ViewEntry<'a> {
    asset: &'a str,
    filename: &'a str,
    size: usize,
    on_disk: bool,
}

/// Execute the view command
pub async fn execute(args: ViewArgs, dir: &Path) -> ForgeResult<()> {
    let state = StateFile::load(dir).await?;

    if let Some(filename) = args.file {
        let (_, file) = state
            .find_file(&filename)
            .ok_or_else(|| ForgeError::FileNotInState(filename.clone()))?;
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&file.data)
            .and_then(|()| stdout.flush())
            .map_err(|e| ForgeError::io("writing to stdout", e))?;
        return Ok(());
    }

    let entries: Vec<ViewEntry<'_>> = state
        .assets
        .iter()
        .flat_map(|(asset, files)| {
            files.iter().map(move |f| ViewEntry {
                asset,
                filename: &f.filename,
                size: f.data.len(),
                on_disk: dir.join(&f.filename).exists(),
            })
        })
        .collect();

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, &format!("No assets recorded in {}", dir.display()));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&state, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.filename);
            }
        }
    }

    Ok(())
}

fn print_table(state: &StateFile, entries: &[ViewEntry<'_>]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Recorded assets");
    ui::key_value(&ctx, "written by", &format!("forge {}", state.version));
    println!();

    println!(
        "{:<28} {:<48} {:>8} {:<8}",
        style("ASSET").bold(),
        style("FILE").bold(),
        style("SIZE").bold(),
        style("ON DISK").bold()
    );
    println!("{}", "-".repeat(95));

    for entry in entries {
        let on_disk = if entry.on_disk {
            style("yes").green()
        } else {
            style("no").dim()
        };
        println!(
            "{:<28} {:<48} {:>8} {:<8}",
            entry.asset, entry.filename, entry.size, on_disk
        );
    }

    println!();
    println!("{} asset(s), {} file(s)", state.assets.len(), entries.len());
}
