//! DOT rendering of the asset graph
//!
//! Only `dependencies()` is consulted; nothing is fetched or generated.

use crate::asset::{Asset, AssetId};
use crate::targets::TargetRegistry;
use std::collections::HashSet;
use std::fmt::Write;

/// Render every target and the assets reachable from it as a `digraph`
pub fn render_dot(registry: &TargetRegistry) -> String {
    let mut out = String::from("digraph forge {\n");
    let mut edges: Vec<(String, String)> = Vec::new();
    let mut visited: HashSet<AssetId> = HashSet::new();

    for target in registry.iter() {
        let _ = writeln!(out, "  {} [shape=box];", quote(target.name));
        let mut stack: Vec<Box<dyn Asset>> = Vec::new();

        for root in target.roots() {
            push_edge(&mut edges, target.name, root.name());
            stack.push(root);
        }

        while let Some(asset) = stack.pop() {
            if !visited.insert(AssetId::of_val(asset.as_ref())) {
                continue;
            }
            for dep in asset.dependencies() {
                push_edge(&mut edges, asset.name(), dep.name());
                stack.push(dep);
            }
        }
    }

    for (from, to) in &edges {
        let _ = writeln!(out, "  {} -> {};", quote(from), quote(to));
    }
    out.push_str("}\n");
    out
}

fn push_edge(edges: &mut Vec<(String, String)>, from: &str, to: &str) {
    if !edges.iter().any(|(f, t)| f == from && t == to) {
        edges.push((from.to_string(), to.to_string()));
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}
