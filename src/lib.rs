//! Forge - incremental cluster installer
//!
//! Installer artifacts are assets in a dependency graph. The [`store`]
//! resolves a requested asset once per run, reuses files left by earlier
//! runs, and records what it built in a state file so later invocations
//! pick up where earlier ones stopped.

pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod installer;
pub mod provision;
pub mod store;
pub mod targets;
pub mod ui;

pub use error::{ForgeError, ForgeResult};
