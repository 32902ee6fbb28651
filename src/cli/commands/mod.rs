//! CLI command implementations

pub mod completion;
pub mod config;
pub mod create;
pub mod destroy;
pub mod graph;
pub mod view;

pub use completion::execute as completion;
pub use config::execute as config;
pub use create::execute as create;
pub use destroy::execute as destroy;
pub use graph::execute as graph;
pub use view::execute as view;
