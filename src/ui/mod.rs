//! Terminal output for forge commands
//!
//! Uses `cliclack` for prompts and log lines, falling back to plain
//! prefixed output when stdout is not a terminal or a CI system is detected.
//!
//! ```rust,ignore
//! use forge::ui::{self, UiContext, FetchProgress};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "forge create manifests");
//!
//! let mut progress = FetchProgress::new(&ctx, "manifests", 2);
//! progress.advance("Common Manifests");
//! progress.finish();
//!
//! ui::outro_success(&ctx, "Created manifests");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, remark, section, step_info, step_ok,
    step_ok_detail, step_warn,
};
pub use progress::{FetchProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, ForgeTheme};
