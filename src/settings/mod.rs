//! Settings are read from a TOML file and overridden by `UNOTES__*`
//! environment variables. `Settings::validate` must pass before anything is
//! wired; see `bin/settings_demo.rs` for manual checks.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
