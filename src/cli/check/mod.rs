//! Configuration and source validation commands.

mod config;
mod sources;

pub use config::execute_config;
pub use sources::execute_sources;
