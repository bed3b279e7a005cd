// CLI module for lamepipe
//
// Only compiled into the binary; the library has no command-line surface.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::OutputFormatter;
