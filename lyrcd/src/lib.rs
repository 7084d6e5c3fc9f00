//! LYRC daemon
//!
//! Wires the catalog, the transmission engine and a TCP front end together:
//!
//! - [`config`]: the `lyrcd.toml` configuration file
//! - [`server`]: accepts clients and relays their request lines to the engine
//!
//! The binary in `main.rs` adds the command line, logging and signal
//! handling on top.

pub mod config;
pub mod server;

pub use config::{ConfigError, DaemonConfig};
pub use server::Server;
