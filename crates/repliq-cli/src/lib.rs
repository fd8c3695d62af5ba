#![warn(missing_docs)]

//! repliq command line: REST client, prompts, logging and action dispatch

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod logging;
pub mod prompt;

pub use cli::Cli;
pub use client::RestCluster;
pub use config::ToolConfig;
