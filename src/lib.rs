#![warn(clippy::pedantic)]
// Noisy doc/signature lints; would require annotating most pub functions
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Module structure: agent_loop::AgentLoop and friends repeat their module names
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod mcp;
pub mod providers;
pub(crate) mod utils;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
