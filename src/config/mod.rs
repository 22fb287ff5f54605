pub mod loader;
pub mod prompt;
pub mod schema;

pub use loader::{get_config_path, load_config, save_config};
pub use prompt::load_system_prompt;
pub use schema::{AgentConfig, Config, DaemonConfig, McpConfig, McpServerConfig, OllamaConfig};
