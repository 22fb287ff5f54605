use crate::agent::builtins::{BuiltinTool, default_builtins};
use crate::agent::registry::ToolRegistry;
use crate::agent::{AgentLoop, AgentLoopConfig, RunBudget};
use crate::config::{Config, get_config_path, load_config, load_system_prompt, save_config};
use crate::console;
use crate::mcp::{McpManager, ToolBackend};
use crate::providers::base::ToolDefinition;
use crate::providers::ollama::OllamaProvider;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "autocrab")]
#[command(about = "Autonomous agent loop for local LLMs", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize autocrab configuration
    Onboard,
    /// Run the agent loop
    Run {
        /// Sleep and restart with a fresh conversation after each run,
        /// even when daemon.enabled is off
        #[arg(long)]
        forever: bool,
        /// Path to an alternate config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List discovered tools and whether the agent may call them
    Tools {
        /// Path to an alternate config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            onboard()?;
        }
        Commands::Run { forever, config } => {
            run_agent(forever, config.as_deref()).await?;
        }
        Commands::Tools { config } => {
            list_tools(config.as_deref()).await?;
        }
    }

    Ok(())
}

fn onboard() -> Result<()> {
    println!("🤖 Initializing autocrab...");

    let config_path = get_config_path()?;
    if config_path.exists() {
        println!("⚠️  Config already exists at {}", config_path.display());
        println!("Overwrite? (y/N): ");
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }
    }

    let config = Config::default();
    save_config(&config, Some(config_path.as_path()))?;
    println!("✓ Created config at {}", config_path.display());

    println!("\n🤖 autocrab is ready!");
    println!("\nNext steps:");
    println!("  1. Point ollama.host at your Ollama server and pick a model");
    println!("  2. Add MCP servers under mcp.servers and allow their tools in agent.allowedTools");
    println!("  3. Start the loop: autocrab run");

    Ok(())
}

async fn run_agent(forever: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let daemon_mode = forever || config.daemon.enabled;
    if daemon_mode && config.daemon.interval == 0 {
        anyhow::bail!("daemon.interval must be > 0 to run with --forever");
    }
    info!(
        "autocrab {} starting, model {} at {}",
        crate::VERSION,
        config.ollama.model,
        config.ollama.host
    );

    let system_prompt = load_system_prompt(&config.agent.system_prompt_files)?;

    let manager = McpManager::connect(&config.mcp).await?;
    let external = manager.list_tools().await?;

    let builtins = default_builtins();
    let builtin_names: Vec<String> = builtins.iter().map(|tool| tool.name().to_string()).collect();
    let discovered = all_definitions(&builtins, &external);
    console::print_tools(&discovered, &config.agent.allowed_tools, &builtin_names);

    let registry = ToolRegistry::build(builtins, external, &config.agent.allowed_tools)?;
    let provider = Arc::new(OllamaProvider::new(&config.ollama));
    let manager = Arc::new(manager);

    let mut agent = AgentLoop::new(AgentLoopConfig {
        provider,
        backend: manager.clone(),
        registry,
        system_prompt,
        user_prompt: config.agent.user_prompt.clone(),
        status_prompts: config.agent.status_prompts,
        budget: RunBudget::from_config(&config),
    });

    if let Some(msg) = agent.history().snapshot().first() {
        console::print_message(msg);
    }

    let run_result = if daemon_mode {
        agent
            .run_forever(Duration::from_secs(config.daemon.interval))
            .await
    } else {
        agent.run().await.map(|_| ())
    };

    drop(agent);
    if let Some(manager) = Arc::into_inner(manager) {
        manager.shutdown().await;
    }

    run_result
}

async fn list_tools(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let manager = McpManager::connect(&config.mcp).await?;
    let external = manager.list_tools().await?;

    let builtins = default_builtins();
    let builtin_names: Vec<String> = builtins.iter().map(|tool| tool.name().to_string()).collect();
    console::print_tools(
        &all_definitions(&builtins, &external),
        &config.agent.allowed_tools,
        &builtin_names,
    );

    manager.shutdown().await;
    Ok(())
}

/// Built-in definitions followed by everything the MCP servers advertise,
/// for the startup listing.
fn all_definitions(
    builtins: &[Arc<dyn BuiltinTool>],
    external: &[ToolDefinition],
) -> Vec<ToolDefinition> {
    let mut definitions: Vec<ToolDefinition> = builtins
        .iter()
        .map(|tool| ToolDefinition {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        })
        .collect();
    definitions.extend(external.iter().cloned());
    definitions
}
