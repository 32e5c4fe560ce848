mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "figbridge")]
#[command(about = "Bridge open Figma tabs to AI agents over MCP", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (the normal mode for agent clients)
    Serve {
        /// Remote debugging port (overrides config remote.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Fail at startup if no Figma tab is discoverable
        #[arg(long)]
        require_target: bool,
    },

    /// List the Figma tabs discoverable right now
    Targets {
        /// Remote debugging port (overrides config remote.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect the tool catalog
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },

    /// Execute a tool directly, bypassing the MCP transport
    Run {
        /// Tool name, e.g. figma_page_summary
        tool_name: String,

        /// Tool parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,

        /// Remote debugging port (overrides config remote.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run environment diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// List all registered tools
    List,
    /// Show a tool's full parameter schema
    Info {
        tool_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing. stdout is the MCP channel in serve mode, so logs
    // always go to stderr.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve {
            port,
            require_target,
        } => {
            commands::serve::run(port, require_target).await?;
        }
        Commands::Targets { port } => {
            commands::targets::run(port).await?;
        }
        Commands::Tools { command } => match command {
            ToolsCommands::List => {
                commands::tools_cmd::list().await?;
            }
            ToolsCommands::Info { tool_name } => {
                commands::tools_cmd::info(&tool_name).await?;
            }
        },
        Commands::Run {
            tool_name,
            params,
            port,
        } => {
            commands::run_cmd::tool(&tool_name, &params, port).await?;
        }
        Commands::Doctor => {
            commands::doctor::run().await?;
        }
    }

    Ok(())
}
