// LinkFlow CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Talk to Control/Matching over the same internal
// gRPC surface the services use to talk to each other.

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "linkflow")]
#[command(about = "LinkFlow operator CLI - dead-letter queue, namespace, and cluster administration")]
#[command(version)]
pub struct Cli {
    /// Control plane gRPC address
    #[arg(long, env = "LINKFLOW_CONTROL_ADDR", default_value = "http://127.0.0.1:7300")]
    pub control_addr: String,

    /// Matching service gRPC address
    #[arg(long, env = "LINKFLOW_MATCHING_ADDR", default_value = "http://127.0.0.1:7200")]
    pub matching_addr: String,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and remediate the matching service's dead-letter queue
    Dlq {
        #[command(subcommand)]
        command: commands::dlq::DlqCommand,
    },

    /// Administer namespaces
    Namespaces {
        #[command(subcommand)]
        command: commands::namespaces::NamespacesCommand,
    },

    /// Inspect cluster membership
    Clusters {
        #[command(subcommand)]
        command: commands::clusters::ClustersCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = client::EngineClient::connect(&cli.control_addr, &cli.matching_addr).await?;
    let output_format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::Dlq { command } => commands::dlq::run(command, &client, output_format, cli.quiet).await,
        Commands::Namespaces { command } => {
            commands::namespaces::run(command, &client, output_format, cli.quiet).await
        }
        Commands::Clusters { command } => commands::clusters::run(command, &client, output_format).await,
    }
}
