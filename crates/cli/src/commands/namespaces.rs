// Namespace administration commands

use crate::client::EngineClient;
use crate::output::{print_field, print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use clap::Subcommand;
use linkflow_types::Namespace;

#[derive(Subcommand)]
pub enum NamespacesCommand {
    /// Register a new namespace
    Create {
        /// Namespace ID
        id: String,

        /// Human-readable name
        #[arg(long)]
        name: String,

        /// Cluster that owns this namespace by default
        #[arg(long)]
        default_cluster: String,
    },

    /// Fetch a namespace by ID
    Get {
        /// Namespace ID
        id: String,
    },

    /// List every registered namespace
    List,

    /// Change the default cluster a namespace routes to
    SetDefaultCluster {
        /// Namespace ID
        id: String,

        /// New default cluster ID
        #[arg(long)]
        cluster: String,
    },
}

pub async fn run(command: NamespacesCommand, client: &EngineClient, output: OutputFormat, quiet: bool) -> Result<()> {
    match command {
        NamespacesCommand::Create { id, name, default_cluster } => {
            let namespace = Namespace::new(id.clone(), name, default_cluster);
            client.create_namespace(namespace.clone()).await?;
            if output.is_text() {
                if !quiet {
                    println!("created namespace {id}");
                }
            } else {
                output.print_value(&namespace);
            }
        }
        NamespacesCommand::Get { id } => {
            let namespace = client.get_namespace(&id).await?;
            print_namespace(&namespace, output);
        }
        NamespacesCommand::List => {
            let namespaces = client.list_namespaces().await?;
            if output.is_text() {
                if namespaces.is_empty() {
                    println!("No namespaces found");
                    return Ok(());
                }
                print_table_header(&[("ID", 20), ("NAME", 24), ("DEFAULT_CLUSTER", 20)]);
                for ns in &namespaces {
                    print_table_row(&[(&ns.id, 20), (&ns.name, 24), (&ns.default_cluster, 20)]);
                }
            } else {
                output.print_value(&namespaces);
            }
        }
        NamespacesCommand::SetDefaultCluster { id, cluster } => {
            let mut namespace = client.get_namespace(&id).await?;
            namespace.allowed_clusters.insert(cluster.clone());
            namespace.default_cluster = cluster;
            client.update_namespace(namespace.clone()).await?;
            print_namespace(&namespace, output);
        }
    }
    Ok(())
}

fn print_namespace(namespace: &Namespace, output: OutputFormat) {
    if output.is_text() {
        print_field("ID", &namespace.id);
        print_field("Name", &namespace.name);
        print_field("Default cluster", &namespace.default_cluster);
        print_field("Retention (days)", &namespace.retention.num_days().to_string());
    } else {
        output.print_value(namespace);
    }
}
