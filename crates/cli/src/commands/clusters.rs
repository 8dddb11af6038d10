// Cluster membership inspection commands

use crate::client::EngineClient;
use crate::output::{print_field, print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ClustersCommand {
    /// List every cluster known to this control plane
    List,

    /// Fetch a single cluster's membership record
    Get {
        /// Cluster ID
        id: String,
    },
}

pub async fn run(command: ClustersCommand, client: &EngineClient, output: OutputFormat) -> Result<()> {
    match command {
        ClustersCommand::List => {
            let clusters = client.list_clusters().await?;
            if output.is_text() {
                if clusters.is_empty() {
                    println!("No clusters found");
                    return Ok(());
                }
                print_table_header(&[("CLUSTER_ID", 20), ("REGION", 14), ("STATUS", 12), ("ENDPOINT", 30)]);
                for cluster in &clusters {
                    print_table_row(&[
                        (&cluster.cluster_id, 20),
                        (&cluster.region, 14),
                        (&format!("{:?}", cluster.status), 12),
                        (&cluster.endpoint, 30),
                    ]);
                }
            } else {
                output.print_value(&clusters);
            }
        }
        ClustersCommand::Get { id } => {
            let cluster = client.get_cluster(&id).await?;
            if output.is_text() {
                print_field("Cluster ID", &cluster.cluster_id);
                print_field("Name", &cluster.name);
                print_field("Region", &cluster.region);
                print_field("Endpoint", &cluster.endpoint);
                print_field("Status", &format!("{:?}", cluster.status));
                print_field("Last heartbeat", &cluster.last_heartbeat.to_rfc3339());
            } else {
                output.print_value(&cluster);
            }
        }
    }
    Ok(())
}
