// Dead-letter queue inspection and remediation commands

use crate::client::EngineClient;
use crate::output::{print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum DlqCommand {
    /// List every task currently parked in the dead-letter queue
    List,

    /// Re-enqueue a dead-lettered task onto its original queue
    Retry {
        /// Task queue name
        #[arg(long, short)]
        queue: String,

        /// Task ID
        #[arg(long, short)]
        task_id: String,
    },

    /// Drop a dead-lettered task without re-enqueueing it
    Remove {
        /// Task ID
        #[arg(long, short)]
        task_id: String,
    },

    /// Drop every dead-lettered task
    Purge,
}

pub async fn run(command: DlqCommand, client: &EngineClient, output: OutputFormat, quiet: bool) -> Result<()> {
    match command {
        DlqCommand::List => {
            let entries = client.list_dlq().await?;
            if output.is_text() {
                if entries.is_empty() {
                    println!("DLQ is empty");
                    return Ok(());
                }
                print_table_header(&[("TASK_ID", 36), ("QUEUE", 20), ("ATTEMPTS", 9), ("REASON", 30)]);
                for entry in &entries {
                    print_table_row(&[
                        (&entry.task.id, 36),
                        (&entry.task.key.routing_key(), 20),
                        (&entry.attempts.to_string(), 9),
                        (&entry.reason, 30),
                    ]);
                }
            } else {
                output.print_value(&entries);
            }
        }
        DlqCommand::Retry { queue, task_id } => {
            client.retry_dlq_task(&queue, &task_id).await?;
            if !quiet && output.is_text() {
                println!("retried {task_id}");
            }
        }
        DlqCommand::Remove { task_id } => {
            client.remove_dlq_task(&task_id).await?;
            if !quiet && output.is_text() {
                println!("removed {task_id}");
            }
        }
        DlqCommand::Purge => {
            let purged = client.purge_dlq().await?;
            if !quiet && output.is_text() {
                println!("purged {purged} task(s)");
            }
        }
    }
    Ok(())
}
