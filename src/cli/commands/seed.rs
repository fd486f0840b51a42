use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, Store};
use crate::seed;

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Import bootcamps, courses, reviews and users from JSON files")]
    Import {
        #[arg(long, help = "Directory holding <collection>.json files", default_value = "_data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every document from every collection")]
    Delete,
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Store> {
    if config.database.url.is_none() {
        anyhow::bail!("DATABASE_URL is required for seeding; the in-memory store does not outlive this command");
    }
    DatabaseManager::connect(&config.database)
        .await
        .context("failed to open the document store")
}

pub async fn handle(cmd: SeedCommands, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&config).await?;

    let result = match cmd {
        SeedCommands::Import { dir } => {
            let report = seed::import_dir(&store, &dir).await?;
            let counts: serde_json::Map<_, _> = report
                .imported
                .iter()
                .map(|(collection, n)| (collection.to_string(), json!(n)))
                .collect();
            output_success(
                output_format,
                &format!("Data imported ({} documents)", report.total()),
                Some(json!(counts)),
            )
        }
        SeedCommands::Delete => {
            let removed = seed::delete_all(&store).await?;
            output_success(
                output_format,
                &format!("Data deleted ({} documents)", removed),
                Some(json!({ "deleted": removed })),
            )
        }
    };

    DatabaseManager::close(&store).await;
    result
}
