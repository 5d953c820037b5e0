pub mod commands;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::config::config;

#[derive(Parser)]
#[command(name = "inventory")]
#[command(about = "Inventory CLI - browse listings and check form input against the inventory API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "API base URL (defaults to INVENTORY_API_URL)")]
    pub url: Option<String>,

    #[arg(long, global = true, help = "Bearer token (defaults to INVENTORY_API_TOKEN)")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Show one page of a resource listing")]
    List {
        #[arg(help = "Resource name: locations, products, stocks, categories or books")]
        resource: String,
        #[arg(long, help = "Page number, starting at 1")]
        page: Option<String>,
        #[arg(long = "sort", help = "Sort key as path[:asc|:desc], repeatable; first is primary")]
        sort: Vec<String>,
    },

    #[command(about = "Fill in a form and report what each field's validation says")]
    Check {
        #[arg(help = "Form name: location, category, product, stock, book or password")]
        form: String,
        #[arg(long = "set", help = "Field value as id=value, repeatable")]
        set: Vec<String>,
        #[arg(long, help = "Prefill the form from this record id first")]
        record: Option<i64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let settings = &config().client;
    let url = cli.url.as_deref().unwrap_or(&settings.api_url);
    let token = cli.token.clone().or_else(|| settings.api_token.clone());
    let client = Arc::new(ApiClient::new(url, token)?);

    match cli.command {
        Commands::List { resource, page, sort } => {
            commands::list::handle(client, &resource, page.as_deref(), &sort, output_format).await
        }
        Commands::Check { form, set, record } => {
            commands::check::handle(client, &form, &set, record, output_format).await
        }
    }
}
