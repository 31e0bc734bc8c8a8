//! Flux Watch query tool.
//!
//! Renders and runs the registered list specifications.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use flux_query::{BuildOptions, Config, ListService, QueryParams, SpecRegistry, catalog, db};

#[derive(Parser, Debug)]
#[command(name = "flux-query", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered query specifications.
    Specs,

    /// Print the SQL a request would run.
    Explain {
        #[command(flatten)]
        request: Request,

        /// Also print the count query.
        #[arg(long)]
        counts: bool,

        /// Skip the sorting stage.
        #[arg(long)]
        no_sort: bool,

        /// Skip the pagination stage.
        #[arg(long)]
        no_paginate: bool,
    },

    /// Execute a request and print the JSON list response.
    List {
        #[command(flatten)]
        request: Request,

        /// Include the total row count.
        #[arg(long)]
        counts: bool,
    },

    /// Execute a request and print the first matching row.
    First {
        #[command(flatten)]
        request: Request,
    },
}

#[derive(Args, Debug)]
struct Request {
    /// Specification name.
    spec: String,

    /// Request parameters as key=value.
    #[arg(value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl Request {
    fn params(&self) -> QueryParams {
        self.params.iter().cloned().collect()
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let registry = Arc::new(catalog::builtin_registry().context("invalid built-in query spec")?);

    match cli.command {
        Command::Specs => {
            for name in registry.names() {
                println!("{name}");
            }
        }
        Command::Explain {
            request,
            counts,
            no_sort,
            no_paginate,
        } => {
            let spec = registry
                .get(&request.spec)
                .with_context(|| format!("unknown query spec '{}'", request.spec))?;

            let mut options = BuildOptions::default();
            if counts {
                options = options.with_counts();
            }
            if no_sort {
                options = options.unsorted();
            }
            if no_paginate {
                options = options.unpaginated();
            }

            let built = config
                .query_builder()
                .build(&spec, &request.params(), options)
                .context("failed to build query")?;

            println!("{}", built.data.to_sql());
            if let Some(count) = built.count_sql() {
                println!("{count}");
            }
        }
        Command::List { request, counts } => {
            let service = connect(&config, registry).await?;
            let response = service
                .list(&request.spec, &request.params(), counts)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::First { request } => {
            let service = connect(&config, registry).await?;
            let row = service.find_one(&request.spec, &request.params()).await?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
    }

    Ok(())
}

async fn connect(config: &Config, registry: Arc<SpecRegistry>) -> Result<ListService> {
    let pool = db::create_pool(config).await?;
    info!(
        max_connections = config.database_max_connections,
        "Database connection established"
    );
    Ok(ListService::new(
        pool,
        registry,
        config.query_builder(),
        config.statement_timeout,
    ))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
