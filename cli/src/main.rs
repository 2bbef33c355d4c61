//! caseapi - command-line client for the case-analysis API
//!
//! Reads `CASE_API_URL` / `CASE_API_TIMEOUT_SECS` from the environment (or a
//! `.env` file), builds one `ApiService`, runs a single command and prints
//! the response body.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use caseapi_core::{ApiService, ClientConfig, HttpMethod, Payload, RequestOptions};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// caseapi - case-analysis API client
#[derive(Parser, Debug)]
#[command(name = "caseapi")]
#[command(author, version, about = "Query and update the case-analysis API")]
struct Cli {
    /// Override the base URL from CASE_API_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue a raw request against an endpoint path
    Request {
        /// HTTP method
        #[arg(long, value_enum, default_value = "get")]
        method: MethodArg,

        /// Endpoint path, e.g. /cases
        endpoint: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        /// Extra header as NAME:VALUE (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },

    /// List all cases
    Cases,

    /// Show one case
    Case {
        case_id: String,
    },

    /// List the entities of a case
    Entities {
        case_id: String,
    },

    /// Search entities by free text
    SearchEntities {
        term: String,

        /// Filter as KEY=VALUE (repeatable)
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
    },

    /// Upload a file as evidence for a case
    UploadEvidence {
        case_id: String,
        file: PathBuf,

        /// MIME type of the file
        #[arg(long)]
        mime_type: Option<String>,
    },

    /// Delete several entities in one request
    BatchDelete {
        case_id: String,

        #[arg(required = true)]
        entity_ids: Vec<String>,
    },

    /// Dashboard statistics
    Stats,

    /// System status
    Status,

    /// Poll a case for updates until interrupted
    Watch {
        case_id: String,

        /// Stop after this many updates
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Get,
    Post,
    Put,
    Delete,
}

impl From<MethodArg> for HttpMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Get => HttpMethod::Get,
            MethodArg::Post => HttpMethod::Post,
            MethodArg::Put => HttpMethod::Put,
            MethodArg::Delete => HttpMethod::Delete,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("caseapi=info,caseapi_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    config.validate()?;
    let api = ApiService::new(config)?;

    let payload = match cli.command {
        Commands::Request {
            method,
            endpoint,
            data,
            headers,
        } => {
            let mut options = RequestOptions::new(method.into());
            for raw in &headers {
                let (name, value) = parse_header(raw)?;
                options = options.header(name, value);
            }
            if let Some(data) = data {
                let body: serde_json::Value = serde_json::from_str(&data).context("--data is not valid JSON")?;
                options = options.json(&body)?;
            }
            api.request(&endpoint, options).await?
        }
        Commands::Cases => api.list_cases().await?,
        Commands::Case { case_id } => api.get_case(&case_id).await?,
        Commands::Entities { case_id } => api.list_entities(&case_id).await?,
        Commands::SearchEntities { term, filters } => {
            let pairs = filters.iter().map(|f| parse_filter(f)).collect::<anyhow::Result<Vec<_>>>()?;
            let filters: Vec<(&str, Option<&str>)> = pairs.iter().map(|(k, v)| (*k, Some(*v))).collect();
            api.search_entities(&term, &filters).await?
        }
        Commands::UploadEvidence {
            case_id,
            file,
            mime_type,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("file path has no usable file name")?;
            api.upload_evidence(&case_id, file_name, bytes, mime_type.as_deref())
                .await?
        }
        Commands::BatchDelete { case_id, entity_ids } => api.batch_delete_entities(&case_id, &entity_ids).await?,
        Commands::Stats => api.get_dashboard_stats().await?,
        Commands::Status => api.get_system_status().await?,
        Commands::Watch { case_id, count } => return watch(&api, &case_id, count).await,
    };

    print_payload(&payload)
}

async fn watch(api: &ApiService, case_id: &str, count: Option<usize>) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscription = api.subscribe_to_updates(case_id, move |payload| {
        let _ = tx.send(payload);
    });
    info!(case_id, "watching for updates, Ctrl-C to stop");

    let mut seen = 0usize;
    loop {
        tokio::select! {
            Some(payload) = rx.recv() => {
                print_payload(&payload)?;
                seen += 1;
                if count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(error = %err, "failed to listen for Ctrl-C");
                }
                break;
            }
        }
    }

    subscription.cancel();
    Ok(())
}

fn print_payload(payload: &Payload) -> anyhow::Result<()> {
    match payload {
        Payload::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        Payload::Text(text) => println!("{text}"),
    }
    Ok(())
}

/// Split `NAME:VALUE`, trimming whitespace around both halves.
fn parse_header(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("header {raw:?} is not NAME:VALUE"),
    }
}

/// Split `KEY=VALUE`. The value may itself contain `=`.
fn parse_filter(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("filter {raw:?} is not KEY=VALUE"),
    }
}
