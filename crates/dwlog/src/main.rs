mod output;
mod query_server;
mod telemetry;

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dwlog_core::config::Config;
use dwlog_core::model::log::Document;
use dwlog_core::query::{DocumentMode, PAGE_SIZE, PageRequest};
use dwlog_core::severity::Severity;
use dwlog_store::{CreateOutcome, DropOutcome, Store, TABLE_NAME};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::output::{print_index_human, print_status_human};
use crate::telemetry::{SinkConfig, init_cli_tracing, init_run_tracing};

#[derive(Parser, Debug)]
#[command(name = "dwlog")]
#[command(about = "Database-backed application log table")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, help = "Overrides database_url from config")]
    database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Create the dw_log table")]
    CreateTable,
    #[command(about = "Drop the dw_log table and every record in it")]
    DropTable {
        #[arg(short, long, help = "Skip the confirmation prompt")]
        force: bool,
    },
    #[command(about = "Show dialect, table state and row count")]
    Status,
    #[command(about = "Browse one page of stored logs, newest first")]
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long, help = "Decode context/extra into JSON objects")]
        decode: bool,
    },
    #[command(about = "Store one log record")]
    Write {
        #[arg(long, default_value = "app")]
        channel: String,
        #[arg(long, default_value = "info")]
        level: String,
        #[arg(long, help = "JSON object stored as context")]
        context: Option<String>,
        #[arg(long, help = "JSON object stored as extra")]
        extra: Option<String>,
        message: String,
    },
    #[command(about = "Serve the HTTP log browser API")]
    Serve {
        #[arg(long)]
        http_addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut cfg = Config::load().context("load config")?;
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    match cli.command {
        Commands::CreateTable => {
            init_cli_tracing();
            run_create_table(&cfg, cli.json).await
        }
        Commands::DropTable { force } => {
            init_cli_tracing();
            run_drop_table(&cfg, force, cli.json).await
        }
        Commands::Status => {
            init_cli_tracing();
            let store = Store::open(&cfg).await?;
            let status = store.status().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status_human(&status);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::List {
            page,
            search,
            level,
            channel,
            decode,
        } => {
            init_cli_tracing();
            let store = Store::open(&cfg).await?;
            let req = PageRequest {
                page: page.max(1),
                limit: PAGE_SIZE,
                search,
                level,
                channel,
                documents: if decode {
                    DocumentMode::Decoded
                } else {
                    DocumentMode::Raw
                },
            };
            let view = store.index_view(&req).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_index_human(&view);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Write {
            channel,
            level,
            context,
            extra,
            message,
        } => {
            init_cli_tracing();
            let severity = Severity::from_str(&level)?;
            let context = parse_document(context.as_deref(), "context")?;
            let extra = parse_document(extra.as_deref(), "extra")?;
            let store = Store::open(&cfg).await?;
            store
                .writer()
                .write(
                    &channel,
                    severity.value(),
                    severity.name(),
                    &message,
                    &context,
                    &extra,
                )
                .await;
            store.close().await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { http_addr } => {
            if let Some(addr) = http_addr {
                cfg.http_addr = addr;
            }
            run_server(cfg).await
        }
    }
}

async fn run_create_table(cfg: &Config, json: bool) -> anyhow::Result<ExitCode> {
    if !cfg.enabled {
        report(json, "disabled", "dwlog is disabled; nothing to do.");
        return Ok(ExitCode::SUCCESS);
    }

    let store = Store::open(cfg).await?;
    if store.table_exists().await {
        report(
            json,
            "already_exists",
            &format!("Table {TABLE_NAME} already exists."),
        );
        return Ok(ExitCode::SUCCESS);
    }

    if !json {
        output::info(&format!("Creating table {TABLE_NAME}..."));
    }
    match store.create_table().await {
        Ok(CreateOutcome::Created) => {
            if json {
                report(json, "created", "");
            } else {
                output::success(&format!("Table {TABLE_NAME} created successfully."));
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(CreateOutcome::AlreadyExists) => {
            report(
                json,
                "already_exists",
                &format!("Table {TABLE_NAME} already exists."),
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            output::error(&format!("Failed to create table: {err}"));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_drop_table(cfg: &Config, force: bool, json: bool) -> anyhow::Result<ExitCode> {
    if !cfg.enabled {
        report(json, "disabled", "dwlog is disabled; nothing to do.");
        return Ok(ExitCode::SUCCESS);
    }

    let store = Store::open(cfg).await?;
    if !store.table_exists().await {
        report(
            json,
            "absent",
            &format!("Table {TABLE_NAME} does not exist."),
        );
        return Ok(ExitCode::SUCCESS);
    }

    if !force {
        output::warning(&format!(
            "This will permanently delete table {TABLE_NAME} and all its data!"
        ));
        if !confirm(&format!("Are you sure you want to drop table {TABLE_NAME}?")).await? {
            report(json, "not_confirmed", "Operation cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    match store.drop_table(true).await {
        Ok(DropOutcome::Dropped) => {
            if json {
                report(json, "dropped", "");
            } else {
                output::success(&format!("Table {TABLE_NAME} dropped successfully."));
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(DropOutcome::Absent) => {
            report(
                json,
                "absent",
                &format!("Table {TABLE_NAME} does not exist."),
            );
            Ok(ExitCode::SUCCESS)
        }
        Ok(DropOutcome::NotConfirmed) => {
            report(json, "not_confirmed", "Operation cancelled.");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            output::error(&format!("Failed to drop table: {err}"));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_server(cfg: Config) -> anyhow::Result<ExitCode> {
    let store = Store::open(&cfg).await?;
    let sink = SinkConfig {
        min_level: cfg.min_level,
        bubble: cfg.bubble,
    };
    let writer = cfg.enabled.then(|| store.writer());
    init_run_tracing(sink, writer);

    eprintln!("dwlog serve");
    eprintln!("  dialect: {}", store.dialect());
    eprintln!("  http: {}", cfg.http_addr);
    eprintln!("  sink: {}", if cfg.enabled { "on" } else { "off" });
    if !store.table_exists().await {
        tracing::warn!(
            table = TABLE_NAME,
            "log table is missing; run `dwlog create-table`"
        );
    }

    let addr = cfg
        .http_addr
        .parse()
        .with_context(|| format!("invalid http_addr {}", cfg.http_addr))?;
    let http_task = tokio::spawn(query_server::run_query_http_server(store.clone(), addr));

    tokio::select! {
        res = http_task => {
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    store.close().await;
    Ok(ExitCode::SUCCESS)
}

fn report(json: bool, outcome: &str, message: &str) {
    if json {
        println!(
            "{}",
            serde_json::json!({ "table": TABLE_NAME, "outcome": outcome })
        );
    } else {
        output::info(message);
    }
}

async fn confirm(question: &str) -> anyhow::Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{question} [y/N] ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("read confirmation")?;
    Ok(is_affirmative(&line))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn parse_document(raw: Option<&str>, what: &str) -> anyhow::Result<Document> {
    let Some(raw) = raw else {
        return Ok(Document::new());
    };
    match serde_json::from_str::<Value>(raw).with_context(|| format!("parse --{what} JSON"))? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--{what} must be a JSON object, got {other}"),
    }
}
