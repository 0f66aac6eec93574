//! Command-line front end for stock-rag

use clap::Parser;
use rag_utils::LogFormat;
use stock_rag::{ContextAssembler, Fetch, RagConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "rag-cli")]
#[command(about = "Build grounded stock news context for a question", long_about = None)]
struct Args {
    /// Answer a single query and exit; without it queries are read from stdin
    #[arg(short, long)]
    query: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Print cache counters as JSON before exiting
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let format = if args.json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    rag_utils::init_tracing_with(format, "info");

    let config = RagConfig::from_env()?;
    if config.finmind_api_key.is_none() {
        warn!("FINMIND_API_KEY not set, using anonymous FinMind access");
    }

    let assembler = ContextAssembler::from_config(&config)?;

    info!("Loading stock directory");
    if let Fetch::Found(records) = assembler.refresh_directory().await {
        info!(records = records.len(), "Stock directory ready");
    }
    let refresh = assembler.spawn_directory_refresh();

    match args.query {
        Some(query) => println!("{}", assembler.build_context(&query).await),
        None => interactive(&assembler).await?,
    }

    if args.stats {
        let stats = serde_json::json!({
            "directory": assembler.directory_stats(),
            "caches": assembler.cache_stats(),
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    refresh.abort();
    Ok(())
}

/// One query per line until EOF, `quit` or `exit`
async fn interactive(assembler: &ContextAssembler) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "quit" | "exit") {
            break;
        }

        let context = assembler.build_context(query).await;
        stdout.write_all(context.as_bytes()).await?;
        stdout.write_all(b"\n\n").await?;
    }

    Ok(())
}
