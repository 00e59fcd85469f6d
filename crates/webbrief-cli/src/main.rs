use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use webbrief::agent::{Agent, AgentConfig, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_RESULTS};
use webbrief::core::SearchProvider;
use webbrief_local::gemini::GeminiSummarizer;
use webbrief_local::{search, LocalFetcher};

#[derive(Parser, Debug)]
#[command(name = "webbrief")]
#[command(
    about = "Ask a question; webbrief searches the web, reads the top pages and summarizes them",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Search provider. Allowed: duckduckgo, searxng
    #[arg(long, env = "WEBBRIEF_SEARCH_PROVIDER", default_value = "duckduckgo")]
    provider: String,
    /// Result pages read per query (1 to 30; providers return at most 30).
    #[arg(long, env = "WEBBRIEF_MAX_RESULTS", default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,
    /// Per-page fetch timeout (ms).
    #[arg(long, env = "WEBBRIEF_FETCH_TIMEOUT_MS", default_value_t = DEFAULT_FETCH_TIMEOUT_MS)]
    fetch_timeout_ms: u64,
    /// Gemini model used for the summary (default: gemini-2.0-flash).
    #[arg(long, env = "WEBBRIEF_GEMINI_MODEL")]
    model: Option<String>,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

async fn run_session(args: RunArgs) -> Result<()> {
    anyhow::ensure!(
        (1..=search::MAX_RESULTS_LIMIT).contains(&args.max_results),
        "--max-results must be between 1 and {}",
        search::MAX_RESULTS_LIMIT
    );
    anyhow::ensure!(
        args.fetch_timeout_ms > 0,
        "--fetch-timeout-ms must be at least 1"
    );

    let client = webbrief_local::default_http_client().context("building http client")?;
    let searcher: Arc<dyn SearchProvider> = Arc::from(
        search::provider_from_name(&args.provider, client.clone())
            .context("configuring search provider")?,
    );
    let fetcher = Arc::new(LocalFetcher::new(client.clone()));
    let summarizer = Arc::new(GeminiSummarizer::from_env(client, args.model));
    tracing::debug!(
        provider = searcher.name(),
        model = summarizer.model(),
        max_results = args.max_results,
        fetch_timeout_ms = args.fetch_timeout_ms,
        "starting session"
    );

    let agent = Agent::new(
        searcher,
        fetcher,
        summarizer,
        AgentConfig {
            max_results: args.max_results,
            fetch_timeout: Duration::from_millis(args.fetch_timeout_ms),
        },
    );
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    agent
        .run(stdin.lock(), stdout.lock())
        .await
        .context("console i/o failed")?;
    Ok(())
}

// One query at a time, start to finish: no worker threads needed.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Env file first so both logging and clap's env fallbacks can see it.
    let env_file = webbrief::envfile::load();
    webbrief::logging::init();
    if let Some(r) = &env_file {
        tracing::debug!(
            path = %r.path.display(),
            set = r.set.len(),
            skipped_existing = r.skipped_existing,
            "loaded env file"
        );
    }

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Version(args)) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "name": "webbrief",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("webbrief {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
        None => run_session(cli.run).await?,
    }
    Ok(())
}
