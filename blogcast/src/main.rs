/*
blogcast - single-binary main.rs
Runs the blog-to-podcast pipeline once, chats over a scraped post, or starts the HTTP front-end.
*/

use anyhow::Result;
use clap::{Parser, Subcommand};
use common::Config;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use blogcast::llm::LlmProvider;
use blogcast::pipeline::{Stage, StageOutcome};
use blogcast::providers;
use blogcast::server::{launch_rocket, AppState};
use blogcast::sessions::{CompactionPolicy, Conversation};
use blogcast::PipelineError;

#[derive(Parser, Debug)]
#[command(name = "blogcast", about = "Turn a blog post into a podcast")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape, summarize and synthesize one blog post
    Generate {
        url: String,

        /// Continue into a chat over the scraped content
        #[arg(long)]
        chat: bool,
    },
    /// Scrape a blog post and chat about it
    Chat { url: String },
    /// Start the HTTP front-end
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Credentials may live in a .env file next to the binary
    dotenv::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    // Load configuration with defaults
    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    match args.command {
        Command::Generate { url, chat } => generate(&config, &url, chat).await,
        Command::Chat { url } => {
            let scraper = providers::create_scraper(&config.scraper)?;
            let llm = providers::create_llm_provider(&config.llm)?;

            info!("Scraping content from URL: {}", url);
            let content = scraper
                .scrape(&url)
                .await
                .map_err(|e| PipelineError::scrape(&url, &e))?;
            if content.trim().is_empty() {
                anyhow::bail!("No content could be scraped from {}", url);
            }

            run_chat(llm, CompactionPolicy::from(&config.chat), content).await
        }
        Command::Serve => {
            let pipeline = Arc::new(providers::build_pipeline(&config)?);
            let state = AppState::new(pipeline, CompactionPolicy::from(&config.chat))
                .with_document_limit(config.server.max_documents);
            launch_rocket(Arc::new(config), state).await
        }
    }
}

async fn generate(config: &Config, url: &str, chat: bool) -> Result<()> {
    if url.trim().is_empty() {
        anyhow::bail!("Please enter a valid URL.");
    }

    // Fails on missing credentials before anything touches the network
    let pipeline = providers::build_pipeline(config)?;
    let run = pipeline.run(url).await;

    println!("== Blog Content ==\n{}\n", run.state.blog_content());
    println!("== Podcast Script ==\n{}\n", run.state.podcast_script());

    for report in &run.reports {
        if let StageOutcome::Skipped(reason) = &report.outcome {
            info!(stage = %report.stage, ?reason, "stage did not run");
        }
    }

    if let Some(err) = run.failure() {
        error!("{}", err);
    }

    if !run.state.audio_file_path().is_empty() {
        println!("== Podcast Audio ==\n{}", run.state.audio_file_path());
    }

    let scraped = matches!(run.outcome(Stage::Scrape), Some(StageOutcome::Completed))
        && !run.state.blog_content().is_empty();
    let content = run.state.blog_content().to_string();

    let failure = run.into_result().err();

    // Chat only needs the scraped content, so a later stage failing does not block it
    if chat && scraped {
        run_chat(pipeline.llm(), CompactionPolicy::from(&config.chat), content).await?;
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Interactive chat over stdin until an empty line, `/exit` or EOF.
async fn run_chat(llm: Arc<dyn LlmProvider>, policy: CompactionPolicy, content: String) -> Result<()> {
    let mut conversation = Conversation::new(llm, policy).with_blog_context(content);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Ask something about the blog content (empty line or /exit to quit).");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line == "/exit" {
            break;
        }

        match conversation.turn(line).await {
            Ok(reply) => println!("{}\n", reply),
            Err(e) => eprintln!("error: {}", e),
        }
    }

    info!(
        messages = conversation.state().messages().len(),
        summarized = !conversation.state().summary().is_empty(),
        "chat ended"
    );
    Ok(())
}
