//! Fooddex CLI: initialize the vector collection, run embedding backfill,
//! and search the index.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fooddex::{
    BackfillConfig, BackfillScheduler, EmbedderConfig, OpenAiEmbedder, SearchService, VectorStore,
};

#[derive(Parser)]
#[command(name = "fooddex", version, about = "Semantic index over a food catalog")]
struct Cli {
    /// Enable verbose logging (info level; use RUST_LOG for finer control)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// (Re)create the vector collection. Destructive: drops any stored
    /// embeddings. Run once during setup or to change the vector width.
    Init {
        /// SQLite database path
        #[arg(long, default_value = "fooddb.sqlite")]
        db: String,

        /// Vector width; defaults to the model's declared dimensionality
        #[arg(long)]
        dimension: Option<usize>,

        /// Embedding model whose width the collection should match
        #[arg(long, default_value = "text-embedding-3-small")]
        model: String,
    },

    /// Generate embeddings for every record that lacks one.
    Backfill {
        /// SQLite database path
        #[arg(long, default_value = "fooddb.sqlite")]
        db: String,

        /// Records pulled from the store per fetch-window
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,

        /// Parallel provider requests (1 = sequential)
        #[arg(long, default_value_t = 1)]
        parallel: usize,

        /// Maximum run time in seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,

        /// Embedding model to use
        #[arg(long, default_value = "text-embedding-3-small")]
        model: String,
    },

    /// Semantic vector search over the indexed catalog.
    Search {
        /// Text to search for (e.g. "high protein breakfast")
        query: String,

        /// SQLite database path
        #[arg(long, default_value = "fooddb.sqlite")]
        db: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Embedding model to use for the query
        #[arg(long, default_value = "text-embedding-3-small")]
        model: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Init {
            db,
            dimension,
            model,
        } => {
            let cfg = EmbedderConfig::from_env().with_model(model);
            let dimension = dimension.unwrap_or(cfg.dimension);
            let store = VectorStore::open(&db)?;
            store.init_collection(dimension)?;
            println!("created vector collection ({dimension} dimensions) in {db}");
        }
        Command::Backfill {
            db,
            batch_size,
            parallel,
            timeout,
            model,
        } => {
            let embedder = Arc::new(OpenAiEmbedder::new(
                EmbedderConfig::from_env().with_model(model),
            ));
            let cfg = BackfillConfig {
                batch_size,
                workers: parallel,
                timeout_secs: timeout,
                ..Default::default()
            };
            let mode = if parallel > 1 { "parallel" } else { "sequential" };
            println!("running backfill in {mode} mode ({parallel} workers, {timeout}s budget)");

            let scheduler = BackfillScheduler::new(embedder, &db, cfg);
            let report = scheduler.run().await?;
            println!("processed {} of {} records", report.processed, report.target);
        }
        Command::Search {
            query,
            db,
            limit,
            model,
        } => {
            let embedder = Arc::new(OpenAiEmbedder::new(
                EmbedderConfig::from_env().with_model(model),
            ));
            let service = SearchService::new(embedder, &db);
            let hits = service.search_by_text(&query, limit).await;

            if hits.is_empty() {
                println!("no results (is the index built and OPENAI_API_KEY set?)");
                return Ok(());
            }
            println!("{:<12} {:<12} description", "id", "similarity");
            for hit in hits {
                println!(
                    "{:<12} {:<12} {}",
                    hit.fdc_id,
                    format!("{:.1}%", hit.similarity * 100.0),
                    hit.description
                );
            }
        }
    }

    Ok(())
}
