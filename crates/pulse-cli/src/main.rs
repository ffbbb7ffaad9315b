mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use pulse_core::PlatformFamily;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "topicpulse command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Platform selector for `ingest`; `all` fans out to every family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlatformArg {
    Twitter,
    Youtube,
    All,
}

impl PlatformArg {
    fn families(self) -> Vec<PlatformFamily> {
        match self {
            PlatformArg::Twitter => vec![PlatformFamily::Twitter],
            PlatformArg::Youtube => vec![PlatformFamily::Youtube],
            PlatformArg::All => PlatformFamily::ALL.to_vec(),
        }
    }

    fn single(self) -> Option<PlatformFamily> {
        match self {
            PlatformArg::Twitter => Some(PlatformFamily::Twitter),
            PlatformArg::Youtube => Some(PlatformFamily::Youtube),
            PlatformArg::All => None,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Fetch posts for a topic and store them in its partition
    Ingest {
        #[arg(long)]
        topic: String,
        #[arg(long, value_enum, default_value = "all")]
        platform: PlatformArg,
        #[arg(long, default_value_t = pulse_ingest::DEFAULT_LIMIT)]
        limit: u32,
        /// Language hint passed to the platform search (e.g. en)
        #[arg(long)]
        language: Option<String>,
    },
    /// Run one inference pass over a topic partition and write the result back
    Annotate {
        #[arg(long)]
        topic: String,
        /// Required when the topic exists in more than one platform family
        #[arg(long, value_enum)]
        platform: Option<PlatformArg>,
    },
    /// Ingest then annotate in one process; useful with the in-memory store
    Run {
        #[arg(long)]
        topic: String,
        #[arg(long, value_enum, default_value = "twitter")]
        platform: PlatformArg,
        #[arg(long, default_value_t = pulse_ingest::DEFAULT_LIMIT)]
        limit: u32,
        #[arg(long)]
        language: Option<String>,
    },
    /// List every known partition
    Topics,
    /// Print the stored analyses of a partition
    Report {
        /// Derived partition name (e.g. tweets_rust)
        #[arg(long)]
        partition: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pulse-cli ready; run with --help for commands");
        return Ok(());
    };

    match command {
        Commands::Migrate => commands::run_migrate(&config).await,
        Commands::Ingest {
            topic,
            platform,
            limit,
            language,
        } => {
            let store = commands::open_store(&config).await?;
            let request = commands::ingest_request(&topic, limit, language);
            commands::run_ingest(&config, store.as_ref(), &request, &platform.families()).await
        }
        Commands::Annotate { topic, platform } => {
            let store = commands::open_store(&config).await?;
            let family = platform.and_then(PlatformArg::single);
            commands::run_annotate(&config, store.as_ref(), &topic, family).await
        }
        Commands::Run {
            topic,
            platform,
            limit,
            language,
        } => {
            let store = commands::open_store(&config).await?;
            let request = commands::ingest_request(&topic, limit, language);
            let families = platform.families();
            commands::run_ingest(&config, store.as_ref(), &request, &families).await?;
            let family = (families.len() == 1).then(|| families[0]);
            commands::run_annotate(&config, store.as_ref(), &topic, family).await
        }
        Commands::Topics => {
            let store = commands::open_store(&config).await?;
            commands::run_topics(store.as_ref()).await
        }
        Commands::Report { partition } => {
            let store = commands::open_store(&config).await?;
            commands::run_report(store.as_ref(), &partition).await
        }
    }
}
