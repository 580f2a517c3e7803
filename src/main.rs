use analytics::LineChartMode;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashboard::{Dashboard, DashboardState, DashboardView, Message};
use database::SqliteStore;
use disaster_core::{
    disaster_type_key, AidPriority, AidRequestForm, AppConfig, Category, ClassificationRecord,
    PostRecord, RecordStore, SearchQuery, StoreBackend, DISASTER_TYPES,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use store_client::StoreClient;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "disaster-watch",
    about = "Sentiment and indicator analytics over disaster-related posts"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "DISASTER_WATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search posts and print the dashboard view
    Search {
        #[arg(long)]
        country: String,
        /// Disaster type key or label (flood, earthquake, cyclone, ...)
        #[arg(long, value_parser = parse_disaster_type)]
        disaster_type: String,
        #[arg(long)]
        year: String,
        /// Daily chart shows category percentages instead of the mean score
        #[arg(long)]
        breakdown: bool,
        /// Hide one or more indicator categories (sentiment, damages, elements, requests, misc)
        #[arg(long = "hide", value_parser = parse_category)]
        hidden: Vec<Category>,
        /// Indicator board page
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage aid requests
    Requests {
        #[command(subcommand)]
        action: RequestAction,
    },
    /// Load exported posts and classifications into the local database
    Import {
        #[arg(long)]
        posts: Option<PathBuf>,
        #[arg(long)]
        classifications: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum RequestAction {
    List,
    Submit {
        #[arg(long = "type")]
        request_type: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "medium", value_parser = parse_priority)]
        priority: AidPriority,
    },
    /// Move a request to its next status
    Advance { id: String },
}

fn parse_category(raw: &str) -> Result<Category, String> {
    match raw.trim().to_lowercase().as_str() {
        "sentiment" => Ok(Category::Sentiment),
        "damages" => Ok(Category::Damages),
        "elements" => Ok(Category::Elements),
        "requests" => Ok(Category::Requests),
        "misc" | "miscellaneous" => Ok(Category::Miscellaneous),
        other => Err(format!("unknown category '{other}'")),
    }
}

fn parse_disaster_type(raw: &str) -> Result<String, String> {
    disaster_type_key(raw).map(str::to_string).ok_or_else(|| {
        let known: Vec<_> = DISASTER_TYPES.iter().map(|(key, _)| *key).collect();
        format!("unknown disaster type '{raw}' (expected one of {})", known.join(", "))
    })
}

fn parse_priority(raw: &str) -> Result<AidPriority, String> {
    raw.parse().map_err(|e: disaster_core::CoreError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("disaster_watch=info,dashboard=info,store_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::info!("Starting disaster-watch ({:?} backend)", config.store.backend);

    match cli.command {
        Command::Import {
            posts,
            classifications,
        } => import(&config, posts.as_deref(), classifications.as_deref()).await,
        command => {
            let state = DashboardState::from_config(&config.analytics);
            match config.store.backend {
                StoreBackend::Rest => {
                    let store = StoreClient::from_config(&config.store)?;
                    run(Dashboard::new(store, state), command).await
                }
                StoreBackend::Sqlite => {
                    let store = SqliteStore::connect(&config.store.database_url).await?;
                    run(Dashboard::new(store, state), command).await
                }
            }
        }
    }
}

async fn run<S: RecordStore>(mut dashboard: Dashboard<S>, command: Command) -> Result<()> {
    match command {
        Command::Search {
            country,
            disaster_type,
            year,
            breakdown,
            hidden,
            page,
            json,
        } => {
            let query = SearchQuery::new(country, disaster_type, year);
            dashboard.search(&query).await?;
            if breakdown {
                dashboard.update(Message::SetChartMode(LineChartMode::Breakdown))?;
            }
            for category in hidden {
                dashboard.update(Message::ToggleCategory(category))?;
            }
            dashboard.update(Message::SetIndicatorPage(page))?;

            let view = dashboard.view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_summary(&view);
            }
        }
        Command::Requests { action } => match action {
            RequestAction::List => {
                dashboard.refresh_aid_requests().await?;
                let view = dashboard.view();
                println!("{}", serde_json::to_string_pretty(&view.aid_requests)?);
            }
            RequestAction::Submit {
                request_type,
                location,
                description,
                priority,
            } => {
                let form = AidRequestForm::new(request_type, location, description, priority);
                let request = dashboard.submit_aid_request(form).await?;
                println!("{}", serde_json::to_string_pretty(&request)?);
            }
            RequestAction::Advance { id } => {
                dashboard.refresh_aid_requests().await?;
                let status = dashboard.advance_aid_request(&id).await?;
                println!("{id} -> {status}");
            }
        },
        Command::Import { .. } => anyhow::bail!("import only writes to the local database"),
    }
    Ok(())
}

fn print_summary(view: &DashboardView) {
    let sentiment = &view.sentiment;
    println!("Search: {}", view.search_text);
    println!(
        "Sentiment: {:.1} ({}) {} | positive {}% neutral {}% negative {}%",
        sentiment.score,
        sentiment.level,
        sentiment.trend_symbol,
        sentiment.breakdown.positive,
        sentiment.breakdown.neutral,
        sentiment.breakdown.negative
    );

    println!(
        "Indicators (page {}/{}):",
        view.indicators.page + 1,
        view.indicators.total_pages.max(1)
    );
    for row in &view.indicators.rows {
        println!("  {:<28} {:>6}  [{}]", row.display_name, row.count, row.category.as_str());
    }

    println!("Posts: {}", view.posts.len());
    for post in view.posts.iter().take(10) {
        println!(
            "  {} @{} [{}] {}",
            post.timestamp, post.username, post.sentiment, post.text
        );
    }
}

async fn import(
    config: &AppConfig,
    posts: Option<&Path>,
    classifications: Option<&Path>,
) -> Result<()> {
    let store = SqliteStore::connect(&config.store.database_url).await?;

    if let Some(path) = posts {
        let rows: Vec<PostRecord> = read_json(path)?;
        let count = store.import_posts(&rows).await?;
        println!("Imported {count} posts from {}", path.display());
    }
    if let Some(path) = classifications {
        let rows: Vec<ClassificationRecord> = read_json(path)?;
        let count = store.import_classifications(&rows).await?;
        println!("Imported {count} classifications from {}", path.display());
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
