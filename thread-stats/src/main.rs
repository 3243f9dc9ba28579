//! thread-stats - Report (and optionally refresh) the statistics log

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use libthreadcast::commit::{CommitSink, GitCommitSink, NoopCommitSink};
use libthreadcast::config::MastodonConfig;
use libthreadcast::credentials::{
    Credentials, ACCESS_TOKEN_ENV, ACCESS_TOKEN_SECRET_ENV, CONSUMER_KEY_ENV, CONSUMER_SECRET_ENV,
};
use libthreadcast::error::ConfigError;
use libthreadcast::logging;
use libthreadcast::orchestrator::refresh_statistics;
use libthreadcast::platforms::mastodon::MastodonClient;
use libthreadcast::{Config, PublishedItem, StatisticsLog, StatisticsStore, ThreadcastError};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "thread-stats")]
#[command(version, about = "Show engagement statistics for published items")]
#[command(long_about = r#"Show engagement statistics for published items.

Reads the statistics file written by thread-send, most recent item first.
With --refresh, counters that are still unknown are fetched from the
platform and the file is saved (and committed when enabled) before printing.

EXAMPLES:
    # Last 20 items
    thread-stats

    # Fill in missing counters first
    thread-stats --refresh

    # Totals only, as JSON
    thread-stats --format json | jq '.totals'

    # Export for a spreadsheet
    thread-stats --format csv --limit 0 > stats.csv

OUTPUT FORMATS:
    text  - One line per item plus a totals line (default)
    json  - Object with "items" and "totals"
    jsonl - One JSON object per item
    csv   - Same columns as the statistics file

EXIT CODES:
    0 - Success (including an empty log)
    1 - Error (unreadable statistics file, configuration, commit)
    2 - Authentication error during --refresh
"#)]
struct Args {
    /// Configuration file (defaults to $THREADCAST_CONFIG, then ~/.config/threadcast/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Statistics CSV file
    #[arg(long, value_name = "FILE")]
    statistics: Option<PathBuf>,

    /// Maximum number of items to show (0 for all)
    #[arg(short, long, default_value = "20", value_name = "N")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl", "csv"])]
    format: String,

    /// Fetch missing counters from the platform and save the file
    #[arg(long)]
    refresh: bool,

    /// Do not commit or push the refreshed file
    #[arg(long)]
    no_commit: bool,

    /// Mastodon instance URL (overrides config)
    #[arg(long, env = "THREADCAST_INSTANCE", value_name = "URL")]
    instance: Option<String>,

    #[arg(long, env = CONSUMER_KEY_ENV, hide_env_values = true)]
    consumer_key: Option<String>,

    #[arg(long, env = CONSUMER_SECRET_ENV, hide_env_values = true)]
    consumer_secret: Option<String>,

    #[arg(long, env = ACCESS_TOKEN_ENV, hide_env_values = true)]
    access_token: Option<String>,

    #[arg(long, env = ACCESS_TOKEN_SECRET_ENV, hide_env_values = true)]
    access_token_secret: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Sums over every item in the log
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct Totals {
    items: usize,
    open: usize,
    favorites: u64,
    shares: u64,
    replies: u64,
}

impl Totals {
    fn from_items(items: &[PublishedItem]) -> Self {
        items.iter().fold(Self::default(), |mut totals, item| {
            totals.items += 1;
            if item.is_open() {
                totals.open += 1;
            }
            totals.favorites += item.favorite_count.unwrap_or(0);
            totals.shares += item.retweet_count.unwrap_or(0);
            totals.replies += item.reply_count.unwrap_or(0);
            totals
        })
    }
}

#[derive(Serialize)]
struct Report<'a> {
    items: &'a [PublishedItem],
    totals: &'a Totals,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init_default(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(args: Args) -> Result<()> {
    tracing::debug!(
        refresh = args.refresh,
        limit = args.limit,
        format = %args.format,
        "thread-stats started"
    );

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if let Some(path) = &args.statistics {
        config.statistics.path = path.to_string_lossy().into_owned();
    }
    if let Some(instance) = &args.instance {
        config.mastodon = Some(MastodonConfig {
            instance: instance.clone(),
        });
    }

    let store = StatisticsStore::new(config.statistics_path());
    let log = if args.refresh {
        refresh(&args, &config, &store).await?
    } else {
        store
            .load()
            .with_context(|| format!("Failed to read {}", store.path().display()))?
    };

    let totals = Totals::from_items(log.items());
    let shown = limited(log.items(), args.limit);
    print_output(shown, &totals, &args.format)
}

async fn refresh(args: &Args, config: &Config, store: &StatisticsStore) -> Result<StatisticsLog> {
    let credentials = Credentials::from_parts(
        args.consumer_key.clone(),
        args.consumer_secret.clone(),
        args.access_token.clone(),
        args.access_token_secret.clone(),
    )?;
    let mastodon = config.mastodon.clone().ok_or_else(|| {
        ThreadcastError::from(ConfigError::MissingField(
            "mastodon.instance (set [mastodon] instance or --instance)".to_string(),
        ))
    })?;
    let mut client = MastodonClient::from_config(&mastodon, &credentials)?;

    let sink: Box<dyn CommitSink> = if config.commit.enabled && !args.no_commit {
        Box::new(GitCommitSink::new(config.commit.clone()))
    } else {
        Box::new(NoopCommitSink)
    };

    let (log, report) = refresh_statistics(store, &mut client, sink.as_ref()).await?;
    for failure in &report.failures {
        eprintln!("Warning: could not refresh {} ({}): {}", failure.name, failure.id, failure.message);
    }
    Ok(log)
}

fn limited(items: &[PublishedItem], limit: usize) -> &[PublishedItem] {
    if limit == 0 || limit >= items.len() {
        items
    } else {
        &items[..limit]
    }
}

fn print_output(items: &[PublishedItem], totals: &Totals, format: &str) -> Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&Report { items, totals })?;
            println!("{}", json);
        }
        "jsonl" => {
            for item in items {
                println!("{}", serde_json::to_string(item)?);
            }
        }
        "csv" => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for item in items {
                writer.serialize(item)?;
            }
            writer.flush()?;
        }
        _ => {
            if items.is_empty() {
                return Ok(());
            }
            for item in items {
                println!("{}", format_line(item));
            }
            println!();
            println!("{}", format_totals(totals));
        }
    }
    Ok(())
}

fn counter(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_line(item: &PublishedItem) -> String {
    format!(
        "{} | {} | fav {} rt {} re {} | {}",
        item.timestamp.format("%Y-%m-%d %H:%M:%S"),
        item.name,
        counter(item.favorite_count),
        counter(item.retweet_count),
        counter(item.reply_count),
        item.permalink
    )
}

fn format_totals(totals: &Totals) -> String {
    format!(
        "{} items ({} open): {} favorites, {} shares, {} replies",
        totals.items, totals.open, totals.favorites, totals.shares, totals.replies
    )
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<ThreadcastError>()
        .map(ThreadcastError::exit_code)
        .unwrap_or(1)
}
