//! thread-send - Publish the bundle that is due as a reply chain

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use libthreadcast::commit::{CommitSink, GitCommitSink, NoopCommitSink};
use libthreadcast::config::{MastodonConfig, SelectionStrategy, ThreadMode};
use libthreadcast::credentials::{
    Credentials, ACCESS_TOKEN_ENV, ACCESS_TOKEN_SECRET_ENV, CONSUMER_KEY_ENV, CONSUMER_SECRET_ENV,
};
use libthreadcast::error::ConfigError;
use libthreadcast::logging;
use libthreadcast::orchestrator::{self, RunOptions, RunReport};
use libthreadcast::platforms::mastodon::MastodonClient;
use libthreadcast::thread::{PublishPlan, ReplyTarget};
use libthreadcast::{
    Config, ContentRepository, PublishOrchestrator, RunFailure, StatisticsStore, ThreadcastError,
};
use serde_json::json;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "thread-send")]
#[command(version, about = "Publish the due content bundle as a reply chain")]
#[command(long_about = r#"Publish the due content bundle as a reply chain.

Each run picks one bundle from the content root (by rotation period unless
--bundle is given), refreshes engagement counters for earlier items, posts
every part of the bundle as a reply to the previous one, and records the new
items in the statistics file.

EXAMPLES:
    # Publish whatever is due this period
    thread-send

    # Show what would be published, without credentials or network
    thread-send --dry-run

    # Publish a specific bundle
    thread-send --bundle announce

    # Machine-readable result
    thread-send --format json | jq '.published[].permalink'

EXIT CODES:
    0 - Success
    1 - General error (configuration, statistics file, commit)
    2 - Authentication error
    3 - Invalid content (malformed bundle, unknown bundle, nothing to publish)
    4 - Publishing stopped part way; published parts were recorded
"#)]
struct Cli {
    /// Configuration file (defaults to $THREADCAST_CONFIG, then ~/.config/threadcast/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding content bundles
    #[arg(long, value_name = "DIR")]
    content_root: Option<PathBuf>,

    /// Statistics CSV file
    #[arg(long, value_name = "FILE")]
    statistics: Option<PathBuf>,

    /// Publish this bundle instead of the one due by rotation
    #[arg(short, long, env = "THREADCAST_BUNDLE", value_name = "NAME")]
    bundle: Option<String>,

    /// Selection strategy (overrides config)
    #[arg(long, value_name = "STRATEGY")]
    #[arg(value_parser = ["rotation", "least_recent"])]
    strategy: Option<String>,

    /// Reply to the latest open item instead of starting a new thread
    #[arg(long = "continue")]
    continue_thread: bool,

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

    /// Print the plan and exit without publishing or writing anything
    #[arg(long)]
    dry_run: bool,

    /// Do not commit or push the statistics file
    #[arg(long)]
    no_commit: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_default(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    debug!(dry_run = cli.dry_run, bundle = ?cli.bundle, "thread-send started");

    let config = load_config(&cli)?;
    let options = run_options(&cli, &config)?;
    let repository = ContentRepository::new(config.content_root());
    let store = StatisticsStore::new(config.statistics_path());

    if cli.dry_run {
        let plan = orchestrator::preview(&repository, &store, &options, Utc::now())?;
        print_plan(&plan, &cli.format)?;
        return Ok(());
    }

    let credentials = Credentials::from_parts(
        cli.consumer_key.clone(),
        cli.consumer_secret.clone(),
        cli.access_token.clone(),
        cli.access_token_secret.clone(),
    )?;
    let mastodon = config.mastodon.clone().ok_or_else(|| {
        ThreadcastError::from(ConfigError::MissingField(
            "mastodon.instance (set [mastodon] instance or --instance)".to_string(),
        ))
    })?;
    let client = MastodonClient::from_config(&mastodon, &credentials)?;

    let sink: Box<dyn CommitSink> = if config.commit.enabled && !cli.no_commit {
        Box::new(GitCommitSink::new(config.commit.clone()))
    } else {
        Box::new(NoopCommitSink)
    };

    let mut publisher =
        PublishOrchestrator::new(repository, store, Box::new(client), sink, options);
    let report = publisher.run(Utc::now()).await?;

    print_report(&report, &cli.format)?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    if let Some(root) = &cli.content_root {
        config.content.root = root.to_string_lossy().into_owned();
    }
    if let Some(path) = &cli.statistics {
        config.statistics.path = path.to_string_lossy().into_owned();
    }
    if let Some(instance) = &cli.instance {
        config.mastodon = Some(MastodonConfig {
            instance: instance.clone(),
        });
    }

    Ok(config)
}

fn run_options(cli: &Cli, config: &Config) -> Result<RunOptions> {
    let mut options = RunOptions::from_config(config)?;
    options.bundle = cli.bundle.clone();

    match cli.strategy.as_deref() {
        Some("least_recent") => options.strategy = SelectionStrategy::LeastRecent,
        Some("rotation") => options.strategy = SelectionStrategy::Rotation,
        _ => {}
    }
    if cli.continue_thread {
        options.thread_mode = ThreadMode::Continue;
    }

    Ok(options)
}

fn print_plan(plan: &PublishPlan, format: &str) -> Result<()> {
    if format == "json" {
        let steps: Vec<_> = plan
            .steps
            .iter()
            .map(|step| {
                json!({
                    "name": step.name,
                    "text": step.text,
                    "media": step.media,
                    "reply_to": reply_label(step.reply_to),
                })
            })
            .collect();
        let output = json!({
            "dry_run": true,
            "bundle": plan.bundle,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Would publish {} ({} parts)", plan.bundle, plan.len());
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {}. {} [{}]", i + 1, step.name, reply_label(step.reply_to));
        for media in &step.media {
            println!("       {} ({})", media.file_name(), media.kind);
        }
    }
    Ok(())
}

fn print_report(report: &RunReport, format: &str) -> Result<()> {
    if format == "json" {
        let failures: Vec<_> = report
            .refresh
            .failures
            .iter()
            .map(|f| json!({ "id": f.id, "name": f.name, "error": f.message }))
            .collect();
        let output = json!({
            "dry_run": false,
            "bundle": report.plan.bundle,
            "published": report.published,
            "refresh": {
                "refreshed": report.refresh.refreshed,
                "skipped": report.refresh.skipped,
                "failures": failures,
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for item in &report.published {
        println!("{}: {}", item.name, item.permalink);
    }
    if !report.refresh.is_complete() {
        eprintln!(
            "Warning: {} item(s) could not be refreshed",
            report.refresh.failures.len()
        );
    }
    Ok(())
}

fn reply_label(target: ReplyTarget) -> String {
    match target {
        ReplyTarget::Root => "root".to_string(),
        ReplyTarget::Previous => "reply to previous".to_string(),
        ReplyTarget::Existing(id) => format!("reply to {}", id),
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(failure) = error.downcast_ref::<RunFailure>() {
        return failure.exit_code();
    }
    if let Some(error) = error.downcast_ref::<ThreadcastError>() {
        return error.exit_code();
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_label() {
        assert_eq!(reply_label(ReplyTarget::Root), "root");
        assert_eq!(reply_label(ReplyTarget::Existing(7)), "reply to 7");
    }

    #[test]
    fn test_exit_code_from_wrapped_errors() {
        let error = anyhow::Error::new(ThreadcastError::InvalidInput("bad".to_string()));
        assert_eq!(exit_code(&error), 3);

        let error = anyhow::anyhow!("plain");
        assert_eq!(exit_code(&error), 1);
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "thread-send",
            "--bundle",
            "announce",
            "--strategy",
            "least_recent",
            "--continue",
            "--dry-run",
        ])
        .unwrap();

        let options = run_options(&cli, &Config::default_config()).unwrap();
        assert_eq!(options.bundle.as_deref(), Some("announce"));
        assert_eq!(options.strategy, SelectionStrategy::LeastRecent);
        assert_eq!(options.thread_mode, ThreadMode::Continue);
    }
}
