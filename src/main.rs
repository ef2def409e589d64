use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use virecord::{Config, SessionParams, SessionRunner, Topic, TopicsClient};

#[derive(Parser)]
#[command(name = "virecord", about = "Live speech recording and translation client")]
struct Cli {
    /// Config file; built-in defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage topics on the server
    Topics {
        #[command(subcommand)]
        action: TopicsAction,
    },
    /// Record live audio into a topic, Ctrl-C to stop
    Record {
        /// Existing topic id; a new topic is created when omitted
        #[arg(long)]
        topic: Option<String>,
        /// Name for a newly created topic
        #[arg(long)]
        name: Option<String>,
        /// Spoken language (en/vi/zh)
        #[arg(long)]
        source: Option<String>,
        /// Translation language (en/vi/zh)
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Subcommand)]
enum TopicsAction {
    /// List recorded topics
    List,
    /// Create a topic
    New { name: String },
    /// Show the stored transcripts of a topic
    Detail { id: String },
    /// Delete a topic
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Topics { action } => run_topics(&cfg, action).await,
        Command::Record {
            topic,
            name,
            source,
            target,
        } => run_record(&cfg, topic, name, source, target).await,
    }
}

async fn run_topics(cfg: &Config, action: TopicsAction) -> Result<()> {
    let client = TopicsClient::new(&cfg.server.base_url);

    match action {
        TopicsAction::List => {
            let topics = client.list().await?;
            if topics.is_empty() {
                println!("No topics yet.");
            }
            for topic in topics {
                println!("{}\t{}", topic.title_id, topic.title_name);
            }
        }
        TopicsAction::New { name } => {
            let topic = client.create(&name).await?;
            println!("{}\t{}", topic.title_id, topic.title_name);
        }
        TopicsAction::Detail { id } => {
            let detail = client.detail(&id).await?;
            println!("--- source ---\n{}", detail.original_text);
            println!("--- target ---\n{}", detail.translated_text);
        }
        TopicsAction::Delete { id } => {
            if client.delete(&id).await? {
                println!("Deleted {id}");
            } else {
                println!("Server refused to delete {id}");
            }
        }
    }

    Ok(())
}

async fn run_record(
    cfg: &Config,
    topic: Option<String>,
    name: Option<String>,
    source: Option<String>,
    target: Option<String>,
) -> Result<()> {
    let client = TopicsClient::new(&cfg.server.base_url);

    let topic = match topic {
        Some(id) => {
            let known = client.list().await.unwrap_or_default();
            known
                .into_iter()
                .find(|t| t.title_id == id)
                .unwrap_or_else(|| Topic {
                    title_id: id.clone(),
                    title_name: id,
                })
        }
        None => {
            let name = name
                .unwrap_or_else(|| format!("Recording {}", chrono::Local::now().format("%Y-%m-%d %H:%M")));
            client.create(&name).await?
        }
    };

    // Seed the display with whatever this topic already holds.
    let preload = match client.detail(&topic.title_id).await {
        Ok(detail) => Some((detail.original_text, detail.translated_text)),
        Err(e) => {
            warn!("Could not load topic detail: {e:#}");
            None
        }
    };

    let params = SessionParams {
        title_id: topic.title_id.clone(),
        title_name: topic.title_name.clone(),
        source_language: source.unwrap_or_else(|| cfg.languages.source.clone()),
        target_language: target.unwrap_or_else(|| cfg.languages.target.clone()),
    };

    let runner_config = virecord::session::RunnerConfig {
        ws_url: cfg.ws_url(),
        send_interval: Duration::from_millis(cfg.audio.send_interval_ms),
        reconnect_delay: Duration::from_millis(cfg.session.reconnect_delay_ms),
        stop_grace: Duration::from_secs(cfg.session.stop_grace_secs),
        sample_rate: cfg.audio.sample_rate,
        archive_dir: cfg.audio.archive_dir.clone().map(PathBuf::from),
    };

    info!(
        "Recording into topic {} ({} -> {})",
        topic.title_name, params.source_language, params.target_language
    );

    let outcome = SessionRunner::run(params, runner_config, preload).await?;

    println!("\n--- {} ---", params_label(&topic));
    println!("{}", outcome.source);
    println!("--- translation ---");
    println!("{}", outcome.target);

    Ok(())
}

fn params_label(topic: &Topic) -> String {
    format!("{} (#{})", topic.title_name, topic.title_id)
}
