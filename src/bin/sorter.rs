#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use sorter_client::gateway::http::DEFAULT_BASE_URL;
use sorter_client::{OptionsUpdate, Session, VoteArgs};

#[derive(Parser)]
#[command(name = "sorter", version, about = "Sorter pairwise-ranking client")]
struct Cli {
    /// API key (falls back to SORTER_API_KEY)
    #[arg(long, env = "SORTER_API_KEY", hide_env_values = true)]
    api_key: String,
    /// Service endpoint
    #[arg(long, env = "SORTER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Option override, e.g. `--set vote_magnitude=positive` (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get or create a tag
    Tag {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List tags in this key's namespace
    Tags,
    /// Get or create an item in a tag
    Item {
        tag: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List items in a tag
    Items { tag: String },
    /// Get or create an attribute
    Attribute {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List attributes
    Attributes,
    /// Vote on a pair of items (by name) in a tag
    Vote {
        tag: String,
        left: String,
        right: String,
        /// Magnitude on the configured scale
        #[arg(allow_negative_numbers = true)]
        magnitude: i32,
        #[arg(long)]
        attribute: Option<String>,
    },
    /// Print the current rankings of a tag
    Rankings {
        tag: String,
        #[arg(long)]
        attribute: Option<String>,
    },
    /// Print the next pair to vote on
    Pair { tag: String },
    /// Print the active options and server compatibility
    Options,
}

#[derive(Serialize)]
struct SessionReport<'a> {
    base_url: &'a str,
    namespace: &'a str,
    server_version: Option<&'a str>,
    compatibility: sorter_client::Compatibility,
    options: &'a sorter_client::Options,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = OptionsUpdate::from_assignments(&cli.set)?;

    let level = sorter_client::Options::default()
        .merged(&overrides)
        .log_level();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let session = Session::connect(&cli.api_key, &cli.base_url, overrides).await?;

    match cli.command {
        Commands::Tag { title, description } => {
            let tag = session.tag(&title, description.as_deref()).await?;
            print_json(&tag)?;
            eprintln!("[sorter] {}", session.tag_link(&tag));
        }
        Commands::Tags => {
            print_json(&session.tags().list().await?)?;
        }
        Commands::Item {
            tag,
            name,
            description,
        } => {
            let tag = session.tags().get(&tag).await?;
            let item = session.item(&tag, &name, description.as_deref()).await?;
            print_json(&item)?;
        }
        Commands::Items { tag } => {
            let tag = session.tags().get(&tag).await?;
            print_json(&session.items(&tag).list().await?)?;
        }
        Commands::Attribute { title, description } => {
            let attr = session.attribute(&title, description.as_deref()).await?;
            print_json(&attr)?;
        }
        Commands::Attributes => {
            print_json(&session.list_attributes().await?)?;
        }
        Commands::Vote {
            tag,
            left,
            right,
            magnitude,
            attribute,
        } => {
            let tag = session.tags().get(&tag).await?;
            let items = session.items(&tag);
            let left = items.get(&left).await?;
            let right = items.get(&right).await?;
            let attribute = match attribute {
                Some(title) => Some(session.get_attribute(&title).await?),
                None => None,
            };
            let args = VoteArgs::MagnitudeLast {
                left: left.id,
                right: right.id,
                magnitude,
            };
            let vote = session.submit_vote(&tag, args, attribute.as_ref()).await?;
            print_json(&vote)?;
        }
        Commands::Rankings { tag, attribute } => {
            let tag = session.tags().get(&tag).await?;
            let attribute = match attribute {
                Some(title) => Some(session.get_attribute(&title).await?),
                None => None,
            };
            let rankings = session.rankings(&tag, attribute.as_ref()).await?;
            print_json(&rankings)?;
        }
        Commands::Pair { tag } => {
            let tag = session.tags().get(&tag).await?;
            let (left, right) = session.pair(&tag).await?;
            print_json(&[left, right])?;
        }
        Commands::Options => {
            let report = SessionReport {
                base_url: session.base_url(),
                namespace: session.namespace(),
                server_version: session.server_version(),
                compatibility: session.compatibility(),
                options: session.options(),
            };
            print_json(&report)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
