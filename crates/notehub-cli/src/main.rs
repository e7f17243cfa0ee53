mod commands;
mod logging;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use notehub_core::{FeedFilter, NoteHubConfig};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("notehub")
        .version(notehub_core::VERSION)
        .about("NoteHub shared study notes")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("collection")
                .long("collection")
                .global(true)
                .help("Document collection holding notes"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("demo")
                .about("Upload, browse, view and share a note as two users"),
        )
        .subcommand(
            Command::new("feed")
                .about("Print the filtered feed")
                .arg(Arg::new("search").long("search").help("Search title, description and tags"))
                .arg(Arg::new("semester").long("semester").help("Exact semester"))
                .arg(Arg::new("subject").long("subject").help("Exact subject"))
                .arg(Arg::new("tag").long("tag").help("Tag, case-insensitive"))
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of notes to load first"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<NoteHubConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => NoteHubConfig::load(path)?,
        None => NoteHubConfig::new(),
    };
    if let Some(collection) = matches.get_one::<String>("collection") {
        config = config.with_notes_collection(collection);
    }
    Ok(config)
}

fn feed_filter(args: &ArgMatches) -> FeedFilter {
    let get = |name: &str| args.get_one::<String>(name).cloned().unwrap_or_default();
    FeedFilter::new()
        .with_search(get("search"))
        .with_semester(get("semester"))
        .with_subject(get("subject"))
        .with_tag(get("tag"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    logging::init(
        &config.log_filter,
        config.log_json || matches.get_flag("json-logs"),
    );
    tracing::debug!(origin = %config.origin, collection = %config.notes_collection, "config loaded");

    match matches.subcommand() {
        Some(("demo", _)) => commands::demo(&config).await,
        Some(("feed", args)) => {
            let seed = args.get_one::<PathBuf>("seed").map(PathBuf::as_path);
            commands::feed(&config, feed_filter(args), seed).await
        }
        _ => unreachable!("subcommand is required"),
    }
}
