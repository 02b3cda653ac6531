//! autocon - CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use autocon::{
    api::HttpClient,
    cli::{Args, Command, StreamArgs},
    config::{validate_config, Config},
    download::HttpDownloader,
    error::{exit_codes, Error, Result},
    feed::HttpFeedSource,
    fs::{
        create_category, create_stream, move_stream, next_up, rename_category, CategoryTree,
        StreamHandle,
    },
    opener::SystemOpener,
    output::{
        print_advance, print_banner, print_config_summary, print_error, print_info, print_pending,
        print_reconciliation, print_stream_details, print_stream_row, print_success,
        print_sync_report, print_warning,
    },
    stream::{StreamEngine, StreamRecord},
    sync::SyncCoordinator,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            let code = match e {
                Error::Config(_) | Error::ConfigValidation { .. } | Error::TomlParse(_) => {
                    exit_codes::CONFIG_ERROR
                }
                Error::NoCurrentItem(_)
                | Error::ProgressNotTracked(_)
                | Error::FeedNotSupported(_)
                | Error::CategoryNotFound(_)
                | Error::StreamNotFound { .. }
                | Error::AlreadyExists(_)
                | Error::InvalidName(_)
                | Error::UrlParse(_) => exit_codes::STREAM_ERROR,
                ref e if e.is_corruption() => exit_codes::STREAM_ERROR,
                _ => exit_codes::UNEXPECTED_ERROR,
            };
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    // Load configuration
    let mut config = load_config(args.config.clone())?;

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    let engine = StreamEngine::new(&config);
    let tree = CategoryTree::scan(config.root())?;

    match args.command {
        Command::List { json } => list(&tree, json)?,
        Command::Show(target) => {
            let stream = find(&tree, &target)?;
            let record = engine.load(&stream.dir)?;
            let pending = engine.pending(&stream.dir)?;
            print_stream_details(stream, &record, &pending);
        }
        Command::Complete(target) => {
            let stream = find(&tree, &target)?;
            let advance = engine.advance(&stream.dir)?;
            print_success(&format!("{}/{}", stream.category, stream.name));
            print_advance(&advance);
        }
        Command::Open(target) => {
            let stream = find(&tree, &target)?;
            match engine.open(&stream.dir, &SystemOpener)? {
                Some(target) => print_info(&format!("Opening {}", target)),
                None => print_info("Nothing to open for a manual item"),
            }
        }
        Command::Progress { stream, text } => {
            let stream = find(&tree, &stream)?;
            let item = engine.set_progress(&stream.dir, &text)?;
            print_success(&format!(
                "{}: {}",
                item.name,
                item.progress.as_deref().unwrap_or_default()
            ));
        }
        Command::SetFeed { stream, url } => {
            let stream = find(&tree, &stream)?;
            engine.set_feed_url(&stream.dir, url.as_deref())?;
            match url {
                Some(url) => print_success(&format!("Feed set to {}", url)),
                None => print_success("Feed cleared"),
            }
        }
        Command::Pending { stream, json } => {
            let stream = find(&tree, &stream)?;
            let pending = engine.pending(&stream.dir)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else {
                print_pending(&pending);
            }
        }
        Command::Reconcile { category, stream } => {
            reconcile(&engine, &tree, category.as_deref(), stream.as_deref())?
        }
        Command::Sync { category } => return sync(&config, &tree, category.as_deref()).await,
        Command::AddCategory { name } => {
            let dir = create_category(tree.root(), &name)?;
            print_success(&format!("Created {}", dir.display()));
        }
        Command::AddStream {
            category,
            name,
            kind,
            feed,
        } => {
            let stream = create_stream(tree.root(), &category, &name, kind.into(), feed.as_deref())?;
            print_success(&format!("Created {}", stream.dir.display()));
        }
        Command::RenameCategory { old, new } => {
            let dir = rename_category(tree.root(), &old, &new)?;
            print_success(&format!("Renamed {} to {}", old, dir.display()));
        }
        Command::MoveStream { stream, to, name } => {
            let target = to.as_deref().unwrap_or(&stream.category);
            let moved = move_stream(
                tree.root(),
                &stream.category,
                &stream.stream,
                target,
                name.as_deref(),
            )?;
            print_success(&format!(
                "Moved {}/{} to {}/{}",
                stream.category, stream.stream, moved.category, moved.name
            ));
        }
    }

    Ok(exit_codes::SUCCESS)
}

/// Load the config file given on the command line, else the platform default
/// if it exists, else built-in defaults.
fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(&path);
    }

    match Config::default_path() {
        Some(path) if path.exists() => Config::load(&path),
        Some(path) => {
            tracing::warn!("Configuration file not found: {}", path.display());
            tracing::info!("Using default configuration with CLI arguments");
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

fn find<'a>(tree: &'a CategoryTree, target: &StreamArgs) -> Result<&'a StreamHandle> {
    tree.find_stream(&target.category, &target.stream)
}

#[derive(Serialize)]
struct ListingRow<'a> {
    category: &'a str,
    stream: &'a str,
    next_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<StreamRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn list(tree: &CategoryTree, json: bool) -> Result<()> {
    let mut rows = Vec::new();

    for category in tree.categories() {
        let next = next_up(category).map(|(stream, _)| stream.name.clone());
        if !json {
            println!("{}", console::style(&category.name).bold());
        }

        for stream in &category.streams {
            let record = autocon::stream::info::load(&stream.dir);
            let is_next = next.as_deref() == Some(stream.name.as_str());
            if json {
                let (record, error) = match record {
                    Ok(record) => (Some(record), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                rows.push(ListingRow {
                    category: &category.name,
                    stream: &stream.name,
                    next_up: is_next,
                    record,
                    error,
                });
            } else {
                print_stream_row(&stream.name, &record, is_next);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}

fn reconcile(
    engine: &StreamEngine,
    tree: &CategoryTree,
    category: Option<&str>,
    stream: Option<&str>,
) -> Result<()> {
    let streams: Vec<&StreamHandle> = match (category, stream) {
        (Some(category), Some(stream)) => vec![tree.find_stream(category, stream)?],
        (Some(category), None) => tree.category(category)?.streams.iter().collect(),
        _ => tree.streams().collect(),
    };

    for stream in streams {
        let label = format!("{}/{}", stream.category, stream.name);
        match engine.reconcile(&stream.dir) {
            Ok(reconciliation) => print_reconciliation(&label, &reconciliation),
            Err(e) => print_warning(&format!("{}: {}", label, e)),
        }
    }
    Ok(())
}

async fn sync(config: &Config, tree: &CategoryTree, category: Option<&str>) -> Result<i32> {
    print_banner();
    print_config_summary(config.root(), config.sync.item_limit, tree.categories().len());

    let client = HttpClient::from_config(config)?;
    let feeds = HttpFeedSource::new(client.clone());
    let downloader = HttpDownloader::new(client, config.sync.show_downloads);
    let coordinator = SyncCoordinator::new(config, &feeds, &downloader);

    let report = match category {
        Some(name) => coordinator.sync_category(tree.category(name)?).await,
        None => coordinator.sync_all(tree).await,
    };

    print_sync_report(&report);

    if report.has_failures() {
        print_warning(&format!("{} stream(s) failed", report.streams_failed));
        return Ok(exit_codes::SOME_STREAMS_FAILED);
    }
    Ok(exit_codes::SUCCESS)
}
