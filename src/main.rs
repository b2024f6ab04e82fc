//! sideline Agent
//!
//! Command-line front end for the clip sync layer: connectivity check,
//! sync status inspection, and user-initiated clip uploads.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use sideline::config::Config;
use sideline::data::uri_from_path;
use sideline::logging::init_logging;
use sideline::net::{Connectivity, NetworkProbe};
use sideline::sync::{ClipSyncer, FileKvStore, LocalClip, SyncStatusStore};
use sideline::ui::LogAlerts;

enum Command {
    Probe,
    Status { key: Option<String> },
    Sync(LocalClip),
    MarkLocal(LocalClip),
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let log_guard = init_logging()?;
    info!("sideline Agent starting...");

    let (config_path, rest) = split_config_flag(&args)?;
    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded from {:?}", config.config_path()?);

    let command = parse_command(&rest)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let ok = runtime.block_on(run(config, command))?;

    if !ok {
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(config: Config, command: Command) -> Result<bool> {
    let probe: Arc<dyn Connectivity> = Arc::new(NetworkProbe::new(&config.probe));

    let store_path = config.sync_store_path()?;
    let kv = Arc::new(FileKvStore::new(&store_path));
    let store = SyncStatusStore::new(kv, config.sync.map_key.clone());
    let syncer = ClipSyncer::new(&config.upload, store, probe.clone(), Arc::new(LogAlerts));

    match command {
        Command::Probe => {
            let online = probe.is_online().await;
            println!("{}", if online { "online" } else { "offline" });
            return Ok(online);
        }
        Command::Status { key: Some(key) } => {
            let status = syncer.status(&LocalClip::new(key)).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Status { key: None } => {
            let map = syncer.statuses().await;
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        Command::Sync(clip) => match syncer.sync_clip(&clip).await {
            Ok(status) => println!("{}", serde_json::to_string_pretty(&status)?),
            Err(e) => {
                error!("Sync failed: {}", e);
                return Ok(false);
            }
        },
        Command::MarkLocal(clip) => {
            let status = syncer.mark_local(&clip).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(true)
}

fn split_config_flag(args: &[String]) -> Result<(Option<PathBuf>, Vec<String>)> {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--config" || arg == "-c" {
            let path = iter.next().context("--config needs a path")?;
            config = Some(PathBuf::from(path));
        } else {
            rest.push(arg.clone());
        }
    }

    Ok((config, rest))
}

fn parse_command(args: &[String]) -> Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        bail!("missing command, see --help");
    };

    match name.as_str() {
        "probe" => Ok(Command::Probe),
        "status" => Ok(Command::Status {
            key: rest.first().cloned(),
        }),
        "sync" => Ok(Command::Sync(parse_clip(rest)?)),
        "mark-local" => Ok(Command::MarkLocal(parse_clip(rest)?)),
        other => bail!("unknown command: {}", other),
    }
}

fn parse_clip(args: &[String]) -> Result<LocalClip> {
    let mut target = None;
    let mut asset_id = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--asset-id" {
            asset_id = Some(iter.next().context("--asset-id needs a value")?.clone());
        } else if target.is_none() {
            target = Some(arg.clone());
        } else {
            bail!("unexpected argument: {}", arg);
        }
    }

    let target = target.context("missing clip path or file:// URI")?;
    let uri = if target.starts_with("file://") {
        target
    } else {
        let path = PathBuf::from(&target);
        uri_from_path(&path.canonicalize().unwrap_or(path))
    };

    let clip = LocalClip::new(uri);
    Ok(match asset_id {
        Some(id) => clip.with_asset_id(id),
        None => clip,
    })
}

fn print_help() {
    println!("sideline Agent - segmented recording and clip sync");
    println!();
    println!("USAGE:");
    println!("    sideline-agent [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    probe                              Check connectivity");
    println!("    status [KEY]                       Show the sync map, or one clip's status");
    println!("    sync <PATH|URI> [--asset-id ID]    Upload a clip and record the result");
    println!("    mark-local <PATH|URI> [--asset-id ID]");
    println!("                                       Reset a clip to local-only");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>   Use this config file instead of the default");
    println!("    -h, --help            Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG            Set log level (e.g., debug, info, warn)");
    println!("    SIDELINE_LOG_PATH   Override the log directory");
}
