use clap::Parser;
use log::{error, info, warn};
use server::clock::MonotonicClock;
use server::commands;
use server::config::TagConfig;
use server::display::DisplaySink;
use server::events::HostEvent;
use server::host::ConsoleRegistry;
use server::persistence::YamlFilePersistence;
use server::plugin::TagPlugin;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Runs the tag subsystem against a console-driven simulated host.
///
/// Console input:
///   join <id> [nick] | leave <id> | group <id> | roundend | waiting | show
/// Anything else is treated as a tag command (tags, ctags, settag, ...).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Configuration file (YAML); defaults are used if it does not exist
        #[clap(short, long, default_value = "nametag.yml")]
        config: PathBuf,
        /// Directory holding the permanent tag file
        #[clap(short, long)]
        data_dir: Option<PathBuf>,
        /// Refresh period in milliseconds
        #[clap(short, long)]
        tick_ms: Option<u64>,
        /// Enable debug logging
        #[clap(long)]
        debug: bool,
    }

    let args = Args::parse();

    let mut config = TagConfig::load(&args.config)?;
    if let Some(data_dir) = args.data_dir {
        config.folder = data_dir;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    config.debug |= args.debug;

    let default_level = if config.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    config.validate()?;

    let registry = Arc::new(ConsoleRegistry::new());
    let persistence = YamlFilePersistence::new(config.data_file_path());
    let Some(plugin) = TagPlugin::enable(
        &config,
        registry.clone(),
        Arc::new(MonotonicClock::new()),
        Box::new(persistence),
    )
    .await
    else {
        return Ok(());
    };
    let events = plugin.events();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_line(&plugin, &registry, &events, line.trim()).await,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read console input: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down gracefully...");
                break;
            }
        }
    }

    plugin.disable().await;
    Ok(())
}

/// Turns one console line into a host event or a tag command.
async fn handle_line(
    plugin: &TagPlugin,
    registry: &ConsoleRegistry,
    events: &mpsc::Sender<HostEvent>,
    line: &str,
) {
    let mut tokens = line.split_whitespace();
    let event = match (tokens.next(), tokens.next(), tokens.next()) {
        (None, _, _) => return,
        (Some("join"), Some(user_id), nickname) => {
            let player = registry.join(user_id, nickname.unwrap_or(user_id));
            Some(HostEvent::PlayerVerified(player))
        }
        (Some("leave"), Some(user_id), _) => {
            if !registry.leave(user_id) {
                warn!("No connected player {}", user_id);
            }
            None
        }
        (Some("group"), Some(user_id), _) => match registry.get(user_id) {
            Some(player) => Some(HostEvent::GroupChanged(player)),
            None => {
                warn!("No connected player {}", user_id);
                None
            }
        },
        (Some("roundend"), _, _) => Some(HostEvent::RoundEnded),
        (Some("waiting"), _, _) => Some(HostEvent::WaitingForPlayers),
        (Some("show"), _, _) => {
            show_players(registry);
            None
        }
        _ => {
            match commands::execute(plugin.service(), line).await {
                Some(outcome) if outcome.success => println!("{}", outcome.response),
                Some(outcome) => println!("error: {}", outcome.response),
                None => warn!("Unknown command: {}", line),
            }
            None
        }
    };

    if let Some(event) = event {
        if let Err(e) = events.send(event).await {
            error!("Failed to deliver host event: {}", e);
        }
    }
}

fn show_players(registry: &ConsoleRegistry) {
    if registry.is_empty() {
        println!("No players connected");
        return;
    }
    for player in registry.snapshot() {
        println!(
            "{} ({}): [{}] {}",
            player.nickname(),
            player.user_id(),
            player.color(),
            player.label().unwrap_or_else(|| "-".to_string())
        );
    }
}
