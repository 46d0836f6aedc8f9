mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use iptv_core::catalog::validate_channels;
use iptv_core::{
    ChannelKind, EventKind, HeadlessFactory, HttpLoader, ManifestLoader, PlaybackState, Player,
    PlayerConfig, PlayerEvent, PlaybackFailure, StatusBoard,
};

use crate::config::{AppConfig, CatalogLocation, DrmSection};

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const BUILD_REV: &str = env!("IPTV_BUILD_REV");

    if BUILD_REV.is_empty() {
        VERSION
    } else {
        // Called once by clap; lives for the program's lifetime.
        Box::leak(format!("{VERSION} ({BUILD_REV})").into_boxed_str())
    }
}

/// IPTV channel player: engine selection, teardown and DRM fallback.
#[derive(Parser)]
#[command(name = "iptv-player", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP control API.
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Channel list URL or path. Overrides config file.
        #[arg(long)]
        catalog: Option<String>,
    },
    /// Play one channel through the headless engines (no API server).
    Watch {
        /// Channel list URL or path.
        catalog: String,

        /// Index of the channel to play.
        #[arg(short, long, default_value_t = 0)]
        channel: usize,

        /// Refuse autoplay like a browser without a user gesture.
        #[arg(long, default_value_t = false)]
        blocked_autoplay: bool,
    },
    /// Print the validated channel list.
    Channels {
        /// Channel list URL or path.
        catalog: String,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            config,
            catalog,
        } => {
            run_serve(listen, config, catalog).await;
        }
        Commands::Watch {
            catalog,
            channel,
            blocked_autoplay,
        } => {
            init_tracing("pretty", "warn");
            run_watch(catalog, channel, blocked_autoplay).await;
        }
        Commands::Channels { catalog, json } => {
            init_tracing("pretty", "warn");
            run_channels(catalog, json).await;
        }
    }
}

fn build_loader(config: &PlayerConfig) -> Arc<HttpLoader> {
    match HttpLoader::from_config(config) {
        Ok(loader) => Arc::new(loader),
        Err(e) => {
            tracing::error!(error = %e, "Cannot create HTTP client");
            std::process::exit(1);
        }
    }
}

fn parse_catalog_arg(raw: &str) -> CatalogLocation {
    match CatalogLocation::parse(raw) {
        Ok(location) => location,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(2);
        }
    }
}

async fn run_serve(
    listen_override: Option<SocketAddr>,
    config_path: Option<PathBuf>,
    catalog_override: Option<String>,
) {
    let app_config = if let Some(ref path) = config_path {
        match AppConfig::load(path) {
            Ok(c) => {
                init_tracing(&c.server.log_format, "info");
                tracing::info!(path = %path.display(), "Loaded config file");
                c
            }
            Err(e) => {
                init_tracing("pretty", "info");
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    } else {
        init_tracing("pretty", "info");
        AppConfig::default()
    };

    let listen = listen_override.unwrap_or(app_config.server.listen);
    let player_config = app_config.player.to_player_config();
    let loader = build_loader(&player_config);
    let catalog_loader: Arc<dyn ManifestLoader> = Arc::new(loader.single_shot());

    let board = Arc::new(StatusBoard::new());
    let player = Player::new(
        player_config,
        Arc::new(HeadlessFactory::new(loader)),
        Arc::new(app_config.drm.to_key_systems()),
        board.clone(),
    );

    let location = match catalog_override {
        Some(raw) => Some(parse_catalog_arg(&raw)),
        None => match app_config.catalog_location() {
            Ok(location) => location,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        },
    };

    match location {
        Some(location) => {
            let source = location.into_source(catalog_loader);
            // A failed catalog is reported through the API; the server still starts.
            if let Err(e) = player.load_catalog(source.as_ref(), app_config.player.autoplay).await {
                tracing::warn!(error = %e, "Serving without channels");
            }
        }
        None => tracing::warn!("No catalog configured, serving without channels"),
    }

    let state = iptv_api::state::AppState::new(player, board);

    tracing::info!(%listen, "Starting IPTV player API server");
    if let Err(e) = iptv_api::serve_with_state(listen, state, iptv_api::shutdown_signal()).await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

async fn run_channels(catalog: String, json: bool) {
    let location = parse_catalog_arg(&catalog);
    let loader = build_loader(&PlayerConfig::default());
    let source = location.into_source(Arc::new(loader.single_shot()));

    let records = match source.fetch().await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let channels = validate_channels(&records);

    if json {
        match serde_json::to_string_pretty(&channels) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("{} {}", style("error:").red().bold(), e);
                std::process::exit(1);
            }
        }
        return;
    }

    if channels.is_empty() {
        println!("{}", style("No channels available").dim());
        return;
    }
    for c in &channels {
        let kind = format!("{:<18}", c.kind.to_string());
        let kind = match c.kind {
            ChannelKind::Unsupported => style(kind).red(),
            ChannelKind::EncryptedAdaptive => style(kind).yellow(),
            _ => style(kind).green(),
        };
        let drm = if c.license_server.is_some() || c.has_clear_keys() {
            format!(" {}", style("DRM").cyan())
        } else {
            String::new()
        };
        let link = if c.link.is_empty() {
            style("(no link)".to_string()).red()
        } else {
            style(c.link.clone()).dim()
        };
        println!("  {:>3}  {:<28} {}{}  {}", c.index, style(&c.name).bold(), kind, drm, link);
    }
}

async fn run_watch(catalog: String, channel: usize, blocked_autoplay: bool) {
    let location = parse_catalog_arg(&catalog);
    let config = PlayerConfig::default();
    let loader = build_loader(&config);
    let source = location.into_source(Arc::new(loader.single_shot()));

    let board = Arc::new(StatusBoard::new());
    let factory = HeadlessFactory::new(loader).with_autoplay_blocked(blocked_autoplay);
    let player = Player::new(
        config,
        Arc::new(factory),
        Arc::new(DrmSection::default().to_key_systems()),
        board.clone(),
    );

    let multi = MultiProgress::new();
    multi
        .println(format!(
            "{} {}",
            style("iptv-player").bold(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
    multi
        .println(format!("  {} {}", style("catalog:").dim(), style(&catalog).bold()))
        .ok();

    let count = match player.load_catalog(source.as_ref(), false).await {
        Ok(count) => count,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    multi
        .println(format!("  {} {}", style("channels:").dim(), count))
        .ok();
    multi
        .println(format!("  {} {}", style("autoplay:").dim(), if blocked_autoplay { "blocked" } else { "allowed" }))
        .ok();
    multi.println("").ok();

    if let Err(e) = player.select_channel(channel) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }

    multi
        .println(format!("{}", style("Press Ctrl+C to stop").dim()))
        .ok();
    multi.println("").ok();

    let status_bar = multi.add(ProgressBar::new_spinner());
    if let Ok(msg_style) = ProgressStyle::with_template("{spinner} {wide_msg}") {
        status_bar.set_style(msg_style);
    }
    status_bar.enable_steady_tick(Duration::from_millis(120));

    let mut last_event: Option<String> = None;
    let mut last_failure: Option<String> = None;

    let shutdown = iptv_api::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(250)) => {}
            _ = &mut shutdown => {
                status_bar.finish_and_clear();
                player.shutdown();
                multi.println(format!("\n{}", style("Player stopped.").dim())).ok();
                return;
            }
        }

        let events = player.events();
        for ev in unseen(&events, &last_event, |e| &e.id) {
            multi.println(format_event(ev)).ok();
        }
        if let Some(newest) = events.first() {
            last_event = Some(newest.id.clone());
        }

        let failures = player.failures();
        for f in unseen(&failures, &last_failure, |f| &f.id) {
            multi.println(format_failure(f)).ok();
        }
        if let Some(newest) = failures.first() {
            last_failure = Some(newest.id.clone());
        }

        status_bar.set_message(status_line(&player, &board).await);
    }
}

/// Entries newer than `last_id`, oldest first. `items` is newest first.
fn unseen<'a, T>(items: &'a [T], last_id: &Option<String>, id: impl Fn(&T) -> &String) -> Vec<&'a T> {
    let mut fresh: Vec<&T> = items
        .iter()
        .take_while(|item| last_id.as_ref() != Some(id(*item)))
        .collect();
    fresh.reverse();
    fresh
}

fn format_event(ev: &PlayerEvent) -> String {
    let ts = ev.timestamp.format("%H:%M:%S");
    let kind_str = format!("{:<16}", ev.kind.to_string());
    let colored_kind = match ev.kind {
        EventKind::FallbackAttempt | EventKind::AutoplayBlocked | EventKind::EngineErrorIgnored => {
            style(kind_str).yellow()
        }
        EventKind::GaveUp | EventKind::CatalogFailed => style(kind_str).red(),
        _ => style(kind_str).green(),
    };
    let channel = ev.channel.map(|c| format!("#{c}")).unwrap_or_default();
    format!(
        "  {}  {} {:<4} {}",
        style(ts).dim(),
        colored_kind,
        style(channel).dim(),
        ev.details
    )
}

fn format_failure(f: &PlaybackFailure) -> String {
    let ts = f.timestamp.format("%H:%M:%S");
    let code = f.code.map(|c| format!("[{c}]")).unwrap_or_default();
    let stage = f.stage.map(|s| s.to_string()).unwrap_or_default();
    format!(
        "  {}  {} {:<16} {} {} {}  {}",
        style(ts).dim(),
        style("ERROR").red().bold(),
        style(f.failure_type.to_string()).red(),
        f.engine,
        style(stage).dim(),
        code,
        f.message
    )
}

async fn status_line(player: &Player, board: &StatusBoard) -> String {
    let info = player.info().await;
    let view = board.snapshot();
    let state = match info.state {
        PlaybackState::Playing => style(info.state.to_string()).green().bold(),
        PlaybackState::Failed => style(info.state.to_string()).red().bold(),
        _ => style(info.state.to_string()).yellow(),
    };
    let label = if view.channel_label.is_empty() {
        "-".to_string()
    } else {
        view.channel_label
    };
    let mut line = format!(
        "{:<10} {}  engine={}  retries={}/{}",
        state, label, info.engine, info.retries.channel, info.retries.global
    );
    if let Some(badge) = view.live_badge {
        line.push_str(&format!("  {}", style(badge).red().bold()));
    }
    if view.play_prompt {
        line.push_str(&format!("  {}", style("click to play").yellow()));
    }
    if !info.quality_levels.is_empty() {
        line.push_str(&format!("  levels={}", info.quality_levels.len()));
    }
    if info.switching {
        line.push_str(&format!("  {}", style("switching").dim()));
    }
    line
}

fn init_tracing(log_format: &str, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_format {
        "json" => {
            fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .init();
        }
    }
}
