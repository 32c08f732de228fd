use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use watchparty_client::{
    ClientConfig, ClientEngine, ClientEvent, LinkState, PlaceholderCapture, TrackKind,
    WebRtcConnectionFactory,
};
use watchparty_core::{IceServerConfig, format_time};
use watchparty_server::ServerConfig;

mod command;

use command::Command;

#[derive(Parser)]
#[command(name = "watchparty")]
#[command(about = "Watch videos together: room server and headless participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the room coordination and signaling server.
    Serve(ServeArgs),
    /// Join a room as a headless participant.
    Join(JoinArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "WATCHPARTY_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// STUN server announced to clients; repeat for several.
    #[arg(long = "stun")]
    stun: Vec<String>,

    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    turn_credential: Option<String>,
}

#[derive(Args)]
struct JoinArgs {
    #[arg(long, env = "WATCHPARTY_SERVER", default_value = "ws://127.0.0.1:5000/ws")]
    server: String,

    #[arg(long)]
    room: String,

    #[arg(long)]
    name: Option<String>,

    /// Start camera and microphone right after joining.
    #[arg(long)]
    media: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => serve(args).await,
        Commands::Join(args) => join(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = ServerConfig::default().with_bind(args.bind);
    if !args.stun.is_empty() {
        config = config.with_ice_servers(args.stun.into_iter().map(IceServerConfig::stun).collect());
    }
    if let Some(url) = args.turn_url {
        config.ice_servers.push(IceServerConfig {
            urls: vec![url],
            username: args.turn_username,
            credential: args.turn_credential,
        });
    }

    println!(
        "{} {}",
        "🎬 Watch party server on".green().bold(),
        config.bind.to_string().cyan()
    );
    for server in &config.ice_servers {
        println!("   🧊 {}", server.urls.join(", "));
    }

    info!(
        "Starting server on {} with {} ICE servers",
        config.bind,
        config.ice_servers.len()
    );
    watchparty_server::serve(config).await
}

async fn join(args: JoinArgs) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Display name")
            .interact_text()
            .context("Failed to read display name")?,
    };

    let config = ClientConfig::new(args.server.as_str(), args.room.as_str(), name);
    let (engine, mut events) = ClientEngine::connect(
        config,
        Arc::new(WebRtcConnectionFactory::default()),
        Arc::new(PlaceholderCapture::new()),
    )
    .await
    .with_context(|| format!("Failed to join room '{}' on {}", args.room, args.server))?;

    println!(
        "{} {} {}",
        "🍿 Joined".green().bold(),
        args.room.cyan(),
        "(type /quit to leave)".dimmed()
    );

    if args.media {
        for kind in TrackKind::ALL {
            if let Err(e) = engine.toggle_capture(kind).await {
                warn!("Could not start {} on join: {}", kind, e);
                println!("{} {}", "⚠️".yellow(), e);
            }
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClientEvent::Disconnected) | None => {
                    warn!("Server closed the session for room '{}'", args.room);
                    println!("{}", "🔌 Disconnected from server".red());
                    return Ok(());
                }
                Some(event) => print_event(&event),
            },

            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(cmd) => {
                        if let Err(e) = run_command(&engine, cmd).await {
                            println!("{} {:#}", "⚠️".yellow(), e);
                        }
                    }
                    Err(command::CommandError::Empty) => {}
                    Err(e) => println!("{} {}", "⚠️".yellow(), e),
                }
            }

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Leaving room '{}'", args.room);
    engine.leave().await;
    println!("{}", "👋 Left the room".green());
    Ok(())
}

async fn run_command(engine: &ClientEngine, cmd: Command) -> Result<()> {
    match cmd {
        Command::Play => engine.play().await?,
        Command::Pause => engine.pause().await?,
        Command::Seek(time) => engine.seek(time).await?,
        Command::Url { url, provider } => engine.set_media(url, provider).await?,
        Command::State => {
            let clock = engine.playback().await;
            let status = if clock.is_playing() { "▶" } else { "⏸" };
            let media = clock
                .media()
                .map(|m| m.url.clone())
                .unwrap_or_else(|| "no media".to_owned());
            println!("{} {} {}", status, clock.display().bold(), media.dimmed());
        }
        Command::Links => {
            let links = engine.links().await?;
            if links.is_empty() {
                println!("{}", "no peer links".dimmed());
            }
            for link in links {
                println!("   🔗 {} {} {}", link.remote, link.role, state_label(link.state));
            }
        }
        Command::Cam => toggle(engine, TrackKind::Video).await?,
        Command::Mic => toggle(engine, TrackKind::Audio).await?,
        Command::Chat(message) => engine.send_chat(message).await?,
        Command::Quit => {}
    }
    Ok(())
}

async fn toggle(engine: &ClientEngine, kind: TrackKind) -> Result<()> {
    let on = engine.toggle_capture(kind).await?;
    println!("   🎥 {} {}", kind, if on { "on".green() } else { "off".red() });
    Ok(())
}

fn state_label(state: LinkState) -> ColoredString {
    match state {
        LinkState::Connecting => "connecting".yellow(),
        LinkState::Connected => "connected".green(),
        LinkState::Closed => "closed".red(),
    }
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Welcome { id } => println!("{} {}", "🆔 Session".dimmed(), id),
        ClientEvent::MembersChanged { members, .. } => {
            let names: Vec<&str> = members.iter().map(|m| m.user_name.as_str()).collect();
            println!("{} {}", "👥".bold(), names.join(", "));
        }
        ClientEvent::MemberJoined { user_name, .. } => {
            println!("{} {}", "➕".green(), user_name.bold());
        }
        ClientEvent::MemberLeft { id, user_name } => {
            let who = user_name.clone().unwrap_or_else(|| id.to_string());
            println!("{} {}", "➖".red(), who.bold());
        }
        ClientEvent::Chat { user_name, message } => {
            println!("{} {}", format!("{}:", user_name).cyan().bold(), message);
        }
        ClientEvent::Playback {
            action,
            time,
            from_user,
        } => {
            let at = time.map(format_time).unwrap_or_default();
            println!("{} {} {} {}", "🎞".bold(), from_user.cyan(), action, at);
        }
        ClientEvent::PlaybackSynced { playing, time } => {
            let status = if *playing { "playing" } else { "paused" };
            println!("{} {} at {}", "⏱".bold(), status, format_time(*time));
        }
        ClientEvent::MediaChanged(media) => {
            println!("{} {} ({})", "📺".bold(), media.url, media.provider_type);
        }
        ClientEvent::Tick { .. } => {}
        ClientEvent::LinkStateChanged { remote, state } => {
            println!("   🔗 {} {}", remote, state_label(*state));
        }
        ClientEvent::RemoteTrack { remote, kind, .. } => {
            println!("   📡 {} from {}", kind, remote);
        }
        ClientEvent::CaptureFailed(e) => println!("{} {}", "⚠️".yellow(), e),
        ClientEvent::Disconnected => {}
    }
}
