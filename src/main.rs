use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Local;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use twitch_chat_feed::login::StaticLoginCredentials;
use twitch_chat_feed::message::ChatEvent;
use twitch_chat_feed::resolver::{ResolveError, StreamUrlResolver, YtDlpResolver};
use twitch_chat_feed::{
    ConnectionConfig, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, StreamSession,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Follow a Twitch channel's chat in the terminal.
#[derive(Parser, Debug)]
#[command(name = "chat-tail", version, about)]
struct Cli {
    /// Channel name, or a twitch.tv URL.
    channel: String,

    /// Login name to connect as. Chat is read anonymously if unset.
    #[arg(long, env = "TWITCH_NICKNAME")]
    nickname: Option<String>,

    /// OAuth access token belonging to --nickname.
    #[arg(long, env = "TWITCH_OAUTH_TOKEN", hide_env_values = true)]
    oauth_token: Option<String>,

    /// Chat server to connect to.
    #[arg(long, default_value = DEFAULT_SERVER_HOST)]
    server: String,

    /// Port of the chat server (plain TCP).
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
    port: u16,

    /// Skip looking up the stream URL, only follow chat.
    #[arg(long)]
    no_resolve: bool,

    /// yt-dlp executable used to look up the stream URL.
    #[arg(long, default_value = "yt-dlp")]
    yt_dlp: String,

    /// Prefix every line with the local time.
    #[arg(long)]
    timestamps: bool,
}

/// Either yt-dlp, or the channel page itself when lookups are disabled.
#[derive(Debug)]
enum Resolver {
    YtDlp(YtDlpResolver),
    ChannelPage,
}

#[async_trait]
impl StreamUrlResolver for Resolver {
    async fn resolve(&self, channel: &str) -> Result<String, ResolveError> {
        match self {
            Resolver::YtDlp(resolver) => resolver.resolve(channel).await,
            Resolver::ChannelPage => Ok(format!("https://www.twitch.tv/{}", channel)),
        }
    }
}

#[tokio::main]
pub async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let credentials = match (cli.nickname, cli.oauth_token) {
        (Some(nickname), Some(token)) => StaticLoginCredentials::new(nickname, token),
        (None, None) => StaticLoginCredentials::anonymous(),
        _ => bail!("--nickname and --oauth-token have to be given together"),
    };
    let config = ConnectionConfig::new_simple(credentials, &cli.channel)
        .with_context(|| format!("`{}` is not a valid channel", cli.channel))?
        .with_server(cli.server, cli.port);

    let resolver = if cli.no_resolve {
        Resolver::ChannelPage
    } else {
        Resolver::YtDlp(YtDlpResolver::default().with_program(cli.yt_dlp))
    };
    let mut session = StreamSession::new(resolver);

    let url = session
        .load(config)
        .await
        .context("Failed to load the stream")?;
    println!("Stream: {}", url);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = ticker.tick() => {
                let events = session.poll_events();
                let ended = events.iter().any(ChatEvent::is_terminal);
                print_events(events, cli.timestamps);
                if ended {
                    break;
                }
            }
        }
    }

    print_events(session.stop().await, cli.timestamps);
    Ok(())
}

fn print_events(events: Vec<ChatEvent>, timestamps: bool) {
    for event in events {
        if timestamps {
            println!("[{}] {}", Local::now().format("%H:%M:%S"), event);
        } else {
            println!("{}", event);
        }
    }
}
