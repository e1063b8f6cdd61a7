//! Turning a channel name into a playable stream URL.

use async_trait::async_trait;
use std::fmt::Debug;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// How long the default resolver may run before it is killed.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(15);

/// Why no stream URL could be found.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolver program could not be started.
    #[error("Could not run `{program}`: {source}")]
    ToolMissing {
        /// Program that was attempted.
        program: String,
        /// Error from spawning it.
        source: std::io::Error,
    },
    /// The resolver did not finish in time and was killed.
    #[error("Resolving the stream URL timed out after {0:?}")]
    Timeout(Duration),
    /// The resolver reported failure, usually because the channel is offline.
    /// Holds what it wrote to stderr.
    #[error("Stream not found: {0}")]
    NotFound(String),
    /// The resolver succeeded but did not print a URL.
    #[error("Resolver returned no stream URL: {0:?}")]
    InvalidUrl(String),
}

/// Source of playable stream URLs. Asked once per loaded stream, before the chat
/// worker is started.
#[async_trait]
pub trait StreamUrlResolver: Debug + Send + Sync + 'static {
    /// The URL of `channel`'s live stream.
    async fn resolve(&self, channel: &str) -> Result<String, ResolveError>;
}

/// Runs `yt-dlp -f best -g https://www.twitch.tv/<channel>` and takes the first
/// line it prints.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: String,
    timeout: Duration,
}

impl Default for YtDlpResolver {
    fn default() -> YtDlpResolver {
        YtDlpResolver {
            program: "yt-dlp".to_owned(),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl YtDlpResolver {
    /// Use a different executable, e.g. an absolute path.
    pub fn with_program(mut self, program: impl Into<String>) -> YtDlpResolver {
        self.program = program.into();
        self
    }

    /// See [`DEFAULT_RESOLVE_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> YtDlpResolver {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl StreamUrlResolver for YtDlpResolver {
    async fn resolve(&self, channel: &str) -> Result<String, ResolveError> {
        let page = format!("https://www.twitch.tv/{}", channel);
        tracing::debug!("Resolving {} with {}", page, self.program);

        let mut command = Command::new(&self.program);
        command
            .args(["-f", "best", "-g", page.as_str()])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ResolveError::ToolMissing {
                    program: self.program.clone(),
                    source,
                });
            }
            Err(_) => return Err(ResolveError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::NotFound(stderr.trim().to_owned()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let url = stdout.lines().next().unwrap_or_default().trim();
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(url.to_owned())
        } else {
            Err(ResolveError::InvalidUrl(url.to_owned()))
        }
    }
}
