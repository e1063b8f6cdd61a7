use crate::login::{LoginCredentials, StaticLoginCredentials};
#[cfg(feature = "metrics-collection")]
use crate::metrics::MetricsBundle;
use crate::transport::DEFAULT_MAX_LINE_LENGTH;
use crate::validate;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use {serde::Deserialize, serde::Serialize};

/// Hostname of the Twitch chat server.
pub const DEFAULT_SERVER_HOST: &str = "irc.chat.twitch.tv";
/// Plain-text (non-TLS) IRC port of the Twitch chat server.
pub const DEFAULT_SERVER_PORT: u16 = 6667;
/// How long a single read may block before the stop signal is checked again.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// How long establishing the TCP connection may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the token is written into the `PASS` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub enum TokenFormat {
    /// `PASS oauth:<token>`, what Twitch expects for user access tokens.
    #[default]
    OAuthPrefixed,
    /// `PASS <token>`, the token is sent exactly as configured.
    Bare,
}

impl TokenFormat {
    /// Render `token` as the argument of the `PASS` command.
    pub fn format_pass(self, token: &str) -> String {
        match self {
            TokenFormat::OAuthPrefixed if token.starts_with("oauth:") => token.to_owned(),
            TokenFormat::OAuthPrefixed => format!("oauth:{}", token),
            TokenFormat::Bare => token.to_owned(),
        }
    }
}

/// Parameters of one chat connection. A config is fixed once a worker has been
/// started with it; following another channel means starting another worker.
#[derive(Debug)]
pub struct ConnectionConfig<L: LoginCredentials = StaticLoginCredentials> {
    /// Gets a set of credentials every time the worker connects.
    pub login_credentials: L,
    channel: String,
    /// Chat server to connect to.
    pub server_host: String,
    /// Port on `server_host`. Only plain TCP is spoken.
    pub server_port: u16,
    /// See [`TokenFormat`].
    pub token_format: TokenFormat,
    /// Upper bound on how long the worker waits for incoming data before
    /// re-checking whether it should stop.
    pub read_timeout: Duration,
    /// Upper bound for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Longer incoming lines are dropped.
    pub max_line_length: usize,
    /// Counters to update, if any.
    #[cfg(feature = "metrics-collection")]
    pub metrics: Option<MetricsBundle>,
}

impl ConnectionConfig<StaticLoginCredentials> {
    /// Read `channel` anonymously. The channel may be given as a name or as
    /// a `twitch.tv/<name>` URL and is normalized to lowercase.
    pub fn new(channel: &str) -> Result<ConnectionConfig<StaticLoginCredentials>, validate::Error> {
        ConnectionConfig::new_simple(StaticLoginCredentials::anonymous(), channel)
    }
}

impl<L: LoginCredentials> ConnectionConfig<L> {
    /// Read `channel` using the given credentials, with default values for everything else.
    pub fn new_simple(login_credentials: L, channel: &str) -> Result<ConnectionConfig<L>, validate::Error> {
        Ok(ConnectionConfig {
            login_credentials,
            channel: validate::normalize_channel_input(channel)?,
            server_host: DEFAULT_SERVER_HOST.to_owned(),
            server_port: DEFAULT_SERVER_PORT,
            token_format: TokenFormat::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            #[cfg(feature = "metrics-collection")]
            metrics: None,
        })
    }

    /// The lowercase channel login, without the leading `#`.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Connect to a different chat server.
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server_host = host.into();
        self.server_port = port;
        self
    }

    /// See [`TokenFormat`].
    pub fn with_token_format(mut self, token_format: TokenFormat) -> Self {
        self.token_format = token_format;
        self
    }

    /// See [`ConnectionConfig::read_timeout`]. Zero is raised to one millisecond.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout.max(Duration::from_millis(1));
        self
    }

    /// See [`ConnectionConfig::connect_timeout`].
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// See [`ConnectionConfig::max_line_length`].
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Update the given counters while the worker runs.
    #[cfg(feature = "metrics-collection")]
    pub fn with_metrics(mut self, metrics: MetricsBundle) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
