#![warn(missing_docs)]
//! Follow a Twitch channel's chat from a Rust application.
//!
//! This library runs on the `tokio` runtime. It connects to the Twitch chat
//! server over plain TCP, joins one channel and hands the channel's messages to
//! your code through a queue you can drain whenever it suits you, e.g. once per
//! frame of a UI.
//!
//! # Getting started
//!
//! ```no_run
//! use std::time::Duration;
//! use twitch_chat_feed::{ConnectionConfig, spawn_worker};
//!
//! #[tokio::main]
//! pub async fn main() {
//!     // default configuration is to read chat anonymously.
//!     let config = ConnectionConfig::new("sodapoppin").unwrap();
//!     let (mut worker, mut events) = spawn_worker(config);
//!
//!     for _ in 0..100 {
//!         for event in events.drain() {
//!             println!("{}", event);
//!         }
//!         tokio::time::sleep(Duration::from_millis(100)).await;
//!     }
//!
//!     worker.stop(Duration::from_secs(2)).await.unwrap();
//! }
//! ```
//!
//! The worker publishes a [`ChatEvent::SystemNotice`](message::ChatEvent::SystemNotice)
//! once it has joined, a [`ChatEvent::Message`](message::ChatEvent::Message) for
//! every chat line of the channel, and exactly one terminal notice when it ends,
//! whether it was stopped, the server closed the connection or an error occurred.
//! There is no automatic reconnect. Server pings are answered for you.
//!
//! # Logging in
//!
//! Reading chat needs no account. To connect as a specific user, pass the
//! login name and an OAuth access token:
//!
//! ```no_run
//! # use twitch_chat_feed::ConnectionConfig;
//! # use twitch_chat_feed::login::StaticLoginCredentials;
//! let login_name = "your_bot_name".to_owned();
//! let oauth_token = "u0i05p6kbswa1w72wu1h1skio3o20t".to_owned();
//!
//! let config = ConnectionConfig::new_simple(
//!     StaticLoginCredentials::new(login_name, oauth_token),
//!     "sodapoppin",
//! ).unwrap();
//! ```
//!
//! Tokens that have to be fetched from somewhere can be provided by implementing
//! [`LoginCredentials`](login::LoginCredentials) yourself.
//!
//! # Streams
//!
//! A [`StreamSession`] couples the chat worker with a resolved stream URL and
//! makes sure only one stream is followed at a time.
//!
//! # Feature flags
//!
//! - `cli` (default): builds the `chat-tail` binary.
//! - `metrics-collection`: count lines, commands, events and connections in a
//!   `prometheus` registry, see [`ConnectionConfig::with_metrics`].
//! - `with-serde`: `Serialize`/`Deserialize` for [`ChatEvent`](message::ChatEvent)
//!   and friends.

mod config;
mod connection;
mod error;
mod events;
pub mod login;
pub mod message;
#[cfg(feature = "metrics-collection")]
pub mod metrics;
pub mod resolver;
mod session;
mod task;
pub mod transport;
pub mod validate;

pub use config::{
    ConnectionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT, TokenFormat,
};
pub use connection::{
    JoinError, PONG_ARGUMENT, WorkerHandle, WorkerState, spawn_worker, spawn_worker_with_token,
};
pub use error::Error;
pub use events::{EventReceiver, EventSender, event_channel};
pub use session::{DEFAULT_SHUTDOWN_TIMEOUT, STREAM_ENDED_TEXT, StreamSession};

#[doc(hidden)]
pub use smallvec::SmallVec as __SmallVec;
