//! One "current stream" at a time: its resolved URL plus the chat worker
//! following its channel.

use crate::config::ConnectionConfig;
use crate::connection::{WorkerHandle, WorkerState, spawn_worker};
use crate::events::EventReceiver;
use crate::login::LoginCredentials;
use crate::message::{ChatEvent, NoticeKind};
use crate::resolver::{ResolveError, StreamUrlResolver, YtDlpResolver};
use std::time::Duration;

/// How long stopping a stream waits for its worker before abandoning it.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Text of the notice shown when the player reports the end of the stream.
pub const STREAM_ENDED_TEXT: &str = "Stream has ended.";

#[derive(Debug)]
struct ActiveStream {
    channel: String,
    url: String,
    worker: WorkerHandle,
    events: EventReceiver,
}

/// Owns at most one active stream. Loading another stream always stops the
/// previous one first, so there is never more than one chat worker.
#[derive(Debug)]
pub struct StreamSession<R: StreamUrlResolver = YtDlpResolver> {
    resolver: R,
    shutdown_timeout: Duration,
    active: Option<ActiveStream>,
}

impl Default for StreamSession<YtDlpResolver> {
    fn default() -> StreamSession<YtDlpResolver> {
        StreamSession::new(YtDlpResolver::default())
    }
}

impl<R: StreamUrlResolver> StreamSession<R> {
    /// An idle session using `resolver` to find stream URLs.
    pub fn new(resolver: R) -> StreamSession<R> {
        StreamSession {
            resolver,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            active: None,
        }
    }

    /// See [`DEFAULT_SHUTDOWN_TIMEOUT`].
    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> StreamSession<R> {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Stop the current stream, resolve the URL for `config`'s channel and start
    /// following its chat. Returns the stream URL.
    ///
    /// If resolving fails, no worker is started and the session stays idle.
    /// Events the previous stream had not delivered yet are discarded.
    pub async fn load<L: LoginCredentials>(
        &mut self,
        config: ConnectionConfig<L>,
    ) -> Result<String, ResolveError> {
        let leftover = self.stop().await;
        if !leftover.is_empty() {
            tracing::debug!(
                "Discarding {} undelivered events of the previous stream",
                leftover.len()
            );
        }

        let channel = config.channel().to_owned();
        let url = self.resolver.resolve(&channel).await?;
        tracing::info!("Loaded stream for #{}: {}", channel, url);

        let (worker, events) = spawn_worker(config);
        self.active = Some(ActiveStream {
            channel,
            url: url.clone(),
            worker,
            events,
        });
        Ok(url)
    }

    /// Events of the current stream queued since the last call. Empty when idle.
    pub fn poll_events(&mut self) -> Vec<ChatEvent> {
        match &mut self.active {
            Some(active) => active.events.drain(),
            None => Vec::new(),
        }
    }

    /// Stop the current stream, waiting up to the shutdown timeout for its
    /// worker. Returns the events it emitted that were not polled yet, normally
    /// ending with its terminal notice. Does nothing when idle.
    pub async fn stop(&mut self) -> Vec<ChatEvent> {
        let Some(mut active) = self.active.take() else {
            return Vec::new();
        };

        tracing::info!("Stopping stream for #{}", active.channel);
        if let Err(e) = active.worker.stop(self.shutdown_timeout).await {
            tracing::warn!("Stream for #{} did not stop cleanly: {}", active.channel, e);
        }
        active.events.drain()
    }

    /// The player reported that the stream ended. Stops the chat worker and
    /// returns its remaining events followed by an end-of-stream notice.
    pub async fn end_of_stream(&mut self) -> Vec<ChatEvent> {
        if self.active.is_none() {
            return Vec::new();
        }
        let mut events = self.stop().await;
        events.push(ChatEvent::notice(NoticeKind::Closed, STREAM_ENDED_TEXT));
        events
    }

    /// Channel of the current stream.
    pub fn channel(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.channel.as_str())
    }

    /// Resolved URL of the current stream.
    pub fn stream_url(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.url.as_str())
    }

    /// State of the current stream's chat worker.
    pub fn worker_state(&self) -> Option<WorkerState> {
        self.active.as_ref().map(|active| active.worker.state())
    }
}
