//! The background worker owning one chat connection, and the handle used to
//! control it.

mod event_loop;
mod handshake;
mod keepalive;

pub use keepalive::PONG_ARGUMENT;

use crate::config::ConnectionConfig;
use crate::connection::event_loop::ConnectionWorker;
use crate::events::{EventReceiver, event_channel};
use crate::login::LoginCredentials;
use crate::task::spawn_task;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a connection worker. States only ever advance in declaration
/// order, though some may be skipped (e.g. a failed connect goes from
/// `Connecting` straight to `Stopping`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkerState {
    /// Spawned, not yet running.
    Created,
    /// Getting credentials and opening the TCP connection.
    Connecting,
    /// Handshake sent.
    Joined,
    /// Reading lines from the server.
    Receiving,
    /// Leaving the receive loop, the terminal notice is about to be emitted.
    Stopping,
    /// The socket is released and the terminal notice has been emitted.
    Closed,
}

/// Failure to wait for a worker to finish.
#[derive(Debug, Error)]
pub enum JoinError {
    /// The worker did not exit in time. It has been aborted and no longer
    /// holds its socket, but it may not have emitted its terminal notice.
    #[error("connection worker did not stop within {0:?}")]
    TimedOut(Duration),
    /// The worker task panicked.
    #[error("connection worker panicked")]
    Panicked,
}

/// Start a worker for `config`. Must be called from within a tokio runtime.
///
/// The worker immediately connects and then keeps publishing events to the
/// returned receiver until it is stopped, the server closes the connection or
/// an error occurs. Whichever happens, the last event is exactly one terminal
/// [`SystemNotice`](crate::message::ChatEvent::SystemNotice).
pub fn spawn_worker<L: LoginCredentials>(
    config: ConnectionConfig<L>,
) -> (WorkerHandle, EventReceiver) {
    spawn_worker_with_token(config, CancellationToken::new())
}

/// Like [`spawn_worker`], but the worker also stops when `stop` is cancelled.
/// Pass a child token to tie the worker to a larger shutdown scope.
pub fn spawn_worker_with_token<L: LoginCredentials>(
    config: ConnectionConfig<L>,
    stop: CancellationToken,
) -> (WorkerHandle, EventReceiver) {
    let (events_tx, events_rx) = event_channel();
    let (state_tx, state_rx) = watch::channel(WorkerState::Created);

    let span = tracing::info_span!("chat_worker", channel = %config.channel());
    let worker = ConnectionWorker::new(config, events_tx, stop.clone(), state_tx);
    let join_handle = spawn_task(span, worker.run());

    let handle = WorkerHandle {
        stop,
        state: state_rx,
        join_handle: Some(join_handle),
    };
    (handle, events_rx)
}

/// Controls a running worker. Dropping the handle requests a stop but does not
/// wait for it.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: CancellationToken,
    state: watch::Receiver<WorkerState>,
    join_handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Ask the worker to stop. Returns immediately; the worker notices within
    /// one read timeout. Calling this more than once has no further effect.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Whether a stop has been requested, through this handle or the token.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Wait until the worker has reached `state` or gone past it.
    pub async fn wait_for_state(&mut self, state: WorkerState) -> WorkerState {
        let reached = self
            .state
            .wait_for(|current| *current >= state)
            .await
            .map(|reached| *reached);
        match reached {
            Ok(reached) => reached,
            // the worker is gone, its last state is final
            Err(_) => *self.state.borrow(),
        }
    }

    /// Wait up to `timeout` for the worker task to exit. On timeout the task is
    /// aborted, so the socket is released either way. Joining an already joined
    /// worker returns `Ok(())`.
    pub async fn join(&mut self, timeout: Duration) -> Result<(), JoinError> {
        let Some(mut join_handle) = self.join_handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, &mut join_handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_panic() => {
                tracing::error!("Connection worker panicked");
                Err(JoinError::Panicked)
            }
            // aborted from elsewhere
            Ok(Err(_)) => Ok(()),
            Err(_) => {
                tracing::warn!(
                    "Connection worker did not stop within {:?}, aborting it",
                    timeout
                );
                join_handle.abort();
                Err(JoinError::TimedOut(timeout))
            }
        }
    }

    /// [`request_stop`](WorkerHandle::request_stop) followed by
    /// [`join`](WorkerHandle::join).
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), JoinError> {
        self.request_stop();
        self.join(timeout).await
    }

    /// Whether the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(|join_handle| join_handle.is_finished())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatEvent, NoticeKind};
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::time::Instant;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    use crate::login::CredentialsPair;
    use crate::transport::LineCodec;

    async fn local_server() -> (TcpListener, ConnectionConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ConnectionConfig::new("TestStream")
            .unwrap()
            .with_server("127.0.0.1", port)
            .with_read_timeout(Duration::from_millis(100));
        (listener, config)
    }

    async fn next_line(lines: &mut Framed<tokio::net::TcpStream, LineCodec>) -> String {
        lines.next().await.unwrap().unwrap()
    }

    /// Receive events until the worker is gone.
    async fn all_events(events: &mut EventReceiver) -> Vec<ChatEvent> {
        let mut all = vec![];
        while let Some(event) =
            tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
        {
            all.push(event);
        }
        all
    }

    #[tokio::test]
    async fn test_chat_over_tcp() {
        let (listener, config) = local_server().await;
        let (mut handle, mut events) = spawn_worker(config);

        let (socket, _) = listener.accept().await.unwrap();
        let mut server = Framed::new(socket, LineCodec::default());
        assert_eq!(next_line(&mut server).await, "PASS oauth:SCHMOOPIIE");
        assert_eq!(next_line(&mut server).await, "NICK justinfan12345");
        assert_eq!(next_line(&mut server).await, "JOIN #teststream");

        server
            .get_mut()
            .write_all(
                b"PING :tmi.twitch.tv\r\n:bob!bob@bob.tmi.twitch.tv PRIVMSG #teststream :gg\r\n",
            )
            .await
            .unwrap();
        assert_eq!(next_line(&mut server).await, "PONG :tmi.twitch.tv");

        handle.wait_for_state(WorkerState::Receiving).await;
        assert!(matches!(
            events.recv().await,
            Some(ChatEvent::SystemNotice {
                kind: NoticeKind::Connected,
                ..
            })
        ));
        assert_eq!(
            events.recv().await,
            Some(ChatEvent::Message {
                author: "bob".to_owned(),
                body: "gg".to_owned()
            })
        );

        handle.request_stop();
        handle.join(Duration::from_secs(2)).await.unwrap();
        assert_eq!(handle.state(), WorkerState::Closed);
        assert!(handle.is_finished());

        let rest = all_events(&mut events).await;
        assert_eq!(
            rest,
            vec![ChatEvent::notice(
                NoticeKind::Stopped,
                "Disconnected from chat."
            )]
        );
        // the worker has released the socket
        assert!(server.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_while_server_is_silent() {
        let (listener, config) = local_server().await;
        let config = config.with_read_timeout(Duration::from_secs(1));
        let (mut handle, mut events) = spawn_worker(config);
        let (_socket, _) = listener.accept().await.unwrap();

        assert_eq!(
            handle.wait_for_state(WorkerState::Receiving).await,
            WorkerState::Receiving
        );

        let started = Instant::now();
        handle.stop(Duration::from_secs(2)).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        let all = all_events(&mut events).await;
        assert_eq!(all.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(
            all.last(),
            Some(&ChatEvent::notice(
                NoticeKind::Stopped,
                "Disconnected from chat."
            ))
        );
    }

    #[tokio::test]
    async fn test_server_closes_connection() {
        let (listener, config) = local_server().await;
        let (mut handle, mut events) = spawn_worker(config);

        let (socket, _) = listener.accept().await.unwrap();
        let mut server = Framed::new(socket, LineCodec::default());
        for _ in 0..3 {
            next_line(&mut server).await;
        }
        drop(server);

        let all = all_events(&mut events).await;
        assert_eq!(all.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(
            all.last(),
            Some(&ChatEvent::notice(
                NoticeKind::Closed,
                "Connection closed by server."
            ))
        );
        handle.join(Duration::from_secs(2)).await.unwrap();
        assert_eq!(handle.state(), WorkerState::Closed);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ConnectionConfig::new("teststream")
            .unwrap()
            .with_server("127.0.0.1", port);
        let (mut handle, mut events) = spawn_worker(config);

        let all = all_events(&mut events).await;
        assert_eq!(all.len(), 1);
        assert!(matches!(
            &all[0],
            ChatEvent::SystemNotice { kind: NoticeKind::Error, text }
                if text.starts_with("Failed to connect to chat")
        ));
        handle.join(Duration::from_secs(2)).await.unwrap();
    }

    #[derive(Debug)]
    struct BrokenCredentials;

    #[async_trait]
    impl LoginCredentials for BrokenCredentials {
        type Error = std::io::Error;

        async fn get_credentials(&self) -> Result<CredentialsPair, std::io::Error> {
            Err(std::io::Error::other("token store unavailable"))
        }
    }

    #[tokio::test]
    async fn test_credentials_failure() {
        let (listener, config) = local_server().await;
        let config = ConnectionConfig::new_simple(BrokenCredentials, config.channel())
            .unwrap()
            .with_server("127.0.0.1", listener.local_addr().unwrap().port());
        let (_handle, mut events) = spawn_worker(config);

        assert_eq!(
            all_events(&mut events).await,
            vec![ChatEvent::notice(
                NoticeKind::Error,
                "Failed to get login credentials: token store unavailable"
            )]
        );
    }

    #[tokio::test]
    async fn test_parent_token_stops_worker() {
        let (listener, config) = local_server().await;
        let parent = CancellationToken::new();
        let (mut handle, mut events) = spawn_worker_with_token(config, parent.child_token());
        let (_socket, _) = listener.accept().await.unwrap();
        handle.wait_for_state(WorkerState::Receiving).await;

        parent.cancel();
        assert!(handle.is_stop_requested());
        handle.join(Duration::from_secs(2)).await.unwrap();
        assert!(all_events(&mut events).await.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_worker() {
        let (listener, config) = local_server().await;
        let (handle, mut events) = spawn_worker(config);
        let (_socket, _) = listener.accept().await.unwrap();
        drop(handle);

        let all = all_events(&mut events).await;
        assert_eq!(
            all.last(),
            Some(&ChatEvent::notice(
                NoticeKind::Stopped,
                "Disconnected from chat."
            ))
        );
    }

    #[tokio::test]
    async fn test_join_twice() {
        let (listener, config) = local_server().await;
        let (mut handle, _events) = spawn_worker(config);
        drop(listener);
        handle.stop(Duration::from_secs(2)).await.unwrap();
        handle.join(Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_state_after_worker_ended() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ConnectionConfig::new("teststream")
            .unwrap()
            .with_server("127.0.0.1", port);
        let (mut handle, _events) = spawn_worker(config);
        handle.join(Duration::from_secs(2)).await.unwrap();

        // the state channel is closed by now, the final state is still reported
        assert_eq!(
            handle.wait_for_state(WorkerState::Receiving).await,
            WorkerState::Closed
        );
        assert_eq!(
            handle.wait_for_state(WorkerState::Closed).await,
            WorkerState::Closed
        );
    }
}
