use crate::config::ConnectionConfig;
use crate::connection::WorkerState;
use crate::connection::handshake::handshake_commands;
use crate::connection::keepalive;
use crate::error::Error;
use crate::events::EventSender;
use crate::login::{CredentialsPair, LoginCredentials};
use crate::message::{ChatEvent, ClientCommand, NoticeKind, ServerLine, classify_line};
use crate::transport::{LineCodec, tcp};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::ops::ControlFlow;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

pub(crate) const STOPPED_TEXT: &str = "Disconnected from chat.";

/// Owns one chat connection from connect until close. Runs as its own task.
pub(crate) struct ConnectionWorker<L: LoginCredentials> {
    config: ConnectionConfig<L>,
    events: EventSender,
    stop: CancellationToken,
    state_tx: watch::Sender<WorkerState>,
}

impl<L: LoginCredentials> ConnectionWorker<L> {
    pub(crate) fn new(
        config: ConnectionConfig<L>,
        events: EventSender,
        stop: CancellationToken,
        state_tx: watch::Sender<WorkerState>,
    ) -> ConnectionWorker<L> {
        ConnectionWorker {
            config,
            events,
            stop,
            state_tx,
        }
    }

    /// Connect over TCP and receive until stopped, closed or failed.
    pub(crate) async fn run(self) {
        tracing::debug!("Spawned connection worker");
        self.set_state(WorkerState::Connecting);
        self.count_connection();

        let result = match self.connect().await {
            Ok(Some(lines)) => self.receive(lines).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        self.finish(result);
    }

    /// Like [`ConnectionWorker::run`], but over an already established stream.
    #[cfg(test)]
    pub(crate) async fn run_on<T>(self, io: T)
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        self.set_state(WorkerState::Connecting);
        let lines = Framed::new(io, LineCodec::new(self.config.max_line_length));
        let result = self.receive(lines).await;
        self.finish(result);
    }

    /// `Ok(None)` if the stop signal arrived while connecting.
    async fn connect(&self) -> Result<Option<tcp::TcpLines>, Error<L>> {
        let connect = tcp::connect(
            &self.config.server_host,
            self.config.server_port,
            self.config.connect_timeout,
            LineCodec::new(self.config.max_line_length),
        );
        match self.unless_stopped(connect).await {
            Some(lines) => Ok(Some(lines.map_err(Error::ConnectError)?)),
            None => Ok(None),
        }
    }

    async fn receive<T>(&self, mut lines: Framed<T, LineCodec>) -> Result<(), Error<L>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(credentials) = self.credentials().await? else {
            return Ok(());
        };

        let channel = self.config.channel();
        for command in handshake_commands(&credentials, self.config.token_format, channel) {
            if self.send(&mut lines, command).await?.is_break() {
                return Ok(());
            }
        }
        tracing::info!("Joined #{}", channel);
        self.set_state(WorkerState::Joined);
        self.set_state(WorkerState::Receiving);
        self.publish(ChatEvent::notice(
            NoticeKind::Connected,
            format!("Connected to #{}.", channel),
        ));
        loop {
            let next = tokio::select! {
                biased;
                _ = self.stop.cancelled() => return Ok(()),
                next = tokio::time::timeout(self.config.read_timeout, lines.next()) => next,
            };

            match next {
                // nothing arrived, go back to checking the stop signal
                Err(_elapsed) => continue,
                Ok(None) => return Err(Error::ConnectionClosed),
                Ok(Some(Err(e))) => return Err(Error::IncomingError(e)),
                Ok(Some(Ok(line))) => {
                    if self.handle_line(&mut lines, &line).await?.is_break() {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn credentials(&self) -> Result<Option<CredentialsPair>, Error<L>> {
        match self
            .unless_stopped(self.config.login_credentials.get_credentials())
            .await
        {
            Some(credentials) => Ok(Some(credentials.map_err(Error::LoginError)?)),
            None => Ok(None),
        }
    }

    async fn handle_line<T>(
        &self,
        lines: &mut Framed<T, LineCodec>,
        line: &str,
    ) -> Result<ControlFlow<()>, Error<L>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        if line.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }
        tracing::trace!("< {}", line);

        let classified = match classify_line(line, self.config.channel()) {
            Ok(classified) => classified,
            Err(e) => {
                tracing::trace!("Dropping malformed line `{}`: {}", line, e);
                self.count_line("malformed");
                return Ok(ControlFlow::Continue(()));
            }
        };

        if let Some(reply) = keepalive::reply_to(&classified) {
            self.count_line("ping");
            return self.send(lines, reply).await;
        }

        match classified {
            ServerLine::Chat { author, body } => {
                self.count_line("chat");
                self.publish(ChatEvent::Message { author, body });
            }
            ServerLine::Ping { .. } | ServerLine::Ignored => self.count_line("ignored"),
        }
        Ok(ControlFlow::Continue(()))
    }

    /// `Break` if the stop signal arrived before the write completed.
    async fn send<T>(
        &self,
        lines: &mut Framed<T, LineCodec>,
        command: ClientCommand,
    ) -> Result<ControlFlow<()>, Error<L>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        if command.command == "PASS" {
            tracing::trace!("> PASS ***");
        } else {
            tracing::trace!("> {}", command);
        }
        self.count_command(&command.command);
        match self.unless_stopped(lines.send(command)).await {
            Some(sent) => {
                sent.map_err(Error::OutgoingError)?;
                Ok(ControlFlow::Continue(()))
            }
            None => Ok(ControlFlow::Break(())),
        }
    }

    /// Emit the one terminal notice and mark the worker closed.
    fn finish(self, result: Result<(), Error<L>>) {
        self.set_state(WorkerState::Stopping);

        let notice = match result {
            Ok(()) => {
                tracing::info!("Connection worker stopped on request");
                ChatEvent::notice(NoticeKind::Stopped, STOPPED_TEXT)
            }
            Err(Error::ConnectionClosed) => {
                tracing::info!("Connection closed by server");
                ChatEvent::notice(NoticeKind::Closed, Error::<L>::ConnectionClosed.to_string())
            }
            Err(e) => {
                tracing::error!("Connection failed: {}", e);
                self.count_failure();
                ChatEvent::notice(NoticeKind::Error, e.to_string())
            }
        };
        self.publish(notice);

        self.set_state(WorkerState::Closed);
        tracing::debug!("Connection worker ended");
    }

    async fn unless_stopped<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            output = future => Some(output),
        }
    }

    fn set_state(&self, state: WorkerState) {
        tracing::debug!("Worker state: {:?}", state);
        self.state_tx.send_replace(state);
    }

    fn publish(&self, event: ChatEvent) {
        #[cfg(feature = "metrics-collection")]
        if let Some(metrics) = &self.config.metrics {
            let label = match event {
                ChatEvent::Message { .. } => "message",
                ChatEvent::SystemNotice { .. } => "notice",
            };
            metrics.events_published.with_label_values(&[label]).inc();
        }
        self.events.push(event);
    }

    fn count_line(&self, _kind: &'static str) {
        #[cfg(feature = "metrics-collection")]
        if let Some(metrics) = &self.config.metrics {
            metrics.lines_received.with_label_values(&[_kind]).inc();
        }
    }

    fn count_command(&self, _command: &str) {
        #[cfg(feature = "metrics-collection")]
        if let Some(metrics) = &self.config.metrics {
            metrics.commands_sent.with_label_values(&[_command]).inc();
        }
    }

    fn count_connection(&self) {
        #[cfg(feature = "metrics-collection")]
        if let Some(metrics) = &self.config.metrics {
            metrics.connections_created.inc();
        }
    }

    fn count_failure(&self) {
        #[cfg(feature = "metrics-collection")]
        if let Some(metrics) = &self.config.metrics {
            metrics.connections_failed.inc();
        }
    }
}
