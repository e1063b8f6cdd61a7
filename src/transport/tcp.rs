//! Plain TCP connections to the chat server.

use super::LineCodec;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// A plain TCP connection framed into protocol lines.
pub type TcpLines = Framed<TcpStream, LineCodec>;

/// Open a plain TCP connection to `host:port`, giving up after `connect_timeout`.
pub async fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    codec: LineCodec,
) -> io::Result<TcpLines> {
    tracing::debug!("Connecting to {}:{}", host, port);

    let socket = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connecting to {}:{} timed out", host, port),
            )
        })??;
    // chat lines are small and the pong is time sensitive
    socket.set_nodelay(true)?;

    Ok(Framed::new(socket, codec))
}
