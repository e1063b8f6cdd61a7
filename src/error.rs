use crate::login::LoginCredentials;
use crate::transport::FramingError;
use thiserror::Error;

/// Errors that end a chat connection. They never cross the worker boundary as
/// values; the consumer sees their `Display` form in the terminal notice.
#[derive(Error, Debug)]
pub enum Error<L: LoginCredentials> {
    /// Could not open the TCP connection.
    #[error("Failed to connect to chat: {0}")]
    ConnectError(std::io::Error),
    /// The credential source failed.
    #[error("Failed to get login credentials: {0}")]
    LoginError(L::Error),
    /// Reading from the connection failed.
    #[error("Failed to read from chat: {0}")]
    IncomingError(FramingError),
    /// Writing to the connection failed (handshake or pong).
    #[error("Failed to send to chat: {0}")]
    OutgoingError(FramingError),
    /// The server ended the connection.
    #[error("Connection closed by server.")]
    ConnectionClosed,
}
