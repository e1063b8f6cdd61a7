//! Events handed to the consumer, and the wire-level pieces they are made from.

mod commands;
mod line;

pub use commands::{AsRawIRC, ClientCommand};
pub use line::{LineParseError, PING_COMMAND, PRIVMSG_COMMAND, ServerLine, classify_line};

#[cfg(feature = "with-serde")]
use {serde::Deserialize, serde::Serialize};

/// Category of a [`ChatEvent::SystemNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub enum NoticeKind {
    /// The handshake was sent, chat messages may follow.
    Connected,
    /// The connection failed or broke, no further events follow.
    Error,
    /// The server closed the connection, no further events follow.
    Closed,
    /// The worker was asked to stop, no further events follow.
    Stopped,
}

impl NoticeKind {
    /// Whether a notice of this kind is the last event of a connection.
    pub fn is_terminal(self) -> bool {
        !matches!(self, NoticeKind::Connected)
    }
}

/// Something for the display to show.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub enum ChatEvent {
    /// A chat line from the joined channel.
    Message {
        /// Login name of the sender.
        author: String,
        /// Message text with surrounding whitespace removed.
        body: String,
    },
    /// Connection lifecycle notice.
    SystemNotice {
        /// What happened.
        kind: NoticeKind,
        /// Human readable description.
        text: String,
    },
}

impl ChatEvent {
    pub(crate) fn notice(kind: NoticeKind, text: impl Into<String>) -> ChatEvent {
        ChatEvent::SystemNotice {
            kind,
            text: text.into(),
        }
    }

    /// Whether this is the last event a connection emits.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::SystemNotice { kind, .. } if kind.is_terminal())
    }
}

impl std::fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatEvent::Message { author, body } => write!(f, "{}: {}", author, body),
            ChatEvent::SystemNotice { text, .. } => write!(f, "System: {}", text),
        }
    }
}
