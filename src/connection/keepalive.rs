use crate::irc;
use crate::message::{ClientCommand, ServerLine};

/// Argument of every pong, regardless of what the ping carried.
pub const PONG_ARGUMENT: &str = "tmi.twitch.tv";

/// The reply a line requires, if any. Only liveness probes are answered.
pub(crate) fn reply_to(line: &ServerLine) -> Option<ClientCommand> {
    match line {
        ServerLine::Ping { .. } => Some(irc!["PONG"].with_trailing(PONG_ARGUMENT)),
        ServerLine::Chat { .. } | ServerLine::Ignored => None,
    }
}
