//! Classification of single lines received from the chat server.
//!
//! Only two kinds of server traffic matter to the feed: liveness probes (`PING`)
//! and channel messages (`PRIVMSG`). Everything else the server sends (numeric
//! replies, `JOIN` echoes, capability replies) is classified as [`ServerLine::Ignored`].

use thiserror::Error;

/// Command keyword of the server's liveness probe.
pub const PING_COMMAND: &str = "PING";

/// Command keyword of a broadcast chat message.
pub const PRIVMSG_COMMAND: &str = "PRIVMSG";

/// Result of classifying one framed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// Liveness probe that has to be answered right away.
    Ping {
        /// Argument of the probe, e.g. `tmi.twitch.tv`.
        argument: Option<String>,
    },
    /// Chat message sent to the joined channel.
    Chat {
        /// Login name of the sender.
        author: String,
        /// Message text, trimmed.
        body: String,
    },
    /// Any other traffic, including messages addressed to other channels.
    Ignored,
}

/// Ways a chat message line can be malformed.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum LineParseError {
    /// The chat message does not start with a `:nick!user@host` prefix
    #[error("chat message has no `:` prefix")]
    MissingPrefix,
    /// The prefix has no `!` separating the nickname from the rest
    #[error("no `!` found in message prefix")]
    MissingNickDelimiter,
    /// The nickname part of the prefix is empty
    #[error("nickname in message prefix is empty")]
    EmptyNickname,
    /// The nickname contains characters that are never part of a login name
    #[error("nickname in message prefix contains framing characters")]
    InvalidNickname,
    /// No channel follows the `PRIVMSG` command
    #[error("no target channel after the PRIVMSG command")]
    MissingTarget,
    /// No `:` introducing the message text follows the target channel
    #[error("no `:` introducing the message text after the target channel")]
    MissingBodyDelimiter,
}

/// Split off the first space-delimited token of `s`.
fn next_token(s: &str) -> (&str, &str) {
    match s.split_once(' ') {
        Some((token, rest)) => (token, rest),
        None => (s, ""),
    }
}

/// Classify `line` for a connection joined to `channel` (lowercase, without `#`).
///
/// The line is expected to be without its CRLF terminator. A leading IRCv3 tag
/// section (`@key=value;... `) is skipped.
pub fn classify_line(line: &str, channel: &str) -> Result<ServerLine, LineParseError> {
    let mut rest = line;

    if rest.starts_with('@') {
        rest = next_token(rest).1;
    }

    let prefix = match rest.strip_prefix(':') {
        Some(without_colon) => {
            let (prefix, remainder) = next_token(without_colon);
            rest = remainder;
            Some(prefix)
        }
        None => None,
    };

    let (command, params) = next_token(rest);

    if command.eq_ignore_ascii_case(PING_COMMAND) {
        let argument = params.strip_prefix(':').unwrap_or(params);
        return Ok(ServerLine::Ping {
            argument: (!argument.is_empty()).then(|| argument.to_owned()),
        });
    }

    if !command.eq_ignore_ascii_case(PRIVMSG_COMMAND) {
        return Ok(ServerLine::Ignored);
    }

    let (target, after_target) = next_token(params);
    if target.is_empty() {
        return Err(LineParseError::MissingTarget);
    }

    // only one channel is ever joined, but lines for other channels are still
    // filtered out here
    if target.strip_prefix('#') != Some(channel) {
        return Ok(ServerLine::Ignored);
    }

    let prefix = prefix.ok_or(LineParseError::MissingPrefix)?;
    let (author, _) = prefix
        .split_once('!')
        .ok_or(LineParseError::MissingNickDelimiter)?;
    if author.is_empty() {
        return Err(LineParseError::EmptyNickname);
    }
    if author.contains([':', '\r', '\n', '\0']) {
        return Err(LineParseError::InvalidNickname);
    }

    let (_, body) = after_target
        .split_once(':')
        .ok_or(LineParseError::MissingBodyDelimiter)?;

    Ok(ServerLine::Chat {
        author: author.to_owned(),
        body: body.trim().to_owned(),
    })
}
