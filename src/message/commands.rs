//! Commands sent from the client to the chat server.

use smallvec::SmallVec;
use std::fmt;

struct RawIRCDisplay<'a, T: AsRawIRC> {
    delegate: &'a T,
}

impl<T: AsRawIRC> fmt::Display for RawIRCDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.delegate.format_as_raw_irc(f)
    }
}

/// Anything that can be written out as one line of the IRC wire protocol,
/// without the trailing CRLF.
pub trait AsRawIRC {
    /// Write the raw line to the given formatter.
    fn format_as_raw_irc(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Format the raw line into a new `String`.
    fn as_raw_irc(&self) -> String
    where
        Self: Sized,
    {
        format!("{}", RawIRCDisplay { delegate: self })
    }
}

/// A single outgoing command, e.g. `JOIN #channel` or `PONG :tmi.twitch.tv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCommand {
    /// Command keyword, uppercase.
    pub command: String,
    /// Middle parameters. A parameter that contains a space, is empty or starts
    /// with `:` is written as the trailing parameter and ends the line.
    pub params: SmallVec<[String; 2]>,
    /// Parameter that is always written in trailing (`:`-prefixed) form.
    pub trailing: Option<String>,
}

/// Build a [`ClientCommand`] from a command keyword and its middle parameters.
///
/// ```
/// # use twitch_chat_feed::irc;
/// # use twitch_chat_feed::message::AsRawIRC;
/// assert_eq!(irc!["JOIN", "#pajlada"].as_raw_irc(), "JOIN #pajlada");
/// ```
#[macro_export]
macro_rules! irc {
    ($command:expr $(, $argument:expr )* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut params = $crate::__SmallVec::<[String; 2]>::new();
            $(
                params.push(String::from($argument));
            )*
            $crate::message::ClientCommand::new_simple(String::from($command), params)
        }
    };
}

impl ClientCommand {
    /// Create a command with only middle parameters.
    pub fn new_simple(command: String, params: SmallVec<[String; 2]>) -> ClientCommand {
        ClientCommand {
            command,
            params,
            trailing: None,
        }
    }

    /// Set the trailing parameter of this command.
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> ClientCommand {
        self.trailing = Some(trailing.into());
        self
    }

    /// Whether any part of this command would break line framing.
    pub fn contains_newline(&self) -> bool {
        let has_newline = |s: &str| s.contains(['\r', '\n']);
        has_newline(&self.command)
            || self.params.iter().any(|p| has_newline(p.as_str()))
            || self.trailing.as_deref().is_some_and(has_newline)
    }
}

impl AsRawIRC for ClientCommand {
    fn format_as_raw_irc(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;

        for param in self.params.iter() {
            if !param.contains(' ') && !param.is_empty() && !param.starts_with(':') {
                write!(f, " {}", param)?;
            } else {
                // trailing parameter, nothing can follow it
                return write!(f, " :{}", param);
            }
        }

        if let Some(trailing) = &self.trailing {
            write!(f, " :{}", trailing)?;
        }

        Ok(())
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.format_as_raw_irc(f)
    }
}
