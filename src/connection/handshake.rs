use crate::config::TokenFormat;
use crate::irc;
use crate::login::CredentialsPair;
use crate::message::ClientCommand;
use smallvec::SmallVec;

/// The commands sent right after connecting, in order: `PASS`, `NICK`, `JOIN`.
///
/// Nothing is awaited in between; the server's replies are treated like any
/// other incoming traffic.
pub(crate) fn handshake_commands(
    credentials: &CredentialsPair,
    token_format: TokenFormat,
    channel: &str,
) -> SmallVec<[ClientCommand; 3]> {
    let mut commands = SmallVec::<[ClientCommand; 3]>::new();
    commands.push(irc!["PASS", token_format.format_pass(&credentials.token)]);
    commands.push(irc!["NICK", credentials.login.as_str()]);
    commands.push(irc!["JOIN", format!("#{}", channel)]);
    commands
}
