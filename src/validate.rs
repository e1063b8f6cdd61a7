//! Validation and normalization of channel names typed in by a user.

use thiserror::Error;

/// Validate a given login name. Returns an error detailing the issue
/// if the string is found to be invalid.
pub fn validate_login(channel_login: &str) -> Result<(), Error> {
    let mut length: usize = 0;
    for char in channel_login.chars() {
        if !(matches!(char, 'a'..='z' | '0'..='9' | '_')) {
            return Err(Error::InvalidCharacter {
                position: length,
                character: char,
            });
        }

        length += 1;
        if length > 25 {
            return Err(Error::TooLong);
        }
    }
    if length < 1 {
        return Err(Error::TooShort);
    }

    Ok(())
}

/// Turn free-form user input into a validated, lowercase channel login.
///
/// Accepted forms are a bare name (`Sodapoppin`, surrounding whitespace allowed) or
/// a channel URL (`https://www.twitch.tv/sodapoppin/`), in which case the last
/// path segment is used.
pub fn normalize_channel_input(input: &str) -> Result<String, Error> {
    let trimmed = input.trim();

    let name = if trimmed.to_ascii_lowercase().contains("twitch.tv/") {
        trimmed
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    } else {
        trimmed
    };

    let login = name.to_lowercase();
    validate_login(&login)?;
    Ok(login)
}

/// Types of errors that can be found as a result of validating a channel login name. See the enum
/// variants for details
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// A character not allowed in login names was found at a certain position in the given string
    #[error("Invalid character `{character}` encountered at position `{position}`")]
    InvalidCharacter {
        /// Index of the found invalid character in the original string
        position: usize,
        /// The invalid character
        character: char,
    },
    /// Login name exceeds maximum length of 25 characters
    #[error("Login name exceeds maximum length of 25 characters")]
    TooLong,
    /// Login name is too short (must be at least one character long)
    #[error("Login name is too short (must be at least one character long)")]
    TooShort,
}
