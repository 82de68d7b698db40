//! Splits one request line into a command word and its arguments.
//!
//! The command word is `[a-z][a-z0-9_]*` and is never quoted. Arguments are
//! either bare (no control characters, spaces, or quotes) or wrapped in double
//! quotes, where a backslash takes the following character literally. Tokens
//! stay strings; validators coerce them later.

use thiserror::Error;

use super::ack::AckError;

/// Reasons a request line cannot be tokenized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum TokenizeError {
    /// Blank or whitespace-only line.
    #[error("No command given")]
    NoCommand,
    /// The command word is preceded by whitespace.
    #[error("Letter expected")]
    LetterExpected,
    /// The command word contains characters outside `[a-z0-9_]`.
    #[error("Invalid word character")]
    InvalidWordCharacter,
    /// A closing quote is directly followed by a non-space character.
    #[error("Space expected after closing '\"'")]
    SpaceExpected {
        /// Command word of the request.
        command: String,
    },
    /// A quoted argument never ends.
    #[error("Missing closing '\"'")]
    MissingClosingQuote {
        /// Command word of the request.
        command: String,
    },
    /// A bare argument contains a quote or control character.
    #[error("Invalid unquoted character")]
    InvalidUnquotedCharacter {
        /// Command word of the request.
        command: String,
    },
}

impl From<TokenizeError> for AckError {
    fn from(error: TokenizeError) -> Self {
        let message = error.to_string();
        match error {
            TokenizeError::NoCommand
            | TokenizeError::LetterExpected
            | TokenizeError::InvalidWordCharacter => Self::malformed(message),
            TokenizeError::SpaceExpected { command }
            | TokenizeError::MissingClosingQuote { command }
            | TokenizeError::InvalidUnquotedCharacter { command } => {
                Self::arg(message).with_command(command)
            }
        }
    }
}

/// Splits `line` into the command word followed by its unescaped arguments.
pub(crate) fn split(line: &str) -> Result<Vec<String>, TokenizeError> {
    if line.trim().is_empty() {
        return Err(TokenizeError::NoCommand);
    }
    let unindented = line.trim_start();
    let (command, remainder) = command_word(unindented)?;
    if unindented.len() != line.len() {
        return Err(TokenizeError::LetterExpected);
    }

    let mut tokens = vec![command.to_owned()];
    let mut rest = remainder.trim_start();
    while !rest.is_empty() {
        let (token, after) = argument(rest).map_err(|kind| kind.into_error(command))?;
        tokens.push(token);
        rest = after.trim_start();
    }
    Ok(tokens)
}

fn command_word(text: &str) -> Result<(&str, &str), TokenizeError> {
    if !text.starts_with(|first: char| first.is_ascii_lowercase()) {
        return Err(TokenizeError::InvalidWordCharacter);
    }
    let end = text
        .find(|next: char| !is_word_character(next))
        .unwrap_or(text.len());
    let (word, remainder) = text.split_at(end);
    if remainder.is_empty() || remainder.starts_with(char::is_whitespace) {
        Ok((word, remainder))
    } else {
        Err(TokenizeError::InvalidWordCharacter)
    }
}

const fn is_word_character(candidate: char) -> bool {
    candidate.is_ascii_lowercase() || candidate.is_ascii_digit() || candidate == '_'
}

const fn is_bare_character(candidate: char) -> bool {
    candidate > ' ' && candidate != '"' && candidate != '\''
}

#[derive(Debug, Clone, Copy)]
enum ArgumentFault {
    SpaceExpected,
    MissingClosingQuote,
    InvalidUnquotedCharacter,
}

impl ArgumentFault {
    fn into_error(self, command: &str) -> TokenizeError {
        let command = command.to_owned();
        match self {
            Self::SpaceExpected => TokenizeError::SpaceExpected { command },
            Self::MissingClosingQuote => TokenizeError::MissingClosingQuote { command },
            Self::InvalidUnquotedCharacter => TokenizeError::InvalidUnquotedCharacter { command },
        }
    }
}

/// Consumes one argument from the front of `text`, which is non-empty and
/// starts with a non-space character.
fn argument(text: &str) -> Result<(String, &str), ArgumentFault> {
    if let Some(quoted) = text.strip_prefix('"') {
        let (token, after) = quoted_argument(quoted)?;
        return if after.is_empty() || after.starts_with(char::is_whitespace) {
            Ok((token, after))
        } else {
            Err(ArgumentFault::SpaceExpected)
        };
    }

    let end = text
        .find(|next: char| !is_bare_character(next) || next.is_whitespace())
        .unwrap_or(text.len());
    let (token, after) = text.split_at(end);
    if token.is_empty() || !(after.is_empty() || after.starts_with(char::is_whitespace)) {
        return Err(ArgumentFault::InvalidUnquotedCharacter);
    }
    Ok((token.to_owned(), after))
}

/// Reads up to the closing quote, unescaping backslash pairs. `text` starts
/// just after the opening quote.
fn quoted_argument(text: &str) -> Result<(String, &str), ArgumentFault> {
    let mut token = String::new();
    let mut chars = text.char_indices();
    while let Some((offset, current)) = chars.next() {
        match current {
            '"' => {
                let after = text
                    .get(offset + 1..)
                    .ok_or(ArgumentFault::MissingClosingQuote)?;
                return Ok((token, after));
            }
            '\\' => match chars.next() {
                Some((_, '\n')) | None => return Err(ArgumentFault::MissingClosingQuote),
                Some((_, escaped)) => token.push(escaped),
            },
            other => token.push(other),
        }
    }
    Err(ArgumentFault::MissingClosingQuote)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        split(line).expect("line should tokenize")
    }

    #[rstest]
    #[case("status", &["status"])]
    #[case("play 3", &["play", "3"])]
    #[case("add \"Artist - Song.mp3\"", &["add", "Artist - Song.mp3"])]
    #[case("find artist \"Bob \\\"The\\\" Builder\"", &["find", "artist", "Bob \"The\" Builder"])]
    #[case("find any \"back\\\\slash\"", &["find", "any", "back\\slash"])]
    #[case("playlistinfo   5:9  ", &["playlistinfo", "5:9"])]
    #[case("search any \"\"", &["search", "any", ""])]
    #[case("list_all_4 x", &["list_all_4", "x"])]
    #[case("add \"æøå\" ☺", &["add", "æøå", "☺"])]
    fn splits_valid_lines(#[case] line: &str, #[case] expected: &[&str]) {
        assert_eq!(tokens(line), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t")]
    fn blank_lines_have_no_command(#[case] line: &str) {
        assert_eq!(split(line), Err(TokenizeError::NoCommand));
    }

    #[rstest]
    #[case(" status", TokenizeError::LetterExpected)]
    #[case("Status", TokenizeError::InvalidWordCharacter)]
    #[case("9lives", TokenizeError::InvalidWordCharacter)]
    #[case("sta-tus", TokenizeError::InvalidWordCharacter)]
    #[case("\"status\"", TokenizeError::InvalidWordCharacter)]
    fn rejects_malformed_command_words(#[case] line: &str, #[case] expected: TokenizeError) {
        assert_eq!(split(line), Err(expected));
    }

    #[rstest]
    #[case("play \"abc", "Missing closing '\"'")]
    #[case("play \"abc\\\"", "Missing closing '\"'")]
    #[case("play \"abc\"def", "Space expected after closing '\"'")]
    #[case("play ab\"c", "Invalid unquoted character")]
    #[case("play 'abc'", "Invalid unquoted character")]
    #[case("play a\u{1}b", "Invalid unquoted character")]
    fn rejects_malformed_arguments(#[case] line: &str, #[case] message: &str) {
        let error = split(line).expect_err("line should be rejected");
        assert_eq!(error.to_string(), message);
        let ack = AckError::from(error);
        assert_eq!(ack.render(0), format!("ACK [2@0] {{play}} {message}"));
    }

    #[test]
    fn command_word_errors_report_an_empty_command() {
        let ack = AckError::from(split("").expect_err("blank"));
        assert_eq!(ack.render(0), "ACK [5@0] {} No command given");
    }

    #[rstest]
    #[case("plain")]
    #[case("with spaces and \"quotes\"")]
    #[case("trailing backslash \\")]
    #[case("tab\tand newline-free control \u{7}")]
    fn quoted_content_round_trips(#[case] content: &str) {
        let escaped = content.replace('\\', "\\\\").replace('"', "\\\"");
        let line = format!("add \"{escaped}\"");
        assert_eq!(tokens(&line), ["add", content]);
    }
}
