use thiserror::Error;

pub const MAXARGS: usize = 128;

/// Represents a parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Command {
    /// Program and its arguments.
    pub argv: Vec<String>,
    /// True when the line ended with a bare `&`.
    pub background: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Too many arguments")]
    TooManyArgs,
    #[error("Unmatched quote")]
    UnmatchedQuote,
}

/// A token and whether any part of it was quoted. A quoted `&` is an
/// ordinary argument, not a background marker.
#[derive(Debug, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

/// Parses the input command line into an argument vector and a background
/// flag. The background flag is set iff the last token is a literal `&`,
/// which is then dropped from `argv`.
pub fn parse_command_line(cmdline: &str) -> Result<Command, ParseError> {
    let mut tokens = tokenize(cmdline)?;

    let background = tokens
        .last()
        .is_some_and(|t| !t.quoted && t.text == "&");
    if background {
        tokens.pop();
    }

    if tokens.len() > MAXARGS - 1 {
        return Err(ParseError::TooManyArgs);
    }

    Ok(Command {
        argv: tokens.into_iter().map(|t| t.text).collect(),
        background,
    })
}

/// Splits the input on whitespace. Single or double quotes group a span,
/// spaces included, into the surrounding token.
fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = Token {
            text: String::new(),
            quoted: false,
        };
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '\'' || c == '"' {
                token.quoted = true;
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(q) => token.text.push(q),
                        None => return Err(ParseError::UnmatchedQuote),
                    }
                }
            } else {
                token.text.push(c);
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}
