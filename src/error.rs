use crate::parser::ParseError;
use rustyline::error::ReadlineError;
use thiserror::Error;

/// Everything that can go wrong while the shell evaluates input.
///
/// Fatal variants leave the job table in a state the shell can no longer
/// vouch for, so the read loop stops and the process exits with status 1.
/// The rest are reported on the output stream and the loop carries on.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("fork error: {0}")]
    Fork(nix::Error),
    #[error("signal setup error: {0}")]
    Signals(std::io::Error),
    #[error("read error: {0}")]
    Input(#[from] std::io::Error),
    #[error("readline error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("waitpid error: unexpected child status {0}")]
    UnexpectedStatus(String),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}: argument contains a NUL byte")]
    NulByte(String),
}

impl ShellError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ShellError::Parse(_) | ShellError::NulByte(_))
    }
}
