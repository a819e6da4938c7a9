use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::shell::PROMPT;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Where command lines come from.
///
/// A terminal with the prompt enabled gets a line editor with history;
/// anything else (pipes, files, `-p`) is read as plain lines.
pub enum LineReader {
    Editor {
        editor: DefaultEditor,
        history_file: Option<PathBuf>,
    },
    Plain {
        emit_prompt: bool,
    },
}

impl LineReader {
    pub fn new(config: &ShellConfig) -> Self {
        if config.emit_prompt && io::stdin().is_terminal() {
            match DefaultEditor::new() {
                Ok(mut editor) => {
                    if let Some(path) = &config.history_file {
                        if let Err(err) = editor.load_history(path) {
                            debug!("no history loaded from {}: {}", path.display(), err);
                        }
                    }
                    return LineReader::Editor {
                        editor,
                        history_file: config.history_file.clone(),
                    };
                }
                Err(err) => warn!("line editor unavailable: {}", err),
            }
        }
        LineReader::Plain {
            emit_prompt: config.emit_prompt,
        }
    }

    /// Returns the next line with its trailing newline, or `None` at end of
    /// input.
    pub fn read_line(&mut self) -> Result<Option<String>, ShellError> {
        match self {
            LineReader::Editor { editor, .. } => match editor.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    Ok(Some(line + "\n"))
                }
                Err(ReadlineError::Interrupted) => Ok(Some("\n".to_string())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(err) => Err(err.into()),
            },
            LineReader::Plain { emit_prompt } => {
                if *emit_prompt {
                    print!("{}", PROMPT);
                    io::stdout().flush()?;
                }
                let mut cmdline = String::new();
                match io::stdin().lock().read_line(&mut cmdline)? {
                    0 => Ok(None),
                    _ => Ok(Some(cmdline)),
                }
            }
        }
    }

    pub fn save_history(&mut self) {
        if let LineReader::Editor {
            editor,
            history_file: Some(path),
        } = self
        {
            if let Err(err) = editor.save_history(path) {
                warn!("could not save history to {}: {}", path.display(), err);
            }
        }
    }
}
