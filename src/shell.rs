use crate::builtins::{handle_builtin, Builtin};
use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::exec::execute_command;
use crate::input::LineReader;
use crate::jobs::JobControl;
use crate::parser::parse_command_line;
use std::io::{self, Write};
use tracing::debug;

/// Global prompt string.
pub static PROMPT: &str = "msh> ";

/// Whether the read loop keeps going after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs the main shell loop: prints the prompt (if enabled), reads input and
/// evaluates commands until end of input or `quit`.
///
/// User errors are printed and the loop continues; a fatal error ends the
/// loop and is handed back to the caller.
pub fn run_shell(config: &ShellConfig, control: &JobControl) -> Result<(), ShellError> {
    let mut reader = LineReader::new(config);
    let result = read_eval_loop(&mut reader, control);
    reader.save_history();
    result
}

fn read_eval_loop(reader: &mut LineReader, control: &JobControl) -> Result<(), ShellError> {
    while let Some(cmdline) = reader.read_line()? {
        debug!("Received command: {}", cmdline.trim_end());
        match eval(&cmdline, control) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => println!("{}", err),
        }
        io::stdout().flush()?;
    }
    if !control.lock().is_empty() {
        debug!("leaving with jobs still running");
    }
    io::stdout().flush()?;
    Ok(())
}

/// Evaluates one command line.
///
/// Builtins run immediately. Anything else is launched as a job; a
/// foreground job is waited for before returning, a background one is not.
pub fn eval(cmdline: &str, control: &JobControl) -> Result<Flow, ShellError> {
    let command = parse_command_line(cmdline)?;
    if command.argv.is_empty() {
        return Ok(Flow::Continue);
    }
    match handle_builtin(&command, control)? {
        Builtin::Quit => Ok(Flow::Quit),
        Builtin::Handled => Ok(Flow::Continue),
        Builtin::NotBuiltin => {
            execute_command(&command, cmdline, control)?;
            Ok(Flow::Continue)
        }
    }
}
