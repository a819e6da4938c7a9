use clap::Parser;
use std::path::PathBuf;

/// Command-line flags. clap's own help flag is disabled so that `-h` prints
/// the shell's usage text.
#[derive(Debug, Parser)]
#[command(name = "shell", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Print this message.
    #[arg(short = 'h')]
    pub help: bool,
    /// Print additional diagnostic information.
    #[arg(short = 'v')]
    pub verbose: bool,
    /// Do not emit a command prompt.
    #[arg(short = 'p')]
    pub no_prompt: bool,
}

/// Runtime configuration derived from the flags.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub emit_prompt: bool,
    pub verbose: bool,
    /// Where the interactive line editor keeps its history.
    pub history_file: Option<PathBuf>,
}

impl From<&Cli> for ShellConfig {
    fn from(cli: &Cli) -> Self {
        ShellConfig {
            emit_prompt: !cli.no_prompt,
            verbose: cli.verbose,
            history_file: dirs_next::home_dir().map(|home| home.join(".msh_history")),
        }
    }
}
