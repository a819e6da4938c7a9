use crate::error::ShellError;
use crate::jobs::{announce, list_jobs, JobControl, JobState};
use crate::parser::Command;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io;
use tracing::{debug, warn};

/// What the read loop should do after a command was looked at.
#[derive(Debug, PartialEq, Eq)]
pub enum Builtin {
    /// Not a builtin; run it as an external command.
    NotBuiltin,
    Handled,
    Quit,
}

/// Checks if the command is a built-in command and, if so, executes it.
/// Supported built-ins are "quit", "jobs", "fg", "bg" and a lone "&".
/// Builtins never fork. Only a failure to write to stdout is an error.
pub fn handle_builtin(cmd: &Command, control: &JobControl) -> Result<Builtin, ShellError> {
    let Some(name) = cmd.argv.first() else {
        return Ok(Builtin::Handled);
    };
    match name.as_str() {
        "quit" => Ok(Builtin::Quit),
        "jobs" => {
            list_jobs(&mut io::stdout(), &control.lock())?;
            Ok(Builtin::Handled)
        }
        "fg" | "bg" => {
            do_bgfg(cmd, control)?;
            Ok(Builtin::Handled)
        }
        "&" => Ok(Builtin::Handled),
        _ => Ok(Builtin::NotBuiltin),
    }
}

/// A parsed `bg`/`fg` argument.
#[derive(Debug, PartialEq, Eq)]
enum JobSpec {
    Jid(usize),
    Pid(Pid),
}

/// Parses `%jid` or a raw pid. Both must be positive integers.
fn parse_jobspec(arg: &str) -> Option<JobSpec> {
    match arg.strip_prefix('%') {
        Some(jid) => jid.parse::<usize>().ok().filter(|&n| n > 0).map(JobSpec::Jid),
        None => arg
            .parse::<i32>()
            .ok()
            .filter(|&n| n > 0)
            .map(|n| JobSpec::Pid(Pid::from_raw(n))),
    }
}

/// Executes the builtin bg and fg commands.
///
/// `fg` moves the job to the foreground, continues it if it was stopped and
/// then blocks until it leaves the foreground. `bg` announces the job,
/// marks it running in the background and continues it if needed.
fn do_bgfg(cmd: &Command, control: &JobControl) -> Result<(), ShellError> {
    let name = cmd.argv[0].as_str();
    let Some(arg) = cmd.argv.get(1) else {
        println!("{} command requires PID or %jobid argument", name);
        return Ok(());
    };
    let Some(spec) = parse_jobspec(arg) else {
        println!("{}: argument must be a PID or %jobid", name);
        return Ok(());
    };
    let target = if name == "fg" {
        JobState::Foreground
    } else {
        JobState::Background
    };

    let pid = {
        let mut table = control.lock();
        let job = match spec {
            JobSpec::Jid(jid) => table
                .find_by_jid(jid)
                .ok_or_else(|| format!("%{}: No such job", jid)),
            JobSpec::Pid(pid) => table
                .find_by_pid(pid)
                .ok_or_else(|| format!("({}): No such process", pid)),
        };
        let job = match job {
            Ok(job) => job,
            Err(msg) => {
                println!("{}", msg);
                return Ok(());
            }
        };
        let pid = job.pid;
        if target == JobState::Background {
            announce(&mut io::stdout(), job)?;
        }

        let previous = match table.set_state(pid, target) {
            Ok(previous) => previous,
            Err(err) => {
                println!("{}: {}", name, err);
                return Ok(());
            }
        };
        debug!("{}: ({}) {} -> {}", name, pid, previous, target);
        if previous == JobState::Stopped {
            if let Err(err) = kill(Pid::from_raw(-pid.as_raw()), Signal::SIGCONT) {
                warn!("kill (cont) -{}: {}", pid, err);
            }
        }
        pid
    };

    if target == JobState::Foreground {
        control.wait_fg(pid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_command_line;

    fn run(line: &str, control: &JobControl) -> Builtin {
        handle_builtin(&parse_command_line(line).unwrap(), control).unwrap()
    }

    #[test]
    fn test_parse_jobspec() {
        assert_eq!(parse_jobspec("%3"), Some(JobSpec::Jid(3)));
        assert_eq!(parse_jobspec("1234"), Some(JobSpec::Pid(Pid::from_raw(1234))));
        assert_eq!(parse_jobspec("%0"), None);
        assert_eq!(parse_jobspec("%"), None);
        assert_eq!(parse_jobspec("%x"), None);
        assert_eq!(parse_jobspec("0"), None);
        assert_eq!(parse_jobspec("-5"), None);
        assert_eq!(parse_jobspec("abc"), None);
    }

    #[test]
    fn test_dispatch() {
        let control = JobControl::new();
        assert_eq!(run("quit\n", &control), Builtin::Quit);
        assert_eq!(run("jobs\n", &control), Builtin::Handled);
        assert_eq!(run("& &\n", &control), Builtin::Handled);
        assert_eq!(run("fg\n", &control), Builtin::Handled);
        assert_eq!(run("bg 999999\n", &control), Builtin::Handled);
        assert_eq!(run("/bin/echo hi\n", &control), Builtin::NotBuiltin);
        assert_eq!(run("quitter\n", &control), Builtin::NotBuiltin);
    }

    #[test]
    fn test_unresolved_jobspec_leaves_table_alone() {
        let control = JobControl::new();
        control
            .lock()
            .insert(Pid::from_raw(i32::MAX), JobState::Background, "x &\n")
            .unwrap();
        run("fg %2\n", &control);
        run("bg 999999\n", &control);
        let table = control.lock();
        assert_eq!(table.len(), 1);
        assert_eq!(table.fg_pid(), None);
    }
}
