use crate::error::ShellError;
use crate::jobs::{announce, JobControl, JobState};
use crate::parser::Command;
use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::{fork, setpgid, write, ForkResult, Pid};
use std::ffi::{c_char, CString};
use std::io;
use std::ptr;
use tracing::debug;

/// Executes an external command as a new job.
///
/// The table lock is held from before the fork until the job is registered
/// (and, for background jobs, announced), so the reaper cannot see the
/// child before it is in the table. Foreground jobs are then waited on.
pub fn execute_command(cmd: &Command, cmdline: &str, control: &JobControl) -> Result<(), ShellError> {
    let argv = cmd
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ShellError::NulByte(cmd.argv[0].clone()))?;
    let ptrs = exec_array(&argv);
    let not_found = format!("{}: Command not found\n", cmd.argv[0]);
    let state = if cmd.background {
        JobState::Background
    } else {
        JobState::Foreground
    };

    let pid = {
        let mut table = control.lock();
        let pid = spawn_job(&argv, &ptrs, not_found.as_bytes())?;
        debug!("forked ({}) for {:?}", pid, cmd.argv);
        match table.insert(pid, state, cmdline) {
            Ok(jid) => {
                debug!("{} job(s) tracked", table.len());
                if let (JobState::Background, Some(job)) = (state, table.find_by_jid(jid)) {
                    announce(&mut io::stdout(), job)?;
                }
            }
            Err(e) => println!("{}", e),
        }
        pid
    };

    if state == JobState::Foreground {
        control.wait_fg(pid);
    }
    Ok(())
}

/// The NULL-terminated pointer array `execvp(3)` expects. The pointers
/// borrow from `argv`, which must outlive every use of the array.
fn exec_array(argv: &[CString]) -> Vec<*const c_char> {
    argv.iter()
        .map(|arg| arg.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect()
}

/// Forks a child that leads its own process group and execs `argv`.
/// Everything the child needs, `ptrs` included, is allocated before the
/// fork; afterwards it only makes raw system calls.
fn spawn_job(argv: &[CString], ptrs: &[*const c_char], not_found: &[u8]) -> Result<Pid, ShellError> {
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
            restore_default_signals();
            unsafe {
                libc::execvp(argv[0].as_ptr(), ptrs.as_ptr());
            }
            let _ = write(libc::STDERR_FILENO, not_found);
            unsafe { libc::_exit(1) }
        }
        Ok(ForkResult::Parent { child }) => {
            // Also set from this side so the group exists before anyone
            // signals it. Fails harmlessly once the child has exec'ed.
            let _ = setpgid(child, child);
            Ok(child)
        }
        Err(err) => Err(ShellError::Fork(err)),
    }
}

/// Puts back the default dispositions for the signals the shell catches,
/// plus SIGPIPE, which the Rust runtime ignores and exec would preserve.
fn restore_default_signals() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in [
        Signal::SIGINT,
        Signal::SIGTSTP,
        Signal::SIGCHLD,
        Signal::SIGQUIT,
        Signal::SIGPIPE,
    ] {
        unsafe {
            let _ = signal::sigaction(sig, &default);
        }
    }
}
