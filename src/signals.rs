use crate::error::ShellError;
use crate::jobs::{JobControl, JobState, JobTable};
use crate::utils::app_error;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use signal_hook::{consts::signal::*, iterator::Signals};
use std::io::{self, Write};
use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Installs signal handlers for the shell and starts the thread that acts
/// on them:
/// - SIGCHLD: reaps every child with a pending status change.
/// - SIGINT (Ctrl-C), SIGTSTP (Ctrl-Z): forwarded to the foreground job's
///   process group. The shell itself is never interrupted or stopped.
/// - SIGQUIT: prints a termination message and exits.
///
/// The registered low-level handler only records the signal and wakes this
/// thread through a pipe; the job table is only touched here, under its lock.
pub fn install_signal_handlers(control: Arc<JobControl>) -> Result<JoinHandle<()>, ShellError> {
    let mut signals =
        Signals::new([SIGCHLD, SIGINT, SIGTSTP, SIGQUIT]).map_err(ShellError::Signals)?;
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for signal in signals.forever() {
                match signal {
                    SIGCHLD => reap_children(&control),
                    SIGINT | SIGTSTP => relay_to_foreground(&control, signal),
                    SIGQUIT => {
                        println!("Terminating after receipt of SIGQUIT signal");
                        let _ = io::stdout().flush();
                        process::exit(1);
                    }
                    _ => unreachable!(),
                }
            }
        })
        .map_err(ShellError::Signals)
}

/// Collects every child status change that is ready, without blocking for
/// children that are still running. Several children may have changed state
/// behind a single SIGCHLD, so this loops until `waitpid` has nothing left.
fn reap_children(control: &JobControl) {
    {
        let mut table = control.lock();
        loop {
            let status = match waitpid(
                Pid::from_raw(-1),
                Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
            ) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => status,
                Err(err) => {
                    warn!("waitpid: {}", err);
                    break;
                }
            };
            match record_status(&mut table, status) {
                Ok(Some(report)) => {
                    println!("{}", report);
                    let _ = io::stdout().flush();
                }
                Ok(None) => {}
                Err(err) => app_error(err),
            }
        }
    }
    control.notify();
}

/// Applies one reaped status to the table and returns the line to report,
/// if any. Clean exits are silent; children the table does not know about
/// (the table was full when they started) are dropped quietly.
fn record_status(table: &mut JobTable, status: WaitStatus) -> Result<Option<String>, ShellError> {
    debug!("reaped {:?}", status);
    match status {
        WaitStatus::Exited(pid, _) => {
            table.remove(pid);
            Ok(None)
        }
        WaitStatus::Signaled(pid, sig, _) => {
            let report = table
                .jid_for_pid(pid)
                .map(|jid| format!("Job [{}] ({}) terminated by signal {}", jid, pid, sig as i32));
            table.remove(pid);
            Ok(report)
        }
        WaitStatus::Stopped(pid, sig) => Ok(table.find_by_pid_mut(pid).map(|job| {
            job.state = JobState::Stopped;
            format!("Job [{}] ({}) stopped by signal {}", job.jid, pid, sig as i32)
        })),
        other => Err(ShellError::UnexpectedStatus(format!("{:?}", other))),
    }
}

/// Sends `signal` to the whole process group of the foreground job, if
/// there is one. The lock is held so the group cannot be reaped and its id
/// reused in between.
fn relay_to_foreground(control: &JobControl, signal: i32) {
    let table = control.lock();
    let Some(pid) = table.fg_pid() else {
        debug!("signal {} with no foreground job", signal);
        return;
    };
    let Ok(sig) = Signal::try_from(signal) else {
        return;
    };
    debug!("relaying {} to group {}", sig, pid);
    if let Err(err) = kill(Pid::from_raw(-pid.as_raw()), sig) {
        warn!("kill ({}) -{}: {}", sig, pid, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    fn table_with(raw: i32, state: JobState) -> JobTable {
        let mut table = JobTable::new();
        table.insert(pid(raw), state, "cmd\n").unwrap();
        table
    }

    #[test]
    fn test_clean_exit_is_silent() {
        let mut table = table_with(300, JobState::Background);
        let report = record_status(&mut table, WaitStatus::Exited(pid(300), 0)).unwrap();
        assert_eq!(report, None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_killed_job_is_reported_and_removed() {
        let mut table = table_with(301, JobState::Foreground);
        let report =
            record_status(&mut table, WaitStatus::Signaled(pid(301), Signal::SIGINT, false))
                .unwrap();
        assert_eq!(
            report.as_deref(),
            Some("Job [1] (301) terminated by signal 2")
        );
        assert!(table.find_by_pid(pid(301)).is_none());
    }

    #[test]
    fn test_stopped_job_stays_in_table() {
        let mut table = table_with(302, JobState::Foreground);
        let report =
            record_status(&mut table, WaitStatus::Stopped(pid(302), Signal::SIGTSTP)).unwrap();
        assert_eq!(
            report,
            Some(format!("Job [1] (302) stopped by signal {}", Signal::SIGTSTP as i32))
        );
        assert_eq!(
            table.find_by_pid(pid(302)).map(|job| job.state),
            Some(JobState::Stopped)
        );
        assert_eq!(table.fg_pid(), None);
    }

    #[test]
    fn test_untracked_child_is_ignored() {
        let mut table = table_with(303, JobState::Background);
        let report =
            record_status(&mut table, WaitStatus::Signaled(pid(999), Signal::SIGKILL, false))
                .unwrap();
        assert_eq!(report, None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unexpected_status_is_fatal() {
        let mut table = table_with(304, JobState::Background);
        let err = record_status(&mut table, WaitStatus::Continued(pid(304))).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(table.len(), 1);
    }
}
