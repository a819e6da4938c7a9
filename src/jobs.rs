use nix::unistd::Pid;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;
use tracing::debug;

/// Maximum number of jobs tracked at any one time.
pub const MAX_JOBS: usize = 16;

/// Represents the state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        };
        f.write_str(label)
    }
}

/// Represents a job in the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Process group leader; the group id equals this pid.
    pub pid: Pid,
    pub jid: usize,
    pub state: JobState,
    /// The line as typed, trailing newline included.
    pub cmdline: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobsError {
    #[error("Tried to create too many jobs")]
    TableFull,
    #[error("invalid pid {0}")]
    InvalidPid(i32),
    #[error("({0}): already a job")]
    DuplicatePid(Pid),
    #[error("({0}): No such process")]
    NoSuchProcess(Pid),
    #[error("job ({0}) already holds the foreground")]
    ForegroundBusy(Pid),
}

/// Fixed-capacity job table. Slot `i` holds the job with jid `i + 1`, so
/// the first empty slot is the smallest free jid and slot order is jid order.
#[derive(Debug)]
pub struct JobTable {
    slots: [Option<Job>; MAX_JOBS],
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    /// Creates a new job table with every slot empty.
    pub fn new() -> Self {
        JobTable {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Adds a job and returns its jid.
    pub fn insert(&mut self, pid: Pid, state: JobState, cmdline: &str) -> Result<usize, JobsError> {
        if pid.as_raw() < 1 {
            return Err(JobsError::InvalidPid(pid.as_raw()));
        }
        if self.find_by_pid(pid).is_some() {
            return Err(JobsError::DuplicatePid(pid));
        }
        if state == JobState::Foreground {
            if let Some(holder) = self.fg_pid() {
                return Err(JobsError::ForegroundBusy(holder));
            }
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(JobsError::TableFull)?;
        let jid = index + 1;
        self.slots[index] = Some(Job {
            pid,
            jid,
            state,
            cmdline: cmdline.to_string(),
        });
        debug!("Added job [{}] {} {}", jid, pid, cmdline.trim_end());
        Ok(jid)
    }

    /// Deletes the job with the given pid. Returns false if there was none.
    pub fn remove(&mut self, pid: Pid) -> bool {
        if pid.as_raw() < 1 {
            return false;
        }
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(job) if job.pid == pid))
        else {
            return false;
        };
        if let Some(job) = slot.take() {
            debug!("Deleted job [{}] {}", job.jid, job.pid);
        }
        true
    }

    /// Changes a job's state and returns the state it had before.
    /// Moving a job to the foreground fails while another job holds it.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> Result<JobState, JobsError> {
        if state == JobState::Foreground {
            if let Some(holder) = self.fg_pid().filter(|&holder| holder != pid) {
                return Err(JobsError::ForegroundBusy(holder));
            }
        }
        let job = self
            .find_by_pid_mut(pid)
            .ok_or(JobsError::NoSuchProcess(pid))?;
        Ok(std::mem::replace(&mut job.state, state))
    }

    /// Returns a reference to the job with the given pid.
    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.iter().find(|job| job.pid == pid)
    }

    /// Returns a mutable reference to the job with the given pid.
    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.slots.iter_mut().flatten().find(|job| job.pid == pid)
    }

    /// Returns a reference to the job with the given job ID.
    pub fn find_by_jid(&self, jid: usize) -> Option<&Job> {
        jid.checked_sub(1)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }

    /// Maps a process ID to its job ID.
    pub fn jid_for_pid(&self, pid: Pid) -> Option<usize> {
        self.find_by_pid(pid).map(|job| job.jid)
    }

    /// Returns the process ID of the foreground job, if any.
    pub fn fg_pid(&self) -> Option<Pid> {
        self.iter()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    /// Jobs in ascending jid order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> + '_ {
        self.slots.iter().flatten()
    }

    /// Number of jobs currently tracked.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True when no job is tracked.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Writes the `[jid] (pid) cmdline` line shown when a job starts or
/// resumes in the background.
pub fn announce<W: Write>(out: &mut W, job: &Job) -> io::Result<()> {
    write!(out, "[{}] ({}) {}", job.jid, job.pid, job.cmdline)?;
    out.flush()
}

/// Writes the list of jobs.
pub fn list_jobs<W: Write>(out: &mut W, table: &JobTable) -> io::Result<()> {
    for job in table.iter() {
        write!(out, "[{}] ({}) {} {}", job.jid, job.pid, job.state, job.cmdline)?;
    }
    out.flush()
}

/// The job table shared between the read loop and the signals thread.
///
/// Holding the lock is what keeps the reaper out: a child forked and
/// registered under one guard can never be reaped before it is in the table.
/// Every reaper pass ends with `notify_all`, which is what wakes
/// [`JobControl::wait_fg`].
#[derive(Debug, Default)]
pub struct JobControl {
    table: Mutex<JobTable>,
    changed: Condvar,
}

impl JobControl {
    pub fn new() -> Self {
        JobControl::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock()
    }

    /// Wakes every thread blocked in `wait_fg`.
    pub fn notify(&self) {
        self.changed.notify_all();
    }

    /// Blocks until `pid` is gone from the table or is no longer in the
    /// foreground. The predicate is re-checked under the lock after every
    /// wake, so a change that lands between the check and the wait is seen.
    pub fn wait_fg(&self, pid: Pid) {
        let mut table = self.table.lock();
        while table
            .find_by_pid(pid)
            .is_some_and(|job| job.state == JobState::Foreground)
        {
            self.changed.wait(&mut table);
        }
        debug!("waitfg: ({}) left the foreground", pid);
    }
}
