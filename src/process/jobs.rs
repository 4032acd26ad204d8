use std::collections::HashSet;
use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::{ExitStatus, ProcessError};

/// Result of polling one tracked child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Done(ExitStatus),
    /// The pid is no longer our child (already reaped elsewhere).
    Gone,
}

/// Operating-system seam used by the registry.
pub trait ProcessControl {
    /// Non-blocking state check of a child.
    fn poll(&self, pid: Pid) -> Result<JobState, ProcessError>;
    /// Forcibly terminates a child.
    fn kill(&self, pid: Pid) -> Result<(), ProcessError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcesses;

impl ProcessControl for SystemProcesses {
    fn poll(&self, pid: Pid) -> Result<JobState, ProcessError> {
        loop {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(JobState::Done(ExitStatus::Exited(code))),
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    return Ok(JobState::Done(ExitStatus::Signaled(signal as i32)))
                }
                Ok(_) => return Ok(JobState::Running),
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => return Ok(JobState::Gone),
                Err(e) => return Err(ProcessError::Wait(e)),
            }
        }
    }

    fn kill(&self, pid: Pid) -> Result<(), ProcessError> {
        match kill(pid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(ProcessError::Kill(e)),
        }
    }
}

/// Completion report for one background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobNotice {
    pub pid: Pid,
    pub status: ExitStatus,
}

impl fmt::Display for JobNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background pid {} is done: {}", self.pid, self.status)
    }
}

/// Live background children of the shell.
pub struct JobRegistry {
    jobs: HashSet<Pid>,
    control: Box<dyn ProcessControl>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::with_control(Box::new(SystemProcesses))
    }

    pub fn with_control(control: Box<dyn ProcessControl>) -> Self {
        Self {
            jobs: HashSet::new(),
            control,
        }
    }

    pub fn register(&mut self, pid: Pid) {
        debug!(%pid, "registered background job");
        self.jobs.insert(pid);
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Polls every tracked pid once without blocking and drops the finished ones.
    pub fn reap_all(&mut self) -> Vec<JobNotice> {
        let tracked: Vec<Pid> = self.jobs.iter().copied().collect();
        let mut notices = Vec::new();

        for pid in tracked {
            match self.control.poll(pid) {
                Ok(JobState::Running) => {}
                Ok(JobState::Done(status)) => {
                    debug!(%pid, %status, "reaped background job");
                    self.jobs.remove(&pid);
                    notices.push(JobNotice { pid, status });
                }
                Ok(JobState::Gone) => {
                    warn!(%pid, "background job vanished before it could be reaped");
                    self.jobs.remove(&pid);
                }
                Err(e) => warn!(%pid, error = %e, "failed to poll background job"),
            }
        }
        notices
    }

    /// Sends a forced kill to every tracked job and forgets them all.
    ///
    /// Returns the number of jobs signalled successfully.
    pub fn kill_all(&mut self) -> usize {
        let mut killed = 0;
        for pid in self.jobs.drain() {
            match self.control.kill(pid) {
                Ok(()) => killed += 1,
                Err(e) => warn!(%pid, error = %e, "failed to kill background job"),
            }
        }
        killed
    }
}
