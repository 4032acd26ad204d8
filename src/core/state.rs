use nix::unistd::{getpid, Pid};

use crate::parser::VariableExpander;
use crate::process::{ExitStatus, ForegroundOnly, JobRegistry};

/// Interpreter state owned by the main loop for the whole run.
pub struct ShellState {
    pid: Pid,
    expander: VariableExpander,
    last_status: ExitStatus,
    foreground_only: ForegroundOnly,
    jobs: JobRegistry,
}

impl ShellState {
    pub fn new(foreground_only: ForegroundOnly) -> Self {
        Self::with_jobs(foreground_only, JobRegistry::new())
    }

    pub fn with_jobs(foreground_only: ForegroundOnly, jobs: JobRegistry) -> Self {
        let pid = getpid();
        Self {
            pid,
            expander: VariableExpander::new(pid.to_string()),
            last_status: ExitStatus::default(),
            foreground_only,
            jobs,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn expander(&self) -> &VariableExpander {
        &self.expander
    }

    pub fn last_status(&self) -> ExitStatus {
        self.last_status
    }

    pub fn set_last_status(&mut self, status: ExitStatus) {
        self.last_status = status;
    }

    pub fn foreground_only(&self) -> &ForegroundOnly {
        &self.foreground_only
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut JobRegistry {
        &mut self.jobs
    }
}
