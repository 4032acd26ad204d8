use std::fmt;

pub mod jobs;
pub mod launcher;
pub mod signal;

pub use jobs::{JobNotice, JobRegistry, JobState, ProcessControl, SystemProcesses};
pub use launcher::{Launched, Launcher};
pub use signal::{Disposition, ForegroundOnly, SignalPolicy, SignalRule};

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
}

impl Default for ExitStatus {
    fn default() -> Self {
        ExitStatus::Exited(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit value {}", code),
            ExitStatus::Signaled(signo) => write!(f, "terminated by signal {}", signo),
        }
    }
}

#[derive(Debug)]
pub enum ProcessError {
    Fork(nix::Error),
    Wait(nix::Error),
    Kill(nix::Error),
    EmptyCommand,
    InvalidArgument(String),
    SignalError(String),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Fork(e) => write!(f, "fork failed: {}", e),
            ProcessError::Wait(e) => write!(f, "wait failed: {}", e),
            ProcessError::Kill(e) => write!(f, "kill failed: {}", e),
            ProcessError::EmptyCommand => write!(f, "no program to run"),
            ProcessError::InvalidArgument(arg) => {
                write!(f, "argument contains a NUL byte: {:?}", arg)
            }
            ProcessError::SignalError(msg) => write!(f, "Signal error: {}", msg),
        }
    }
}

impl std::error::Error for ProcessError {}
