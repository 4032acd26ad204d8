use std::ffi::{CStr, CString};
use std::io::{self, Write};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, ForkResult, Pid};
use tracing::{debug, warn};

use super::signal::SignalPolicy;
use super::{ExitStatus, ProcessError};
use crate::config::Config;
use crate::core::state::ShellState;
use crate::parser::ParsedCommand;

/// What the parent observed after a successful fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launched {
    Foreground(ExitStatus),
    Background(Pid),
}

/// Forks and execs external programs.
#[derive(Debug, Clone)]
pub struct Launcher {
    null_device: CString,
    output_mode: u32,
}

impl Launcher {
    pub fn new(config: &Config) -> Result<Self, ProcessError> {
        Ok(Self {
            null_device: to_cstring(&config.null_device)?,
            output_mode: config.output_mode,
        })
    }

    pub fn launch(
        &self,
        command: &ParsedCommand,
        state: &mut ShellState,
    ) -> Result<Launched, ProcessError> {
        let plan = self.prepare(command)?;
        // Anything still buffered would otherwise be written twice.
        let _ = io::stdout().flush();

        // SAFETY: the interpreter is single-threaded, and the child only
        // performs sigaction/open/dup2/exec before leaving via exec or _exit.
        match unsafe { fork() } {
            Err(e) => {
                warn!(program = command.program(), error = %e, "fork failed");
                Err(ProcessError::Fork(e))
            }
            Ok(ForkResult::Child) => plan.exec(),
            Ok(ForkResult::Parent { child }) => {
                debug!(pid = %child, program = command.program(), foreground = command.foreground, "forked child");
                if command.foreground {
                    let status = wait_foreground(child)?;
                    state.set_last_status(status);
                    if let ExitStatus::Signaled(_) = status {
                        println!("{}", status);
                    }
                    Ok(Launched::Foreground(status))
                } else {
                    state.jobs_mut().register(child);
                    println!("background pid is {}", child);
                    Ok(Launched::Background(child))
                }
            }
        }
    }

    fn prepare(&self, command: &ParsedCommand) -> Result<ChildPlan, ProcessError> {
        if command.args.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        let argv = command
            .args
            .iter()
            .map(String::as_str)
            .map(to_cstring)
            .collect::<Result<Vec<_>, _>>()?;
        let mut input = command.input.as_deref().map(to_cstring).transpose()?;
        let mut output = command.output.as_deref().map(to_cstring).transpose()?;

        if !command.foreground {
            input.get_or_insert_with(|| self.null_device.clone());
            output.get_or_insert_with(|| self.null_device.clone());
        }

        Ok(ChildPlan {
            argv,
            input,
            output,
            foreground: command.foreground,
            output_mode: self.output_mode,
        })
    }
}

/// Everything the child needs, converted before `fork`.
#[derive(Debug)]
struct ChildPlan {
    argv: Vec<CString>,
    input: Option<CString>,
    output: Option<CString>,
    foreground: bool,
    output_mode: u32,
}

impl ChildPlan {
    fn exec(self) -> ! {
        if let Err(e) = SignalPolicy::apply_child(self.foreground) {
            eprintln!("smallsh: cannot reset signal dispositions: {}", e);
            exit_child(1);
        }

        if let Some(path) = &self.input {
            if let Err(e) = redirect(path, libc::O_RDONLY, 0, libc::STDIN_FILENO) {
                eprintln!("smallsh: cannot open {} for input: {}", path.to_string_lossy(), e);
                exit_child(1);
            }
        }

        if let Some(path) = &self.output {
            let flags = libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC;
            if let Err(e) = redirect(path, flags, self.output_mode, libc::STDOUT_FILENO) {
                eprintln!("smallsh: cannot open {} for output: {}", path.to_string_lossy(), e);
                exit_child(1);
            }
        }

        let err = match execvp(&self.argv[0], &self.argv) {
            Ok(never) => match never {},
            Err(e) => e,
        };
        eprintln!("smallsh: {}: {}", self.argv[0].to_string_lossy(), err);
        exit_child(1)
    }
}

fn redirect(path: &CStr, flags: libc::c_int, mode: u32, target: libc::c_int) -> io::Result<()> {
    // SAFETY: path is NUL-terminated and outlives the call.
    let fd = unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    if fd == target {
        return Ok(());
    }

    // SAFETY: both descriptors are valid; fd is ours to close afterwards.
    let result = if unsafe { libc::dup2(fd, target) } < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    };
    unsafe { libc::close(fd) };
    result
}

fn exit_child(code: i32) -> ! {
    // SAFETY: skips atexit handlers and stdio buffers inherited from the shell.
    unsafe { libc::_exit(code) }
}

fn wait_foreground(pid: Pid) -> Result<ExitStatus, ProcessError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ExitStatus::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                return Ok(ExitStatus::Signaled(signal as i32))
            }
            Ok(other) => debug!(?other, "ignoring non-terminal wait status"),
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!(%pid, error = %e, "waiting for foreground child failed");
                return Err(ProcessError::Wait(e));
            }
        }
    }
}

fn to_cstring(value: &str) -> Result<CString, ProcessError> {
    CString::new(value).map_err(|_| ProcessError::InvalidArgument(value.to_string()))
}
