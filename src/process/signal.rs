use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::debug;

use super::ProcessError;

const ENTER_FOREGROUND_ONLY: &[u8] = b"\nEntering foreground-only mode (& is now ignored)\n";
const EXIT_FOREGROUND_ONLY: &[u8] = b"\nExiting foreground-only mode\n";

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Interpreter-wide foreground-only toggle.
///
/// Shared between the shell state and the SIGTSTP handler. The handler only
/// ever flips the flag, which is a single atomic instruction.
#[derive(Debug, Clone, Default)]
pub struct ForegroundOnly(Arc<AtomicBool>);

impl ForegroundOnly {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Flips the mode and returns the new value. Async-signal-safe.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ignore,
    Default,
    ToggleForegroundOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRule {
    pub signal: Signal,
    pub disposition: Disposition,
}

impl SignalRule {
    const fn new(signal: Signal, disposition: Disposition) -> Self {
        Self {
            signal,
            disposition,
        }
    }
}

/// Dispositions of the interactive shell process itself.
pub const SHELL_RULES: [SignalRule; 3] = [
    SignalRule::new(Signal::SIGINT, Disposition::Ignore),
    SignalRule::new(Signal::SIGTERM, Disposition::Ignore),
    SignalRule::new(Signal::SIGTSTP, Disposition::ToggleForegroundOnly),
];

pub struct SignalPolicy {
    foreground_only: ForegroundOnly,
}

impl SignalPolicy {
    pub fn new(foreground_only: ForegroundOnly) -> Self {
        Self { foreground_only }
    }

    /// Dispositions a forked child adopts before `exec`.
    ///
    /// SIGTSTP is ignored by every child. SIGINT only kills foreground
    /// children; background work keeps ignoring it.
    pub fn child_rules(foreground: bool) -> [SignalRule; 3] {
        let sigint = if foreground {
            Disposition::Default
        } else {
            Disposition::Ignore
        };
        [
            SignalRule::new(Signal::SIGTSTP, Disposition::Ignore),
            SignalRule::new(Signal::SIGINT, sigint),
            SignalRule::new(Signal::SIGTERM, Disposition::Default),
        ]
    }

    /// Installs the shell dispositions. Only the first call in a process succeeds.
    pub fn install(&self) -> Result<(), ProcessError> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(ProcessError::SignalError(
                "signal policy already installed".to_string(),
            ));
        }

        for rule in SHELL_RULES {
            match rule.disposition {
                Disposition::ToggleForegroundOnly => {
                    register_toggle(rule.signal, self.foreground_only.clone())?
                }
                _ => set_disposition(rule.signal, rule.disposition)
                    .map_err(|e| ProcessError::SignalError(format!("{}: {}", rule.signal, e)))?,
            }
            debug!(signal = %rule.signal, disposition = ?rule.disposition, "installed shell signal disposition");
        }
        Ok(())
    }

    /// Applies the child table. Runs between `fork` and `exec`, so it must
    /// stay within `sigaction`.
    pub fn apply_child(foreground: bool) -> nix::Result<()> {
        for rule in Self::child_rules(foreground) {
            set_disposition(rule.signal, rule.disposition)?;
        }
        Ok(())
    }
}

fn set_disposition(signal: Signal, disposition: Disposition) -> nix::Result<()> {
    let handler = match disposition {
        Disposition::Ignore => SigHandler::SigIgn,
        Disposition::Default => SigHandler::SigDfl,
        Disposition::ToggleForegroundOnly => return Err(Errno::EINVAL),
    };
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    // SAFETY: SigIgn and SigDfl carry no Rust code to run in signal context.
    unsafe { sigaction(signal, &action) }.map(|_| ())
}

fn register_toggle(signal: Signal, flag: ForegroundOnly) -> Result<(), ProcessError> {
    let handler = move || {
        let message = if flag.toggle() {
            ENTER_FOREGROUND_ONLY
        } else {
            EXIT_FOREGROUND_ONLY
        };
        // SAFETY: write(2) is async-signal-safe and the buffer is static.
        let _ = unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                message.as_ptr().cast(),
                message.len(),
            )
        };
    };
    // SAFETY: the handler touches one atomic and issues one raw write.
    unsafe { signal_hook::low_level::register(signal as libc::c_int, handler) }
        .map_err(|e| ProcessError::SignalError(format!("{}: {}", signal, e)))?;
    Ok(())
}
