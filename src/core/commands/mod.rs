use std::collections::BTreeMap;
use std::fmt;

mod cd;
mod exit;
mod status;

pub use cd::CdCommand;
pub use exit::ExitCommand;
pub use status::StatusCommand;

use crate::core::state::ShellState;

#[derive(Debug)]
pub enum CommandError {
    HomeDirNotFound,
    ExecutionError(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::HomeDirNotFound => write!(f, "home directory not found"),
            CommandError::ExecutionError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

/// What the interpreter loop does after a built-in ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit(i32),
}

pub trait Command {
    fn execute(&self, args: &[String], state: &mut ShellState) -> Result<Outcome, CommandError>;
}

#[derive(Clone)]
enum CommandType {
    Cd(CdCommand),
    Exit(ExitCommand),
    Status(StatusCommand),
}

impl Command for CommandType {
    fn execute(&self, args: &[String], state: &mut ShellState) -> Result<Outcome, CommandError> {
        match self {
            CommandType::Cd(cmd) => cmd.execute(args, state),
            CommandType::Exit(cmd) => cmd.execute(args, state),
            CommandType::Status(cmd) => cmd.execute(args, state),
        }
    }
}

/// Commands run inside the shell process, never forked.
#[derive(Clone)]
pub struct Builtins {
    commands: BTreeMap<&'static str, CommandType>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

impl Builtins {
    pub fn new() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert("cd", CommandType::Cd(CdCommand::new()));
        commands.insert("exit", CommandType::Exit(ExitCommand::new()));
        commands.insert("status", CommandType::Status(StatusCommand::new()));
        Self { commands }
    }

    /// Runs `name` if it is a built-in; `None` means it is an external program.
    pub fn dispatch(
        &self,
        name: &str,
        args: &[String],
        state: &mut ShellState,
    ) -> Option<Result<Outcome, CommandError>> {
        self.commands
            .get(name)
            .map(|cmd| cmd.execute(args, state))
    }
}
