use std::env;
use std::path::PathBuf;

use super::{Command, CommandError, Outcome};
use crate::core::state::ShellState;

#[derive(Clone)]
pub struct CdCommand;

impl Default for CdCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CdCommand {
    pub fn new() -> Self {
        Self
    }

    fn target(args: &[String]) -> Result<PathBuf, CommandError> {
        match args.first() {
            Some(path) => Ok(PathBuf::from(path)),
            None => dirs::home_dir().ok_or(CommandError::HomeDirNotFound),
        }
    }
}

impl Command for CdCommand {
    fn execute(&self, args: &[String], _state: &mut ShellState) -> Result<Outcome, CommandError> {
        let path = Self::target(args)?;
        env::set_current_dir(&path).map_err(|e| {
            CommandError::ExecutionError(format!("cd: {}: {}", path.display(), e))
        })?;
        Ok(Outcome::Continue)
    }
}
