use tracing::debug;

use super::{Command, CommandError, Outcome};
use crate::core::state::ShellState;

#[derive(Clone)]
pub struct ExitCommand;

impl Default for ExitCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for ExitCommand {
    /// Kills every background job; the loop then ends the process.
    fn execute(&self, _args: &[String], state: &mut ShellState) -> Result<Outcome, CommandError> {
        let killed = state.jobs_mut().kill_all();
        debug!(killed, "terminated background jobs on exit");
        Ok(Outcome::Exit(0))
    }
}
