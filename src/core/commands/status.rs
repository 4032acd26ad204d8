use super::{Command, CommandError, Outcome};
use crate::core::state::ShellState;

#[derive(Clone)]
pub struct StatusCommand;

impl Default for StatusCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn report(state: &ShellState) -> String {
        state.last_status().to_string()
    }
}

impl Command for StatusCommand {
    fn execute(&self, _args: &[String], state: &mut ShellState) -> Result<Outcome, CommandError> {
        println!("{}", Self::report(state));
        Ok(Outcome::Continue)
    }
}
