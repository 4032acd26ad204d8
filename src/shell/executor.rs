use crate::core::commands::Outcome;
use crate::error::ShellError;

pub(crate) trait CommandHandler {
    fn execute_command(&mut self, line: &str) -> Result<Outcome, ShellError>;
}

impl CommandHandler for super::Shell {
    fn execute_command(&mut self, line: &str) -> Result<Outcome, ShellError> {
        let foreground_only = self.state.foreground_only().is_active();
        let command = match self
            .parser
            .parse(line, self.state.expander(), foreground_only)?
        {
            Some(command) => command,
            None => return Ok(Outcome::Continue),
        };

        if let Some(result) =
            self.builtins
                .dispatch(command.program(), &command.args[1..], &mut self.state)
        {
            return Ok(result?);
        }

        self.launcher.launch(&command, &mut self.state)?;
        Ok(Outcome::Continue)
    }
}
