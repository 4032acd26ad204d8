use std::io::{self, Write};

use tracing::{debug, info};

mod executor;

use crate::{
    config::Config,
    core::{
        commands::{Builtins, Outcome},
        state::ShellState,
    },
    error::ShellError,
    highlight::Highlighter,
    input::{self, LineReader},
    parser::Parser,
    process::{ForegroundOnly, Launcher, SignalPolicy},
};

use executor::CommandHandler;

pub struct Shell {
    pub(crate) reader: Box<dyn LineReader>,
    pub(crate) parser: Parser,
    pub(crate) builtins: Builtins,
    pub(crate) launcher: Launcher,
    pub(crate) state: ShellState,
    pub(crate) config: Config,
    pub(crate) diagnostics: Highlighter,
    pub(crate) notices: Highlighter,
    observed_foreground_only: bool,
}

impl Shell {
    /// Installs the signal policy and prepares the interpreter.
    pub fn new(config: Config) -> Result<Self, ShellError> {
        let foreground_only = ForegroundOnly::new();
        SignalPolicy::new(foreground_only.clone()).install()?;

        let reader = input::open_reader(&config);
        Self::with_reader(config, ShellState::new(foreground_only), reader)
    }

    pub fn with_reader(
        config: Config,
        state: ShellState,
        reader: Box<dyn LineReader>,
    ) -> Result<Self, ShellError> {
        Ok(Shell {
            reader,
            parser: Parser::new(config.max_line_len, config.max_args),
            builtins: Builtins::new(),
            launcher: Launcher::new(&config)?,
            observed_foreground_only: state.foreground_only().is_active(),
            state,
            config,
            diagnostics: Highlighter::for_stderr(),
            notices: Highlighter::for_stdout(),
        })
    }

    /// Runs until `exit` or end of input and returns the process exit code.
    pub fn run(&mut self) -> Result<i32, ShellError> {
        info!(pid = %self.state.pid(), "shell started");

        loop {
            self.report_finished_jobs();
            self.observe_mode();

            let line = match self.reader.read_line(&self.config.prompt) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    return self.finish();
                }
                Err(ShellError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    self.report_error(&ShellError::Io(e));
                    continue;
                }
                Err(e) => {
                    self.state.jobs_mut().kill_all();
                    return Err(e);
                }
            };

            match self.execute_command(&line) {
                Ok(Outcome::Exit(code)) => return Ok(code),
                Ok(Outcome::Continue) => {}
                Err(e) => self.report_error(&e),
            }
        }
    }

    fn finish(&mut self) -> Result<i32, ShellError> {
        match self.builtins.dispatch("exit", &[], &mut self.state) {
            Some(Ok(Outcome::Exit(code))) => Ok(code),
            Some(Err(e)) => Err(e.into()),
            _ => Ok(0),
        }
    }

    fn report_finished_jobs(&mut self) {
        let notices = self.state.jobs_mut().reap_all();
        if notices.is_empty() {
            return;
        }
        for notice in notices {
            println!("{}", self.notices.highlight_notice(&notice.to_string()));
        }
        let _ = io::stdout().flush();
    }

    /// The SIGTSTP handler only flips the flag; transitions are logged here.
    fn observe_mode(&mut self) {
        let active = self.state.foreground_only().is_active();
        if active != self.observed_foreground_only {
            debug!(foreground_only = active, "foreground-only mode changed");
            self.observed_foreground_only = active;
        }
    }

    fn report_error(&self, error: &ShellError) {
        let _ = io::stdout().flush();
        eprintln!(
            "{}",
            self.diagnostics
                .highlight_error(&format!("smallsh: {}", error))
        );
    }
}
