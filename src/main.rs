use smallsh::config::Config;
use smallsh::flags::Flags;
use smallsh::logging;
use smallsh::shell::Shell;
use std::env;
use tracing::warn;

fn main() -> Result<(), smallsh::error::ShellError> {
    let mut flags = Flags::new();
    let args: Vec<String> = env::args().skip(1).collect();
    flags.parse(&args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(());
    }

    if flags.is_set("version") {
        println!("smallsh {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (config, warnings) = Config::load(&flags)?;
    logging::init(config.debug, config.quiet);
    for warning in &warnings {
        warn!("config: {}", warning);
    }

    let mut shell = Shell::new(config)?;
    let code = shell.run()?;
    std::process::exit(code)
}
