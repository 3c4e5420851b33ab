//! Studio Probador CLI
//!
//! ## Usage
//!
//! ```bash
//! studio-probador list --tag contract          # List contract scenarios
//! studio-probador run --tag exclusion -j 2     # Run on two workers
//! studio-probador run --env staging --retries 1
//! studio-probador config init                  # Write studio-probar.yaml
//! ```

use clap::Parser;
use std::process::ExitCode;
use studio_probador::{
    handlers::{execute_config, execute_list, execute_run},
    Cli, CliConfig, CliResult, Commands, Verbosity,
};
use studio_probar::{init_logging, LoggingConfig};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_verbosity(cli.verbose, cli.quiet);
    if cli.log_json {
        logging = logging.json();
    }
    init_logging(&logging)?;

    let config = build_config(&cli);
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::List(args) => execute_list(args),
        Commands::Run(args) => execute_run(&config, config_path, args),
        Commands::Config(args) => execute_config(config_path, &args.action),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(cli.color.clone().into())
}
