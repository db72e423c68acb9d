use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use hashdb::cli::{Cli, Commands};
use hashdb::output::{self, Verbosity};
use hashdb::{HashDbContext, commands};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
const LOG_ENV: &str = "HASH_DB_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if cli.verbose {
        output::set_verbosity(Verbosity::Verbose);
    } else if cli.quiet {
        output::set_verbosity(Verbosity::Quiet);
    }

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let ctx = HashDbContext::new(cli.jsondb, cli.pretend)?;
    match cli.command {
        Commands::Init => commands::init::execute(&ctx)?,
        Commands::Update => commands::update::execute(&ctx)?,
        Commands::Status => commands::status::execute(&ctx)?,
        Commands::Import => commands::import::execute(&ctx)?,
        Commands::Verify {
            verbose_failures,
            update_mtimes,
        } => commands::verify::execute(&ctx, verbose_failures, update_mtimes)?,
        Commands::Split { subdir } => commands::split::execute(&ctx, &subdir)?,
        Commands::Export => commands::export::execute(&ctx)?,
        Commands::Completion { .. } => {}
    }

    Ok(())
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
