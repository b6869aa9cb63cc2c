//! Vault CLI
//!
//! Command-line access to encrypted, versioned vault repositories.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context::resolve(
        cli.uri.as_deref(),
        cli.passphrase.as_deref(),
        cli.config.as_deref(),
    )?;
    tracing::debug!(uri = %ctx.uri, "Resolved repository");

    execute_command(&ctx, cli.command)
}

/// Log to stderr. `RUST_LOG` selects the filter unless `--verbose` forces debug.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
    if installed.is_ok() && verbose {
        tracing::debug!("Verbose mode enabled");
    }
}

fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { force } => commands::run_init(ctx, force),
        Commands::Ls { path, json } => commands::run_ls(ctx, &path, json),
        Commands::Mkdir { path, parents } => commands::run_mkdir(ctx, &path, parents),
        Commands::Put { src, dest } => commands::run_put(ctx, &src, &dest),
        Commands::Cat { path } => commands::run_cat(ctx, &path),
        Commands::Rm { path, recursive } => commands::run_rm(ctx, &path, recursive),
        Commands::Mv {
            src,
            dst,
            overwrite,
        } => commands::run_mv(ctx, &src, &dst, overwrite),
        Commands::Cp {
            src,
            dst,
            overwrite,
        } => commands::run_cp(ctx, &src, &dst, overwrite),
        Commands::Info { path, json } => commands::run_info(ctx, &path, json),
        Commands::History { path } => commands::run_history(ctx, &path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_user() {
        let error = crate::error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn execute_dispatches_to_commands() {
        let ctx = Context::resolve(Some("mem://cli-main-dispatch"), Some("pw"), None).unwrap();
        execute_command(&ctx, Commands::Init { force: true }).unwrap();
        execute_command(
            &ctx,
            Commands::Mkdir {
                path: "/x/y".into(),
                parents: true,
            },
        )
        .unwrap();
        execute_command(
            &ctx,
            Commands::Ls {
                path: "/x".into(),
                json: false,
            },
        )
        .unwrap();
    }
}
