mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, IgnoreOpts, ProjectConfigOpts};
use xbundle_core::{AppError, Config, ScanFailure};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = if e.downcast_ref::<ScanFailure>().is_some() {
                3
            } else {
                match e.downcast_ref::<AppError>() {
                    Some(AppError::Config(_)) => 1,
                    Some(AppError::TomlParse(_)) => 1,
                    Some(AppError::TomlSerialize(_)) => 1,
                    Some(AppError::Io(_)) => 2,
                    Some(AppError::FileRead { .. }) => 2,
                    Some(AppError::FileWrite { .. }) => 2,
                    Some(AppError::DirRead { .. }) => 2,
                    Some(AppError::RelativePath { .. }) => 2,
                    Some(AppError::Glob(_)) => 5,
                    Some(AppError::InvalidArgument(_)) => 5,
                    Some(AppError::JsonSerialize(_)) => 6,
                    Some(AppError::YamlError(_)) => 6,
                    Some(_) => 1,
                    None => 1,
                }
            };

            // Scan failures were already reported per root; config and
            // argument errors are always shown.
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(Commands::Generate(args)) => {
            log::debug!("Executing 'generate' command...");
            commands::generate::handle_generate_command(args, quiet)?;
        }
        Some(Commands::Check(args)) => {
            log::debug!("Executing 'check' command...");
            commands::check::handle_check_command(args, quiet)?;
        }
        Some(Commands::Config(args)) => {
            log::debug!("Executing 'config' command...");
            commands::config::handle_config_command(args)?;
        }
    }
    Ok(())
}

/// Loads the project config and applies the ignore flags shared by
/// `generate` and `check`.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    ignore_opts: Option<&IgnoreOpts>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config.as_ref(),
        project_opts.no_config,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(opts) = ignore_opts {
        if opts.no_default_ignores {
            config.ignore.use_defaults = false;
        }
        if !opts.patterns.is_empty() {
            log::trace!("Adding CLI ignore patterns: {:?}", opts.patterns);
            config.ignore.patterns.extend(opts.patterns.iter().cloned());
        }
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    Ok(config)
}
