use crate::cli_args::GenerateArgs;
use crate::load_config_for_command;
use crate::output::{self, SummaryRow};
use anyhow::{Context, Result};
use colored::Colorize;
use log;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use xbundle_core::{AppError, Config, OsFileSystem, OutputFormat, ScanFailure, process_directory};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let mut config =
        load_config_for_command(&project_root, &args.project_config, Some(&args.ignore))
            .context("Failed to load configuration")?;
    if let Some(format) = &args.format {
        config.output.format = format.parse::<OutputFormat>()?;
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }

    let roots = resolve_roots(&args.roots, &project_root)?;
    let matcher = config.ignore_matcher(&project_root);
    let output_dir = config.resolved_output_dir(&project_root);

    let mut summary = Vec::<SummaryRow>::new();
    let mut failures = Vec::<ScanFailure>::new();
    let mut used_names = HashSet::<String>::new();

    for root in &roots {
        let root_label = display_root(root, &project_root);
        match process_directory(&OsFileSystem, root, &project_root, &matcher) {
            Ok(bundle) => {
                let target = if args.stdout {
                    None
                } else {
                    let base = unique_name(config.effective_filename_base(root), &mut used_names);
                    Some(output_dir.join(format!("{}.{}", base, config.output.format.extension())))
                };
                output::write_bundle(&bundle, config.output.format, target.as_deref(), quiet)?;
                summary.push(SummaryRow {
                    root: root_label,
                    destination: target
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "stdout".to_string()),
                    stats: *bundle.stats(),
                });
            }
            Err(failure) => {
                if !quiet {
                    eprintln!(
                        "{} Skipping output for {}: {} ({} sections gathered before the failure)",
                        "⚠️".yellow(),
                        root_label,
                        failure.source,
                        failure.partial.sections().len()
                    );
                }
                failures.push(failure);
            }
        }
    }

    if !quiet {
        output::print_summary_table(&summary);
    }

    let failed = failures.len();
    match failures.into_iter().next() {
        Some(first) => Err(anyhow::Error::new(first).context(format!(
            "{} of {} roots could not be scanned",
            failed,
            roots.len()
        ))),
        None => Ok(()),
    }
}

/// Relative roots are taken from the project root. No roots means the
/// project root itself.
fn resolve_roots(roots: &[PathBuf], project_root: &Path) -> Result<Vec<PathBuf>> {
    if roots.is_empty() {
        return Ok(vec![project_root.to_path_buf()]);
    }
    roots
        .iter()
        .map(|root| {
            let candidate = if root.is_absolute() {
                root.clone()
            } else {
                project_root.join(root)
            };
            candidate.canonicalize().map_err(|e| {
                anyhow::Error::new(AppError::Io(e))
                    .context(format!("Cannot resolve root '{}'", root.display()))
            })
        })
        .collect()
}

fn display_root(root: &Path, project_root: &Path) -> String {
    match root.strip_prefix(project_root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => root.display().to_string(),
    }
}

fn unique_name(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
