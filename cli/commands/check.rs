use crate::cli_args::CheckArgs;
use crate::load_config_for_command;
use anyhow::{Context, Result};
use colored::*;
use log;
use std::path::Path;
use xbundle_core::Config;

pub fn handle_check_command(args: CheckArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    let config = load_config_for_command(&project_root, &args.project_config, Some(&args.ignore))
        .context("Failed to load configuration for check command")?;
    let matcher = config.ignore_matcher(&project_root);

    for raw in &args.paths {
        let (path, is_dir) = normalize_query(raw, &project_root);
        log::debug!("Checking '{}' (directory: {})", path, is_dir);
        let shown = if is_dir && !path.ends_with('/') {
            format!("{}/", path)
        } else {
            path.clone()
        };
        match matcher.matching_rule(&path, is_dir) {
            Some(rule) => {
                if quiet {
                    println!("ignored\t{}", shown);
                } else {
                    println!("{} {}  {}", "ignored ".red(), shown, format!("(rule: {})", rule).dimmed());
                }
            }
            None => {
                if quiet {
                    println!("included\t{}", shown);
                } else {
                    println!("{} {}", "included".green(), shown);
                }
            }
        }
    }
    Ok(())
}

/// Slash-normalizes a user-supplied path. A trailing `/` or an existing
/// directory under the project root marks it as a directory.
fn normalize_query(raw: &str, project_root: &Path) -> (String, bool) {
    let slashed = raw.replace('\\', "/");
    let trimmed = slashed.trim_start_matches("./");
    let is_dir = trimmed.ends_with('/') || project_root.join(trimmed).is_dir();
    (trimmed.trim_end_matches('/').to_string(), is_dir)
}
