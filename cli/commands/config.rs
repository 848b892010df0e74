use crate::cli_args::ConfigArgs;
use crate::load_config_for_command;
use anyhow::{Context, Result};
use xbundle_core::Config;

pub fn handle_config_command(args: ConfigArgs) -> Result<()> {
    let (config, project_root) = if args.effective {
        let project_root =
            Config::determine_project_root(args.project_config.project_root.as_ref())
                .context("Failed to determine project root")?;
        let config = load_config_for_command(&project_root, &args.project_config, None)?;
        (config, Some(project_root))
    } else {
        (Config::default(), None)
    };

    let mut text = config
        .to_toml_string()
        .context("Failed to serialize configuration")?;
    if let Some(project_root) = &project_root {
        text.push_str("\n# Effective ignore rules, in order:\n");
        for rule in config.ignore_rules().rules() {
            text.push_str(&format!("#   {}\n", rule));
        }
        if let Some(excluded) = config.output_dir_exclusion(project_root) {
            text.push_str(&format!("# Output directory excluded: {}/\n", excluded));
        }
    }
    print!("{}", text);
    Ok(())
}
