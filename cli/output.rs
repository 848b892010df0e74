use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use xbundle_core::{AppError, Bundle, BundleStats, OutputFormat, bundle};

pub struct SummaryRow {
    pub root: String,
    pub destination: String,
    pub stats: BundleStats,
}

pub fn render_bundle(data: &Bundle, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(data.render()),
        OutputFormat::Json => {
            bundle::serialize_bundle_to_json(data, true).map_err(anyhow::Error::from)
        }
        OutputFormat::Yaml => bundle::serialize_bundle_to_yaml(data).map_err(anyhow::Error::from),
    }
}

/// Writes to `path`, or to stdout when no path is given.
pub fn write_bundle(
    data: &Bundle,
    format: OutputFormat,
    path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let content = render_bundle(data, format)?;
    match path {
        Some(path) => {
            write_to_file(path, &content)?;
            if !quiet {
                eprintln!(
                    "{} Bundle saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        None => write_to_stdout(&content)?,
    }
    Ok(())
}

fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AppError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let mut file = File::create(path).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    file.write_all(content.as_bytes())
        .map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(())
}

fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.is_empty() && !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn readable_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Summary goes to stderr so it never mixes with bundles on stdout.
pub fn print_summary_table(rows: &[SummaryRow]) {
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Root").fg(Color::Green),
        Cell::new("Files").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
        Cell::new("Too Large").fg(Color::Green),
        Cell::new("Unreadable").fg(Color::Green),
        Cell::new("Binary").fg(Color::Green),
        Cell::new("Ignored").fg(Color::Green),
        Cell::new("Output").fg(Color::Green),
    ]);
    for row in rows {
        let stats = &row.stats;
        table.add_row(vec![
            Cell::new(&row.root).fg(Color::Cyan),
            Cell::new(stats.included).set_alignment(CellAlignment::Right),
            Cell::new(readable_size(stats.included_bytes))
                .set_alignment(CellAlignment::Right)
                .fg(Color::DarkGrey),
            Cell::new(stats.too_large).set_alignment(CellAlignment::Right),
            Cell::new(stats.read_errors).set_alignment(CellAlignment::Right),
            Cell::new(stats.binary_skipped).set_alignment(CellAlignment::Right),
            Cell::new(stats.ignored).set_alignment(CellAlignment::Right),
            Cell::new(&row.destination).fg(Color::DarkGrey),
        ]);
    }
    eprintln!();
    eprintln!("{}", " Bundle Summary ".green().bold().underline());
    eprintln!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_to_file_creates_missing_parents() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let target = tmp.path().join("out/nested/bundle.txt");

        write_to_file(&target, "===== a =====\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "===== a =====\n");
    }

    #[test]
    fn write_failure_is_reported_as_file_write_error() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("write");

        let err = write_to_file(&blocker.join("bundle.txt"), "x").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::FileWrite { path, .. }) if path == &blocker
        ));
    }
}
