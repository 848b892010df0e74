use crate::bundle::{Bundle, Section};
use crate::classify::{self, Classification};
use crate::error::{AppError, Result};
use crate::fs::FileSystem;
use crate::matcher::IgnoreMatcher;
use log;
use std::path::{Component, Path};
use thiserror::Error;

/// One step of the walk, as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub relative_path: String,
    pub is_dir: bool,
}

/// A walk that stopped on a structural error. `partial` holds every section
/// produced before the failure.
#[derive(Error, Debug)]
#[error("Scan aborted: {source}")]
pub struct ScanFailure {
    pub partial: Bundle,
    #[source]
    pub source: AppError,
}

/// Walks `scan_root` depth-first in lexical order and bundles every text file
/// not excluded by `matcher`. Paths in the bundle are relative to
/// `project_root`, which may be an ancestor of `scan_root`.
pub fn process_directory(
    fs: &dyn FileSystem,
    scan_root: &Path,
    project_root: &Path,
    matcher: &IgnoreMatcher,
) -> std::result::Result<Bundle, ScanFailure> {
    log::info!(
        "Scanning {} (project root {})",
        scan_root.display(),
        project_root.display()
    );
    let mut walker = Walker {
        fs,
        project_root,
        matcher,
        bundle: Bundle::new(),
    };
    match walker.walk_root(scan_root) {
        Ok(()) => {
            let stats = walker.bundle.stats();
            log::info!(
                "Scan of {} complete: {} included, {} too large, {} unreadable, {} binary, {} ignored",
                scan_root.display(),
                stats.included,
                stats.too_large,
                stats.read_errors,
                stats.binary_skipped,
                stats.ignored
            );
            Ok(walker.bundle)
        }
        Err(source) => {
            log::error!("Scan of {} aborted: {}", scan_root.display(), source);
            Err(ScanFailure {
                partial: walker.bundle,
                source,
            })
        }
    }
}

struct Walker<'a> {
    fs: &'a dyn FileSystem,
    project_root: &'a Path,
    matcher: &'a IgnoreMatcher,
    bundle: Bundle,
}

impl Walker<'_> {
    fn walk_root(&mut self, root: &Path) -> Result<()> {
        let meta = self.fs.stat(root).map_err(|e| AppError::FileRead {
            path: root.to_path_buf(),
            source: e,
        })?;
        let entry = Entry {
            relative_path: self.relative_path(root)?,
            is_dir: meta.is_dir,
        };

        // The project root itself is never matched against the rules.
        if !entry.relative_path.is_empty() && self.is_ignored(&entry) {
            return Ok(());
        }
        if entry.is_dir {
            self.walk_dir(root)
        } else {
            self.visit_file(root, entry.relative_path);
            Ok(())
        }
    }

    fn walk_dir(&mut self, dir: &Path) -> Result<()> {
        let mut children = self.fs.read_dir(dir).map_err(|e| AppError::DirRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        children.sort_by(|a, b| a.name.cmp(&b.name));

        for child in children {
            let entry = Entry {
                relative_path: self.relative_path(&child.path)?,
                is_dir: child.is_dir,
            };
            if self.is_ignored(&entry) {
                continue;
            }
            if entry.is_dir {
                self.walk_dir(&child.path)?;
            } else {
                self.visit_file(&child.path, entry.relative_path);
            }
        }
        Ok(())
    }

    fn is_ignored(&mut self, entry: &Entry) -> bool {
        match self
            .matcher
            .matching_rule(&entry.relative_path, entry.is_dir)
        {
            Some(rule) => {
                if entry.is_dir {
                    log::debug!("Pruning {}/ (rule '{}')", entry.relative_path, rule);
                } else {
                    log::trace!("Ignoring {} (rule '{}')", entry.relative_path, rule);
                }
                self.bundle.note_ignored();
                true
            }
            None => false,
        }
    }

    fn visit_file(&mut self, path: &Path, relative_path: String) {
        match classify::classify_file(self.fs, path) {
            Classification::Include(content) => {
                log::trace!("Including {} ({} bytes)", relative_path, content.len());
                self.bundle.push(Section::File {
                    path: relative_path,
                    content,
                });
            }
            Classification::SkipTooLarge { size } => {
                log::info!("Skipping {}: {} bytes exceeds size limit", relative_path, size);
                self.bundle.push(Section::TooLarge {
                    path: relative_path,
                    size,
                });
            }
            Classification::SkipBinary => {
                log::debug!("Skipping binary file {}", relative_path);
                self.bundle.note_binary();
            }
            Classification::SkipError(e) => {
                log::warn!("Could not read {}: {}", path.display(), e);
                self.bundle.push(Section::ReadError {
                    path: relative_path,
                    cause: e.to_string(),
                });
            }
        }
    }

    fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = pathdiff::diff_paths(path, self.project_root)
            .filter(|p| !p.has_root())
            .ok_or_else(|| AppError::RelativePath {
                path: path.to_path_buf(),
                base: self.project_root.to_path_buf(),
            })?;
        Ok(slash_path(&relative))
    }
}

/// Joins path components with `/` regardless of the host separator.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MAX_EMBED_SIZE;
    use crate::fs::MemoryFileSystem;
    use crate::matcher::IgnoreRuleSet;

    fn scan(fs: &MemoryFileSystem, rules: &[&str]) -> Bundle {
        let matcher = IgnoreRuleSet::new(rules).compile();
        process_directory(fs, Path::new("/proj"), Path::new("/proj"), &matcher).unwrap()
    }

    fn paths(bundle: &Bundle) -> Vec<&str> {
        bundle.sections().iter().map(|s| s.path()).collect()
    }

    #[test]
    fn ignored_directory_is_pruned_entirely() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/src/file.txt", "hello world")
            .add_file("/proj/node_modules/bad.js", "bad");

        let bundle = scan(&fs, &["node_modules/"]);
        let text = bundle.render();

        assert_eq!(text, "===== src/file.txt =====\nhello world\n\n");
        assert!(!text.contains("node_modules"));
        assert!(!text.contains("bad.js"));
    }

    #[test]
    fn pruning_covers_files_no_rule_would_match() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/web/dist/keep-me.txt", "x")
            .add_file("/proj/web/index.html", "<html>");

        let bundle = scan(&fs, &["dist/"]);
        assert_eq!(paths(&bundle), vec!["web/index.html"]);
        assert_eq!(bundle.stats().ignored, 1);
    }

    #[test]
    fn ignored_files_are_omitted() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/app.log", "log")
            .add_file("/proj/logs/old.log", "log")
            .add_file("/proj/main.rs", "fn main() {}");

        let bundle = scan(&fs, &["*.log"]);
        assert_eq!(paths(&bundle), vec!["main.rs"]);
    }

    #[test]
    fn oversized_file_becomes_placeholder() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/big.txt", vec![b'a'; 15 * 1024 * 1024]);

        let bundle = scan(&fs, &[]);
        let text = bundle.render();
        assert_eq!(
            bundle.sections(),
            &[Section::TooLarge {
                path: "big.txt".to_string(),
                size: 15 * 1024 * 1024,
            }]
        );
        assert!(text.len() < 200);
        assert!(text.contains("exceeds the 10 MiB limit"));
    }

    #[test]
    fn file_exactly_at_limit_is_embedded() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/edge.txt", vec![b'a'; MAX_EMBED_SIZE as usize]);

        let bundle = scan(&fs, &[]);
        assert!(matches!(bundle.sections()[0], Section::File { .. }));
    }

    #[test]
    fn binary_file_produces_no_section() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/data.bin", vec![0x61, 0x00, 0x62])
            .add_file("/proj/readme.md", "# hi");

        let bundle = scan(&fs, &[]);
        assert_eq!(paths(&bundle), vec!["readme.md"]);
        assert!(!bundle.render().contains("data.bin"));
        assert_eq!(bundle.stats().binary_skipped, 1);
    }

    #[test]
    fn unreadable_file_becomes_placeholder_and_walk_continues() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/a.txt", "a")
            .add_unreadable_file("/proj/locked.txt", "secret")
            .add_file("/proj/z.txt", "z");

        let bundle = scan(&fs, &[]);
        assert_eq!(paths(&bundle), vec!["a.txt", "locked.txt", "z.txt"]);
        assert!(matches!(
            &bundle.sections()[1],
            Section::ReadError { cause, .. } if cause.contains("permission denied")
        ));
        assert!(!bundle.render().contains("secret"));
    }

    #[test]
    fn traversal_is_depth_first_and_lexical() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/b.txt", "b")
            .add_file("/proj/a/z.txt", "az")
            .add_file("/proj/a/b/c.txt", "abc")
            .add_file("/proj/A.txt", "A")
            .add_file("/proj/a.txt", "a");

        let bundle = scan(&fs, &[]);
        assert_eq!(
            paths(&bundle),
            vec!["A.txt", "a/b/c.txt", "a/z.txt", "a.txt", "b.txt"]
        );
    }

    #[test]
    fn insertion_order_does_not_change_output() {
        let mut forward = MemoryFileSystem::new();
        forward
            .add_file("/proj/one.txt", "1")
            .add_file("/proj/sub/two.txt", "2")
            .add_file("/proj/three.txt", "3");
        let mut reversed = MemoryFileSystem::new();
        reversed
            .add_file("/proj/three.txt", "3")
            .add_file("/proj/sub/two.txt", "2")
            .add_file("/proj/one.txt", "1");

        assert_eq!(scan(&forward, &[]).render(), scan(&reversed, &[]).render());
    }

    #[test]
    fn repeated_scans_are_identical() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/x/y.rs", "y").add_file("/proj/x.rs", "x");
        let matcher = IgnoreRuleSet::new(["target/"]).compile();

        let first = process_directory(&fs, Path::new("/proj"), Path::new("/proj"), &matcher)
            .unwrap()
            .render();
        let second = process_directory(&fs, Path::new("/proj"), Path::new("/proj"), &matcher)
            .unwrap()
            .render();
        assert_eq!(first, second);
    }

    #[test]
    fn directories_never_render_as_sections() {
        let mut fs = MemoryFileSystem::new();
        fs.add_dir("/proj/empty").add_file("/proj/full/f.txt", "f");

        let bundle = scan(&fs, &[]);
        assert_eq!(paths(&bundle), vec!["full/f.txt"]);
    }

    #[test]
    fn paths_are_relative_to_project_root_not_scan_root() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/pkg/core/lib.rs", "lib")
            .add_file("/proj/other.rs", "other");
        let matcher = IgnoreRuleSet::default().compile();

        let bundle = process_directory(
            &fs,
            Path::new("/proj/pkg"),
            Path::new("/proj"),
            &matcher,
        )
        .unwrap();
        assert_eq!(paths(&bundle), vec!["pkg/core/lib.rs"]);
    }

    #[test]
    fn rules_match_against_project_relative_paths() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/pkg/build/out.txt", "out")
            .add_file("/proj/pkg/src.txt", "src");
        let matcher = IgnoreRuleSet::new(["pkg/build/"]).compile();

        let bundle = process_directory(
            &fs,
            Path::new("/proj/pkg"),
            Path::new("/proj"),
            &matcher,
        )
        .unwrap();
        assert_eq!(paths(&bundle), vec!["pkg/src.txt"]);
    }

    #[test]
    fn ignored_scan_root_yields_empty_bundle() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/node_modules/dep/index.js", "x");
        let matcher = IgnoreRuleSet::new(["node_modules/"]).compile();

        let bundle = process_directory(
            &fs,
            Path::new("/proj/node_modules"),
            Path::new("/proj"),
            &matcher,
        )
        .unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn file_scan_root_is_processed_as_single_file() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/notes.txt", "remember");
        let matcher = IgnoreRuleSet::default().compile();

        let bundle = process_directory(
            &fs,
            Path::new("/proj/notes.txt"),
            Path::new("/proj"),
            &matcher,
        )
        .unwrap();
        assert_eq!(bundle.render(), "===== notes.txt =====\nremember\n\n");
    }

    #[test]
    fn missing_scan_root_is_structural_failure() {
        let fs = MemoryFileSystem::new();
        let matcher = IgnoreRuleSet::default().compile();

        let err = process_directory(&fs, Path::new("/nope"), Path::new("/nope"), &matcher)
            .unwrap_err();
        assert!(err.partial.is_empty());
        assert!(matches!(err.source, AppError::FileRead { .. }));
    }

    #[test]
    fn unlistable_directory_aborts_and_keeps_partial_output() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/a/ok.txt", "ok")
            .add_unlistable_dir("/proj/b")
            .add_file("/proj/c.txt", "never visited");
        let matcher = IgnoreRuleSet::default().compile();

        let err = process_directory(&fs, Path::new("/proj"), Path::new("/proj"), &matcher)
            .unwrap_err();
        assert!(matches!(err.source, AppError::DirRead { .. }));
        assert_eq!(paths(&err.partial), vec!["a/ok.txt"]);
    }

    #[test]
    fn unlistable_directory_is_harmless_when_pruned() {
        let mut fs = MemoryFileSystem::new();
        fs.add_unlistable_dir("/proj/.cache")
            .add_file("/proj/main.rs", "fn main() {}");

        let bundle = scan(&fs, &[".cache/"]);
        assert_eq!(paths(&bundle), vec!["main.rs"]);
    }

    #[test]
    fn relative_path_failure_is_structural() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/a.txt", "a");
        let matcher = IgnoreRuleSet::default().compile();

        let err = process_directory(&fs, Path::new("/proj"), Path::new("proj"), &matcher)
            .unwrap_err();
        assert!(matches!(err.source, AppError::RelativePath { .. }));
    }

    #[test]
    fn slash_path_normalizes_components() {
        assert_eq!(slash_path(Path::new("a/./b/c.txt")), "a/b/c.txt");
        assert_eq!(slash_path(Path::new("../x")), "../x");
        assert_eq!(slash_path(Path::new("")), "");
    }
}
