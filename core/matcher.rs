use crate::error::Result;
use globset::{GlobBuilder, GlobMatcher};
use log;

/// Ordered set of ignore rules. Any matching rule excludes a path; order only
/// affects which rule is reported by [`IgnoreMatcher::matching_rule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRuleSet {
    rules: Vec<String>,
}

impl IgnoreRuleSet {
    /// Builds a rule set, trimming each rule and dropping blank lines and
    /// `#` comments.
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.extend(rules);
        set
    }

    pub fn extend<I, S>(&mut self, rules: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rules.extend(
            rules
                .into_iter()
                .map(|r| r.as_ref().trim().to_string())
                .filter(|r| !r.is_empty() && !r.starts_with('#')),
        );
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn compile(&self) -> IgnoreMatcher {
        IgnoreMatcher::new(self)
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    raw: String,
    /// `None` when the rule is not a valid glob.
    direct: Option<GlobMatcher>,
    /// The rule with `**/` prepended, for rules not already anchored.
    anywhere: Option<GlobMatcher>,
}

impl CompiledRule {
    fn new(raw: &str) -> Self {
        let direct = match compile_glob(raw) {
            Ok(m) => Some(m),
            Err(e) => {
                log::warn!("Ignore rule \"{}\" is not a valid glob: {}", raw, e);
                None
            }
        };
        let anywhere = if direct.is_some() && !raw.starts_with('/') && !raw.starts_with("**/") {
            compile_glob(&format!("**/{}", raw)).ok()
        } else {
            None
        };
        Self {
            raw: raw.to_string(),
            direct,
            anywhere,
        }
    }

    fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.direct.as_ref().is_some_and(|g| g.is_match(path)) {
            log::trace!("'{}' matched rule '{}' directly", path, self.raw);
            return true;
        }
        if self.anywhere.as_ref().is_some_and(|g| g.is_match(path)) {
            log::trace!("'{}' matched rule '**/{}'", path, self.raw);
            return true;
        }
        // Directory-style rule against a file whose parent was not pruned.
        // Also the only case left for rules that fail to compile as globs.
        if !is_dir && self.raw.ends_with('/') && path.starts_with(&self.raw) {
            log::trace!("'{}' matched directory prefix '{}'", path, self.raw);
            return true;
        }
        false
    }
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()?;
    Ok(glob.compile_matcher())
}

/// Compiled form of an [`IgnoreRuleSet`]. Immutable; share it by reference
/// across scans.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    rules: Vec<CompiledRule>,
    excluded: Vec<String>,
}

impl IgnoreMatcher {
    pub fn new(rule_set: &IgnoreRuleSet) -> Self {
        log::debug!("Compiling {} ignore rules", rule_set.len());
        Self {
            rules: rule_set.rules().iter().map(|r| CompiledRule::new(r)).collect(),
            excluded: Vec::new(),
        }
    }

    /// Excludes one exact project-relative path and everything beneath it.
    /// Unlike a rule, it is never retried at other depths.
    pub fn exclude_path(mut self, relative_path: impl AsRef<str>) -> Self {
        let path = relative_path.as_ref().trim_matches('/');
        if !path.is_empty() {
            log::debug!("Excluding path '{}'", path);
            self.excluded.push(path.to_string());
        }
        self
    }

    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded
    }

    /// `relative_path` must be slash-separated and relative to the project
    /// root. Directories get a trailing `/` before matching, so rules ending
    /// in `/` only match directories through the glob cases.
    pub fn should_ignore(&self, relative_path: &str, is_dir: bool) -> bool {
        self.matching_rule(relative_path, is_dir).is_some()
    }

    /// First rule that excludes the path, if any. An excluded path is
    /// reported as its own rule.
    pub fn matching_rule(&self, relative_path: &str, is_dir: bool) -> Option<&str> {
        if let Some(excluded) = self.excluded_prefix(relative_path) {
            return Some(excluded);
        }
        let path = match_path(relative_path, is_dir);
        self.rules
            .iter()
            .find(|rule| rule.matches(&path, is_dir))
            .map(|rule| rule.raw.as_str())
    }

    fn excluded_prefix(&self, relative_path: &str) -> Option<&str> {
        let path = relative_path.trim_end_matches('/');
        self.excluded
            .iter()
            .find(|ex| {
                path.strip_prefix(ex.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .map(String::as_str)
    }
}

fn match_path(relative_path: &str, is_dir: bool) -> String {
    if is_dir && !relative_path.ends_with('/') {
        format!("{}/", relative_path)
    } else {
        relative_path.to_string()
    }
}

/// One-off check without keeping a compiled matcher around.
pub fn should_ignore(relative_path: &str, is_dir: bool, rules: &IgnoreRuleSet) -> bool {
    rules.compile().should_ignore(relative_path, is_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(rules: &[&str]) -> IgnoreMatcher {
        IgnoreRuleSet::new(rules).compile()
    }

    #[test]
    fn empty_rule_set_ignores_nothing() {
        let m = matcher(&[]);
        assert!(!m.should_ignore("src/main.rs", false));
        assert!(!m.should_ignore("src", true));
    }

    #[test]
    fn directory_rule_matches_directory_at_root() {
        let m = matcher(&["node_modules/"]);
        assert!(m.should_ignore("node_modules", true));
        assert!(m.should_ignore("node_modules/", true));
    }

    #[test]
    fn unanchored_directory_rule_matches_at_any_depth() {
        let m = matcher(&["dist/"]);
        assert!(m.should_ignore("sub/dist", true));
        assert!(m.should_ignore("a/b/c/dist", true));
        assert!(!m.should_ignore("sub/distribution", true));
    }

    #[test]
    fn directory_rule_does_not_match_file_of_same_name() {
        let m = matcher(&["build/"]);
        assert!(!m.should_ignore("build", false));
        assert!(!m.should_ignore("src/build", false));
    }

    #[test]
    fn directory_rule_prefix_suppresses_files_beneath_it() {
        let m = matcher(&["node_modules/"]);
        assert!(m.should_ignore("node_modules/bad.js", false));
        assert!(m.should_ignore("node_modules/pkg/index.js", false));
        // Prefix only applies from the root.
        assert!(!m.should_ignore("web/node_modules/bad.js", false));
    }

    #[test]
    fn recursive_wildcard_rule_matches_nested_files() {
        let m = matcher(&["**/*.log"]);
        assert!(m.should_ignore("debug.log", false));
        assert!(m.should_ignore("logs/2024/app.log", false));
        assert!(!m.should_ignore("logs/app.txt", false));
    }

    #[test]
    fn extension_rule_matches_at_any_depth() {
        let m = matcher(&["*.pyc"]);
        assert!(m.should_ignore("mod.pyc", false));
        assert!(m.should_ignore("pkg/sub/mod.pyc", false));
        assert!(!m.should_ignore("pkg/mod.py", false));
    }

    #[test]
    fn single_star_does_not_cross_separators() {
        let m = matcher(&["src/*.rs"]);
        assert!(m.should_ignore("src/main.rs", false));
        assert!(!m.should_ignore("src/bin/tool.rs", false));
        // Unanchored retry still finds it deeper down.
        assert!(m.should_ignore("crates/x/src/lib.rs", false));
    }

    #[test]
    fn leading_slash_rule_is_not_retried_at_depth() {
        let m = matcher(&["/secret.txt"]);
        assert!(!m.should_ignore("nested/secret.txt", false));
    }

    #[test]
    fn exact_file_name_rule_matches_anywhere() {
        let m = matcher(&[".DS_Store"]);
        assert!(m.should_ignore(".DS_Store", false));
        assert!(m.should_ignore("photos/.DS_Store", false));
    }

    #[test]
    fn any_rule_in_the_set_is_enough() {
        let m = matcher(&["*.tmp", "target/", "Cargo.lock"]);
        assert!(m.should_ignore("Cargo.lock", false));
        assert!(m.should_ignore("target", true));
        assert!(m.should_ignore("x/y.tmp", false));
        assert!(!m.should_ignore("Cargo.toml", false));
        assert_eq!(m.matching_rule("target", true), Some("target/"));
        assert_eq!(m.matching_rule("Cargo.toml", false), None);
    }

    #[test]
    fn invalid_glob_rule_still_applies_as_directory_prefix() {
        let m = matcher(&["weird[dir/"]);
        assert!(m.should_ignore("weird[dir/file.txt", false));
        assert!(!m.should_ignore("other/file.txt", false));
    }

    #[test]
    fn excluded_path_matches_only_at_its_own_location() {
        let m = matcher(&[]).exclude_path("docs/");
        assert_eq!(m.matching_rule("docs", true), Some("docs"));
        assert!(m.should_ignore("docs/old.txt", false));
        assert!(!m.should_ignore("src/docs", true));
        assert!(!m.should_ignore("docs-site", true));
        assert!(!m.should_ignore("docs.md", false));
    }

    #[test]
    fn empty_excluded_path_is_dropped() {
        let m = matcher(&[]).exclude_path("").exclude_path("/");
        assert!(m.excluded_paths().is_empty());
        assert!(!m.should_ignore("anything", true));
    }

    #[test]
    fn blank_and_comment_rules_are_dropped() {
        let rules = IgnoreRuleSet::new(["", "  ", "# comment", " *.bak "]);
        assert_eq!(rules.rules(), &["*.bak".to_string()]);
    }

    #[test]
    fn free_function_agrees_with_compiled_matcher() {
        let rules = IgnoreRuleSet::new(["vendor/", "*.min.js"]);
        assert!(should_ignore("vendor", true, &rules));
        assert!(should_ignore("static/app.min.js", false, &rules));
        assert!(!should_ignore("static/app.js", false, &rules));
    }
}
