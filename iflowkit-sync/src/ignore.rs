//! The ignore engine: glob patterns from `.iflowkit/ignore` plus built-in
//! defaults, compiled to anchored regexes.
//!
//! Pattern syntax:
//! - `**` matches across path segments
//! - `*` matches any characters except `/`
//! - `?` matches a single character except `/`
//! - lines starting with `#` are comments, blank lines are skipped
//! - a pattern without `/` is treated as `**/<pattern>` (match anywhere)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use iflowkit_core::fsio::{atomic_write_file, ensure_dir};
use iflowkit_core::metadata::MARKER_DIR;

use crate::error::SyncError;

const IGNORE_FILE_NAME: &str = "ignore";

/// Applied even when `.iflowkit/ignore` is missing: files known to change
/// across CPI export operations without functional impact.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 2] = [
    "IntegrationPackage/**/metainfo.prop",
    "IntegrationPackage/**/src/main/resources/parameters.prop",
];

/// Matches repo-relative slash-separated paths against ignore patterns.
#[derive(Debug)]
pub struct RepoIgnore {
    patterns: Vec<IgnorePattern>,
}

#[derive(Debug)]
struct IgnorePattern {
    #[allow(dead_code)]
    raw: String,
    regex: Regex,
}

fn ignore_file_path(repo_root: &Path) -> PathBuf {
    repo_root.join(MARKER_DIR).join(IGNORE_FILE_NAME)
}

/// Create `.iflowkit/ignore` from the default template if missing.
pub fn ensure_ignore_file(repo_root: &Path) -> Result<(), SyncError> {
    ensure_dir(&repo_root.join(MARKER_DIR))?;
    let path = ignore_file_path(repo_root);
    if path.exists() {
        return Ok(());
    }
    let mut lines = vec![
        "# iflowkit sync ignore patterns (repo-relative paths)".to_string(),
        "#".to_string(),
        "# Default volatile files (safe to ignore):".to_string(),
    ];
    lines.extend(DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()));
    lines.push(String::new());
    atomic_write_file(&path, lines.join("\n").as_bytes())?;
    Ok(())
}

impl RepoIgnore {
    /// Read `.iflowkit/ignore` and merge with the built-in defaults.
    pub fn load(repo_root: &Path) -> Result<RepoIgnore, SyncError> {
        let mut ignore = RepoIgnore {
            patterns: Vec::new(),
        };
        let mut seen = HashSet::new();

        for pattern in DEFAULT_IGNORE_PATTERNS {
            ignore.add(pattern, "", 0, &mut seen)?;
        }

        let path = ignore_file_path(repo_root);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ignore),
            Err(e) => return Err(crate::error::io_err(&path, e)),
        };

        let origin = path.display().to_string();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            ignore.add(line, &origin, line_no + 1, &mut seen)?;
        }
        Ok(ignore)
    }

    /// Build from an explicit pattern list (defaults are not added).
    pub fn from_patterns(patterns: &[&str]) -> Result<RepoIgnore, SyncError> {
        let mut ignore = RepoIgnore {
            patterns: Vec::new(),
        };
        let mut seen = HashSet::new();
        for pattern in patterns {
            ignore.add(pattern, "", 0, &mut seen)?;
        }
        Ok(ignore)
    }

    fn add(
        &mut self,
        raw: &str,
        origin: &str,
        line: usize,
        seen: &mut HashSet<String>,
    ) -> Result<(), SyncError> {
        let norm = raw.trim().replace('\\', "/");
        let norm = norm.strip_prefix("./").unwrap_or(&norm);
        if norm.is_empty() || !seen.insert(norm.to_string()) {
            return Ok(());
        }
        let compiled = compile_pattern(norm).map_err(|source| SyncError::IgnorePattern {
            origin: origin.to_string(),
            line,
            source,
        })?;
        self.patterns.push(compiled);
        Ok(())
    }

    /// Whether a repo-relative path matches any pattern.
    pub fn is_ignored(&self, path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let norm = path.trim().replace('\\', "/");
        let norm = norm.strip_prefix("./").unwrap_or(&norm);
        if norm.is_empty() {
            return false;
        }
        self.patterns.iter().any(|p| p.regex.is_match(norm))
    }

    /// Remove ignored paths and de-duplicate, preserving first-seen order.
    pub fn filter(&self, paths: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let norm = path.trim().replace('\\', "/");
            if norm.is_empty() || self.is_ignored(&norm) {
                continue;
            }
            if seen.insert(norm.clone()) {
                out.push(norm);
            }
        }
        out
    }
}

fn compile_pattern(raw: &str) -> Result<IgnorePattern, regex::Error> {
    let mut pattern = raw.to_string();
    if !pattern.contains('/') {
        pattern = format!("**/{pattern}");
    }
    let regex = Regex::new(&glob_to_regex(&pattern))?;
    Ok(IgnorePattern {
        raw: raw.to_string(),
        regex,
    })
}

/// Convert a glob supporting `**` into an anchored full-string regex.
fn glob_to_regex(glob: &str) -> String {
    let bytes = glob.as_bytes();
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i] as char;
        match ch {
            '*' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'*' {
                    out.push_str(".*");
                    i += 1;
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
        i += 1;
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn glob_translation() {
        assert_eq!(glob_to_regex("**/x.prop"), "^.*/x\\.prop$");
        assert_eq!(glob_to_regex("a/*.json"), "^a/[^/]*\\.json$");
        assert_eq!(glob_to_regex("a?c"), "^a[^/]c$");
    }

    #[test]
    fn double_star_crosses_segments_single_star_does_not() {
        let ign = RepoIgnore::from_patterns(&["IntegrationPackage/**/metainfo.prop"]).unwrap();
        assert!(ign.is_ignored("IntegrationPackage/iFlows/Flow_A/metainfo.prop"));
        assert!(ign.is_ignored("IntegrationPackage/a/b/c/metainfo.prop"));
        assert!(!ign.is_ignored("Other/iFlows/Flow_A/metainfo.prop"));

        let ign = RepoIgnore::from_patterns(&["IntegrationPackage/*/metainfo.prop"]).unwrap();
        assert!(ign.is_ignored("IntegrationPackage/x/metainfo.prop"));
        assert!(!ign.is_ignored("IntegrationPackage/x/y/metainfo.prop"));
    }

    #[test]
    fn bare_pattern_matches_anywhere() {
        let ign = RepoIgnore::from_patterns(&["*.log"]).unwrap();
        assert!(ign.is_ignored("debug.log"));
        assert!(ign.is_ignored("a/b/c/debug.log"));
        assert!(!ign.is_ignored("debug.log.txt"));
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        let ign = RepoIgnore::from_patterns(&["a/file.name+x.json"]).unwrap();
        assert!(ign.is_ignored("a/file.name+x.json"));
        assert!(!ign.is_ignored("a/fileXname+x.json"));
    }

    #[test]
    fn filter_dedupes_and_preserves_order() {
        let ign = RepoIgnore::from_patterns(&["*.prop"]).unwrap();
        let out = ign.filter(&strings(&[
            "b.json",
            "a/metainfo.prop",
            "a.json",
            "b.json",
            "",
        ]));
        assert_eq!(out, strings(&["b.json", "a.json"]));
    }

    #[test]
    fn adding_a_pattern_only_removes_paths() {
        let paths = strings(&["a.json", "a/metainfo.prop", "b/x.txt"]);
        let before = RepoIgnore::from_patterns(&["*.prop"]).unwrap().filter(&paths);
        let after = RepoIgnore::from_patterns(&["*.prop", "*.txt"])
            .unwrap()
            .filter(&paths);
        for p in &after {
            assert!(before.contains(p), "filter must be monotonic");
        }
        assert!(after.len() < before.len());
    }

    #[test]
    fn load_merges_defaults_with_file_patterns() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".iflowkit")).unwrap();
        fs::write(
            tmp.path().join(".iflowkit/ignore"),
            "# comment\n\ncustom/**/*.bak\n",
        )
        .unwrap();

        let ign = RepoIgnore::load(tmp.path()).unwrap();
        assert!(ign.is_ignored("IntegrationPackage/iFlows/X/metainfo.prop"));
        assert!(ign.is_ignored("IntegrationPackage/iFlows/X/src/main/resources/parameters.prop"));
        assert!(ign.is_ignored("custom/deep/file.bak"));
        assert!(!ign.is_ignored("IntegrationPackage/iFlows/X/flow.iflw"));
    }

    #[test]
    fn load_without_file_keeps_defaults_only() {
        let tmp = TempDir::new().unwrap();
        let ign = RepoIgnore::load(tmp.path()).unwrap();
        assert!(ign.is_ignored("IntegrationPackage/a/metainfo.prop"));
        assert!(!ign.is_ignored("anything/else.json"));
    }

    #[test]
    fn ensure_ignore_file_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        ensure_ignore_file(tmp.path()).unwrap();
        let path = tmp.path().join(".iflowkit/ignore");
        let first = fs::read_to_string(&path).unwrap();
        assert!(first.contains("metainfo.prop"));

        fs::write(&path, "user-pattern\n").unwrap();
        ensure_ignore_file(tmp.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "user-pattern\n");
    }
}
