//! File search builtin tool
//!
//! Bounded recursive search under the home directory with `*` wildcards,
//! formatted for voice output.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::tools::{ParamKind, ParamSpec, Tool};
use crate::{Error, Result};

/// Cap on returned matches
const MAX_RESULTS: usize = 20;

/// Recursion depth cap; keeps a worst-case home directory walk bounded
const MAX_DEPTH: usize = 6;

/// Directory names never descended into
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "venv",
    "node_modules",
    "__pycache__",
    ".cache",
    ".npm",
    ".cargo",
    "target",
];

/// Searches for files by name pattern under the user's home directory
pub struct FindFilesTool {
    root: PathBuf,
}

impl FindFilesTool {
    /// Search under the user's home directory
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the home directory cannot be determined
    pub fn new() -> Result<Self> {
        let dirs = directories::UserDirs::new()
            .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))?;
        Ok(Self {
            root: dirs.home_dir().to_path_buf(),
        })
    }

    /// Search under an explicit root (used by tests)
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for FindFilesTool {
    fn name(&self) -> &str {
        "find_files"
    }

    fn description(&self) -> &str {
        "Find files by name under the home directory; pattern supports * wildcards (e.g. *.pdf)"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "pattern",
            ParamKind::String,
            "Filename pattern, e.g. *.pdf or report",
        )]
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let pattern = arguments["pattern"].as_str().unwrap_or_default().trim();
        if pattern.is_empty() {
            return Ok("No search pattern provided.".to_string());
        }

        let matcher = pattern_to_regex(pattern)?;
        let root = self.root.clone();
        let pattern_owned = pattern.to_string();

        // Directory walking is blocking IO
        let matches = tokio::task::spawn_blocking(move || {
            let mut found = Vec::new();
            walk(&root, 0, &matcher, &mut found);
            found
        })
        .await
        .map_err(|e| Error::Tool(format!("file search task failed: {e}")))?;

        if matches.is_empty() {
            return Ok(format!("No files found matching '{pattern_owned}'."));
        }

        // Voice-friendly: "1. name in folder" lines
        let mut out = format!("Found {} files:\n", matches.len());
        for (i, path) in matches.iter().enumerate() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let folder = path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            out.push_str(&format!("{}. {name} in {folder}\n", i + 1));
        }
        if matches.len() >= MAX_RESULTS {
            out.push_str(&format!("Showing first {MAX_RESULTS} results.\n"));
        }
        Ok(out)
    }
}

/// Translate a `*`-wildcard pattern into an anchored case-insensitive regex.
/// A pattern without wildcards matches as a substring.
fn pattern_to_regex(pattern: &str) -> Result<Regex> {
    let body = if pattern.contains('*') {
        let escaped = regex::escape(pattern).replace(r"\*", ".*");
        format!("^{escaped}$")
    } else {
        regex::escape(pattern)
    };
    Regex::new(&format!("(?i){body}"))
        .map_err(|e| Error::Tool(format!("bad search pattern: {e}")))
}

fn walk(dir: &Path, depth: usize, matcher: &Regex, found: &mut Vec<PathBuf>) {
    if depth > MAX_DEPTH || found.len() >= MAX_RESULTS {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if found.len() >= MAX_RESULTS {
            return;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            if name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_str()) {
                continue;
            }
            walk(&path, depth + 1, matcher, found);
        } else if matcher.is_match(&name) {
            found.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sotto-find-{}-{label}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("docs")).unwrap();
        std::fs::create_dir_all(dir.join("node_modules")).unwrap();
        std::fs::write(dir.join("docs/report.pdf"), b"x").unwrap();
        std::fs::write(dir.join("docs/notes.txt"), b"x").unwrap();
        std::fs::write(dir.join("node_modules/skip.pdf"), b"x").unwrap();
        dir
    }

    #[tokio::test]
    async fn wildcard_pattern_matches_extension() {
        let tool = FindFilesTool::with_root(fixture_dir("wildcard"));
        let out = tool.call(&json!({"pattern": "*.pdf"})).await.unwrap();
        assert!(out.contains("report.pdf in docs"));
        assert!(!out.contains("skip.pdf"), "excluded dirs must be skipped");
    }

    #[tokio::test]
    async fn substring_pattern_matches() {
        let tool = FindFilesTool::with_root(fixture_dir("substring"));
        let out = tool.call(&json!({"pattern": "notes"})).await.unwrap();
        assert!(out.contains("notes.txt"));
    }

    #[tokio::test]
    async fn no_match_reports_cleanly() {
        let tool = FindFilesTool::with_root(fixture_dir("nomatch"));
        let out = tool.call(&json!({"pattern": "*.docx"})).await.unwrap();
        assert!(out.contains("No files found"));
    }

    #[test]
    fn pattern_regex_is_case_insensitive_and_anchored() {
        let re = pattern_to_regex("*.PDF").unwrap();
        assert!(re.is_match("report.pdf"));
        assert!(!re.is_match("report.pdf.bak"));
    }
}
