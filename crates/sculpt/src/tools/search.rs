//! Seam to the external structural code search engine (ast-grep).
use async_trait::async_trait;
use serde::Deserialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Raw result of one scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    pub success: bool,
    /// Exit status description, e.g. `exit status: 2`
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ScanOutput {
    /// Stdout followed by stderr, as a shell would interleave them
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SgPosition {
    pub line: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SgRange {
    pub start: SgPosition,
    pub end: SgPosition,
}

/// One match as reported by `sg scan --json`. Lines are 0-based.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SgMatch {
    pub text: String,
    pub file: String,
    pub range: SgRange,
}

#[async_trait]
pub trait StructuralSearch: Send + Sync {
    /// Run a single YAML rule, optionally rooted at `base_path`
    async fn scan(&self, rule: &str, base_path: Option<&Path>) -> io::Result<ScanOutput>;
}

/// Runs the `sg` binary with the rule written to a temporary file
#[derive(Debug, Clone)]
pub struct AstGrep {
    binary: PathBuf,
}

impl AstGrep {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for AstGrep {
    fn default() -> Self {
        Self::new("sg")
    }
}

#[async_trait]
impl StructuralSearch for AstGrep {
    async fn scan(&self, rule: &str, base_path: Option<&Path>) -> io::Result<ScanOutput> {
        let mut rule_file = tempfile::Builder::new()
            .prefix("sculpt_rule_")
            .suffix(".yml")
            .tempfile()?;
        rule_file.write_all(rule.as_bytes())?;
        rule_file.flush()?;

        let mut command = Command::new(&self.binary);
        command
            .arg("scan")
            .arg("--json")
            .arg("-r")
            .arg(rule_file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(base) = base_path {
            command.arg(base);
        }

        tracing::debug!(binary = %self.binary.display(), "running structural search");
        let output = command.output().await?;

        Ok(ScanOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sg_matches() {
        let raw = r#"[{"text":"func Foo() {}","file":"a.go","range":{"start":{"line":2,"column":0},"end":{"line":4,"column":1}},"ruleId":"find-definition"}]"#;
        let matches: Vec<SgMatch> = serde_json::from_str(raw).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file, "a.go");
        assert_eq!(matches[0].range.start.line, 2);
        assert_eq!(matches[0].range.end.line, 4);
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let search = AstGrep::new("/nonexistent/sculpt-sg-binary");
        let result = search.scan("id: x", None).await;
        assert!(result.is_err());
    }
}
