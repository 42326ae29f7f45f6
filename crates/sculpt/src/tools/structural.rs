//! Definition, usage and struct lookups backed by [`StructuralSearch`].
use async_trait::async_trait;
use indoc::formatdoc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::Arc;

use super::language::Language;
use super::search::{ScanOutput, SgMatch, StructuralSearch};
use crate::catalog::{CapabilityKind, ToolContext, TypedCapability};
use crate::errors::{AgentError, AgentResult};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SymbolQuery {
    /// Symbol name to search for; interpreted as a regular expression
    pub query: String,
    pub language: Language,
    /// Directory to search, defaults to the current directory
    #[serde(default)]
    pub base_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StructQuery {
    /// Name of the struct or class
    pub struct_name: String,
    pub language: Language,
    #[serde(default)]
    pub base_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct LookupOutput {
    pub result: String,
}

pub fn definition_rule(language: Language, query: &str) -> String {
    formatdoc! {"
        id: find-definition
        language: {language}
        rule:
          any:
            - kind: function_declaration
              has:
                field: name
                regex: ^{query}$
            - kind: method_declaration
              has:
                field: name
                regex: ^{query}$
            - kind: type_spec
              has:
                field: name
                regex: ^{query}$
    "}
}

pub fn usage_rule(language: Language, query: &str) -> String {
    formatdoc! {"
        id: find-usage
        language: {language}
        rule:
          any:
            - kind: function_declaration
            - kind: method_declaration
            - kind: type_declaration
          has:
            stopBy: end
            regex: {query}
    "}
}

pub fn struct_rule(language: Language, struct_name: &str) -> AgentResult<String> {
    let patterns = match language {
        Language::Go => vec![
            format!("type {struct_name} struct {{ $$$ }}"),
            format!("func ($R {struct_name}) $M($$$) $$$"),
            format!("func ($R *{struct_name}) $M($$$) $$$"),
        ],
        Language::Python => vec![format!("class {struct_name}: $$$")],
        Language::TypeScript | Language::JavaScript | Language::Java => {
            vec![format!("class {struct_name} {{ $$$ }}")]
        }
        other => {
            return Err(AgentError::ExecutionError(format!(
                "unsupported language: {other}"
            )))
        }
    };

    let any: String = patterns
        .iter()
        .map(|pattern| format!("    - pattern: '{pattern}'\n"))
        .collect();

    Ok(format!(
        "id: find-structs\nlanguage: {language}\nrule:\n  any:\n{any}"
    ))
}

/// Render a definition or usage scan as text for the model
pub fn render_lookup(scan: io::Result<ScanOutput>, language: Language, empty: &str) -> String {
    let output = match scan {
        Ok(output) => output,
        Err(e) => return format!("Error running ast-grep: {e}"),
    };
    if !output.success && output.combined().is_empty() {
        return format!("Error running ast-grep: {}", output.status);
    }

    let matches: Vec<SgMatch> = match serde_json::from_str(&output.stdout) {
        Ok(matches) => matches,
        Err(_) => return output.combined(),
    };
    if matches.is_empty() {
        return empty.to_string();
    }

    matches
        .iter()
        .map(|m| {
            format!(
                "File: {} (Line {}:{})\n```{}\n{}\n```\n\n",
                m.file,
                m.range.start.line + 1,
                m.range.end.line + 1,
                language,
                m.text
            )
        })
        .collect()
}

/// Render a struct scan; unparseable engine output is a handler error here
pub fn render_structs(scan: io::Result<ScanOutput>) -> AgentResult<String> {
    let output = match scan {
        Ok(output) => output,
        Err(e) => return Ok(format!("Error running ast-grep: {e}")),
    };

    let matches: Vec<SgMatch> = if output.stdout.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&output.stdout).map_err(|e| {
            AgentError::ExecutionError(format!("failed to parse sg output: {e}"))
        })?
    };
    if matches.is_empty() {
        return Ok("No struct/class or methods found.".to_string());
    }

    Ok(matches
        .iter()
        .map(|m| format!("File: {}:{}\n{}\n\n", m.file, m.range.start.line + 1, m.text))
        .collect())
}

async fn scan_with_cancel(
    search: &dyn StructuralSearch,
    ctx: &ToolContext,
    rule: &str,
    base_path: Option<&str>,
) -> AgentResult<io::Result<ScanOutput>> {
    let base = base_path.filter(|p| !p.is_empty()).map(Path::new);
    tokio::select! {
        _ = ctx.cancel.cancelled() => Err(AgentError::ExecutionError("search cancelled".to_string())),
        result = search.scan(rule, base) => Ok(result),
    }
}

pub struct FindDefinition {
    search: Arc<dyn StructuralSearch>,
}

impl FindDefinition {
    pub fn new(search: Arc<dyn StructuralSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl TypedCapability for FindDefinition {
    type Input = SymbolQuery;
    type Output = LookupOutput;
    const NAME: &'static str = "FindDefinition";

    fn description(&self) -> &str {
        "Finds the definition of a symbol (function, method, or type) in the codebase using ast-grep."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::StructuralLookup
    }

    async fn run(&self, ctx: &ToolContext, input: SymbolQuery) -> AgentResult<LookupOutput> {
        let rule = definition_rule(input.language, &input.query);
        let scan = scan_with_cancel(self.search.as_ref(), ctx, &rule, input.base_path.as_deref())
            .await?;
        Ok(LookupOutput {
            result: render_lookup(scan, input.language, "No definitions found."),
        })
    }
}

pub struct FindUsage {
    search: Arc<dyn StructuralSearch>,
}

impl FindUsage {
    pub fn new(search: Arc<dyn StructuralSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl TypedCapability for FindUsage {
    type Input = SymbolQuery;
    type Output = LookupOutput;
    const NAME: &'static str = "FindUsage";

    fn description(&self) -> &str {
        "Finds usages of a symbol (function, method, or type) in the codebase using ast-grep."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::StructuralLookup
    }

    async fn run(&self, ctx: &ToolContext, input: SymbolQuery) -> AgentResult<LookupOutput> {
        let rule = usage_rule(input.language, &input.query);
        let scan = scan_with_cancel(self.search.as_ref(), ctx, &rule, input.base_path.as_deref())
            .await?;
        Ok(LookupOutput {
            result: render_lookup(scan, input.language, "No usages found."),
        })
    }
}

pub struct FindStructs {
    search: Arc<dyn StructuralSearch>,
}

impl FindStructs {
    pub fn new(search: Arc<dyn StructuralSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl TypedCapability for FindStructs {
    type Input = StructQuery;
    type Output = LookupOutput;
    const NAME: &'static str = "FindStructs";

    fn description(&self) -> &str {
        "Finds the definition of a struct/class and its methods."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::StructuralLookup
    }

    async fn run(&self, ctx: &ToolContext, input: StructQuery) -> AgentResult<LookupOutput> {
        let rule = struct_rule(input.language, &input.struct_name)?;
        let scan = scan_with_cancel(self.search.as_ref(), ctx, &rule, input.base_path.as_deref())
            .await?;
        Ok(LookupOutput {
            result: render_structs(scan)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::search::mock::MockSearch;
    use tokio_util::sync::CancellationToken;

    const ONE_MATCH: &str = r#"[{"text":"func Load() error {\n\treturn nil\n}","file":"pkg/load.go","range":{"start":{"line":9},"end":{"line":11}}}]"#;

    fn ctx() -> ToolContext {
        ToolContext::new("1", CancellationToken::new())
    }

    fn query(query: &str) -> SymbolQuery {
        SymbolQuery {
            query: query.to_string(),
            language: Language::Go,
            base_path: Some("pkg".to_string()),
        }
    }

    #[test]
    fn test_definition_rule_anchors_name() {
        let rule = definition_rule(Language::Go, "Load");
        assert!(rule.starts_with("id: find-definition\nlanguage: go\nrule:\n  any:\n"));
        assert_eq!(rule.matches("regex: ^Load$").count(), 3);
        assert!(rule.contains("    - kind: type_spec\n"));
    }

    #[test]
    fn test_usage_rule() {
        let rule = usage_rule(Language::Python, "load_.*");
        assert!(rule.contains("language: python\n"));
        assert!(rule.contains("  has:\n    stopBy: end\n    regex: load_.*\n"));
    }

    #[test]
    fn test_struct_rule_per_language() {
        let go = struct_rule(Language::Go, "Server").unwrap();
        assert!(go.contains("    - pattern: 'type Server struct { $$$ }'\n"));
        assert!(go.contains("    - pattern: 'func ($R *Server) $M($$$) $$$'\n"));

        let java = struct_rule(Language::Java, "Server").unwrap();
        assert!(java.contains("    - pattern: 'class Server { $$$ }'\n"));

        let err = struct_rule(Language::Rust, "Server").unwrap_err();
        assert_eq!(
            err,
            AgentError::ExecutionError("unsupported language: rust".to_string())
        );
    }

    #[test]
    fn test_render_lookup_formats_matches() {
        let scan = Ok(MockSearch::with_stdout(ONE_MATCH).output);
        let text = render_lookup(scan, Language::Go, "No definitions found.");
        assert_eq!(
            text,
            "File: pkg/load.go (Line 10:12)\n```go\nfunc Load() error {\n\treturn nil\n}\n```\n\n"
        );
    }

    #[test]
    fn test_render_lookup_degraded_outputs() {
        let empty = Ok(MockSearch::with_stdout("[]").output);
        assert_eq!(
            render_lookup(empty, Language::Go, "No usages found."),
            "No usages found."
        );

        let raw = Ok(MockSearch::with_stdout("error: invalid rule").output);
        assert_eq!(
            render_lookup(raw, Language::Go, "No usages found."),
            "error: invalid rule"
        );

        let failed = Ok(ScanOutput {
            success: false,
            status: "exit status: 2".to_string(),
            ..Default::default()
        });
        assert_eq!(
            render_lookup(failed, Language::Go, "No usages found."),
            "Error running ast-grep: exit status: 2"
        );

        let spawn = Err(io::Error::new(io::ErrorKind::NotFound, "sg not found"));
        assert_eq!(
            render_lookup(spawn, Language::Go, "No usages found."),
            "Error running ast-grep: sg not found"
        );
    }

    #[test]
    fn test_render_structs() {
        let scan = Ok(MockSearch::with_stdout(ONE_MATCH).output);
        assert_eq!(
            render_structs(scan).unwrap(),
            "File: pkg/load.go:10\nfunc Load() error {\n\treturn nil\n}\n\n"
        );

        let empty = Ok(MockSearch::with_stdout("").output);
        assert_eq!(
            render_structs(empty).unwrap(),
            "No struct/class or methods found."
        );

        let garbage = Ok(MockSearch::with_stdout("not json").output);
        assert!(render_structs(garbage).is_err());
    }

    #[tokio::test]
    async fn test_find_definition_passes_rule_and_base_path() {
        let search = Arc::new(MockSearch::with_stdout(ONE_MATCH));
        let tool = FindDefinition::new(search.clone());

        let output = tool.run(&ctx(), query("Load")).await.unwrap();
        assert!(output.result.starts_with("File: pkg/load.go (Line 10:12)"));

        let calls = search.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("regex: ^Load$"));
        assert_eq!(calls[0].1.as_deref(), Some(Path::new("pkg")));
    }

    #[tokio::test]
    async fn test_find_usage_reports_missing_engine_as_text() {
        let search = Arc::new(MockSearch {
            fail: Some("sg not found".to_string()),
            ..Default::default()
        });
        let tool = FindUsage::new(search.clone());

        let output = tool.run(&ctx(), query("Load")).await.unwrap();
        assert_eq!(output.result, "Error running ast-grep: sg not found");
        assert_eq!(search.rules().len(), 1);
    }

    #[tokio::test]
    async fn test_find_structs_unsupported_language_is_error() {
        let search = Arc::new(MockSearch::with_stdout("[]"));
        let tool = FindStructs::new(search.clone());
        let input = StructQuery {
            struct_name: "Server".to_string(),
            language: Language::Ruby,
            base_path: None,
        };

        assert!(tool.run(&ctx(), input).await.is_err());
        assert!(search.rules().is_empty());
    }
}
