use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::engine::MAX_TURNS;
use crate::models::message::Message;
use crate::prompt_template::load_prompt_file;
use crate::providers::factory::{ModelRef, ProviderType};

pub const SYSTEM_TEMPLATE: &str = "system.md";

/// How one kind of batch rewrite is carried out: which prompt, model and tools
/// to use, and which files it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Filled in from the key the profile is registered under
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Built-in template name or a path to a template file
    pub template: String,
    pub model: ModelRef,
    #[serde(default)]
    pub tools: Vec<String>,
    /// File name suffixes that make a file eligible, e.g. `.go`
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_suffixes() -> Vec<String> {
    vec![".go".to_string()]
}

fn default_max_turns() -> usize {
    MAX_TURNS
}

#[derive(Serialize)]
struct PromptContext<'a> {
    code: &'a str,
    file_path: String,
    base_path: String,
}

impl Profile {
    pub fn is_eligible(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.suffixes.iter().any(|suffix| path.ends_with(suffix.as_str()))
    }

    /// Initial conversation for one file: the shared system prompt followed by
    /// the profile's own template
    pub fn render(
        &self,
        file_path: &Path,
        base_path: &Path,
        code: &str,
    ) -> Result<Vec<Message>, tera::Error> {
        let context = PromptContext {
            code,
            file_path: file_path.display().to_string(),
            base_path: base_path.display().to_string(),
        };

        let system = load_prompt_file(SYSTEM_TEMPLATE, &context)?;
        let user = load_prompt_file(&self.template, &context)?;

        Ok(vec![
            Message::system().with_text(system),
            Message::user().with_text(user),
        ])
    }
}

/// Profiles by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profiles {
    profiles: BTreeMap<String, Profile>,
}

impl Profiles {
    /// `wrap-error` and `log-prism`
    pub fn builtin() -> Self {
        let structural = vec![
            "FindDefinition".to_string(),
            "FindUsage".to_string(),
            "FindStructs".to_string(),
        ];
        let model = ModelRef::new(ProviderType::GoogleAi, "gemini-2.5-flash-lite");

        let mut profiles = Self::default();
        profiles.insert(
            "wrap-error",
            Profile {
                name: String::new(),
                description: "Wrap raw Go error returns with fmt.Errorf context".to_string(),
                template: "wrap_error.md".to_string(),
                model: model.clone(),
                tools: structural.clone(),
                suffixes: default_suffixes(),
                max_turns: MAX_TURNS,
                temperature: Some(0.1),
            },
        );
        profiles.insert(
            "log-prism",
            Profile {
                name: String::new(),
                description: "Add Span and State logging to Go code".to_string(),
                template: "log_prism.md".to_string(),
                model,
                tools: structural,
                suffixes: default_suffixes(),
                max_turns: MAX_TURNS,
                temperature: Some(0.1),
            },
        );
        profiles
    }

    /// Register a profile, replacing any existing one with the same name
    pub fn insert<S: Into<String>>(&mut self, name: S, mut profile: Profile) {
        let name = name.into();
        profile.name = name.clone();
        self.profiles.insert(name, profile);
    }

    /// Add or override profiles, e.g. from configuration
    pub fn merge(&mut self, other: BTreeMap<String, Profile>) {
        for (name, profile) in other {
            self.insert(name, profile);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use std::path::PathBuf;

    #[test]
    fn test_builtin_profiles() {
        let profiles = Profiles::builtin();
        assert_eq!(profiles.names(), vec!["log-prism", "wrap-error"]);

        let wrap = profiles.get("wrap-error").unwrap();
        assert_eq!(wrap.name, "wrap-error");
        assert_eq!(wrap.model.to_string(), "googleai/gemini-2.5-flash-lite");
        assert_eq!(wrap.tools, vec!["FindDefinition", "FindUsage", "FindStructs"]);
        assert_eq!(wrap.temperature, Some(0.1));
    }

    #[test]
    fn test_eligibility_by_suffix() {
        let profile = Profiles::builtin().get("wrap-error").cloned().unwrap();
        assert!(profile.is_eligible(Path::new("pkg/server.go")));
        assert!(!profile.is_eligible(Path::new("pkg/server.go.orig")));
        assert!(!profile.is_eligible(Path::new("README.md")));
    }

    #[test]
    fn test_render_embeds_file_details() {
        let profile = Profiles::builtin().get("wrap-error").cloned().unwrap();
        let messages = profile
            .render(
                &PathBuf::from("repo/pkg/a.go"),
                &PathBuf::from("repo"),
                "package pkg\n",
            )
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].text().contains("repo/pkg/a.go"));
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].text().contains("File Path: repo/pkg/a.go"));
        assert!(messages[1].text().contains("Base Path: repo"));
        assert!(messages[1].text().contains("package pkg"));
    }

    #[test]
    fn test_render_missing_template() {
        let mut profile = Profiles::builtin().get("log-prism").cloned().unwrap();
        profile.template = "does_not_exist.md".to_string();
        assert!(profile
            .render(Path::new("a.go"), Path::new("."), "")
            .is_err());
    }

    #[test]
    fn test_merge_overrides_and_extends() {
        let mut profiles = Profiles::builtin();
        let custom: BTreeMap<String, Profile> = serde_json::from_value(serde_json::json!({
            "wrap-error": {
                "template": "wrap_error.md",
                "model": "ollama/gpt-oss:20b"
            },
            "py-docs": {
                "template": "/tmp/py_docs.md",
                "model": "openai/gpt-4o",
                "suffixes": [".py"],
                "max_turns": 5
            }
        }))
        .unwrap();
        profiles.merge(custom);

        assert_eq!(profiles.names(), vec!["log-prism", "py-docs", "wrap-error"]);
        let wrap = profiles.get("wrap-error").unwrap();
        assert_eq!(wrap.model.to_string(), "ollama/gpt-oss:20b");
        assert!(wrap.tools.is_empty());
        assert_eq!(wrap.max_turns, MAX_TURNS);

        let py = profiles.get("py-docs").unwrap();
        assert_eq!(py.name, "py-docs");
        assert!(py.is_eligible(Path::new("x.py")));
        assert_eq!(py.max_turns, 5);
    }
}
