use include_dir::{include_dir, Dir};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

/// Built-in templates, compiled into the binary
static PROMPTS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render a template file. Paths that don't exist on disk are looked up among
/// the built-in templates.
pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();

    let template_content = if template_path.exists() {
        fs::read_to_string(&template_path)
            .map_err(|e| TeraError::chain("Failed to read template file", e))?
    } else {
        PROMPTS
            .get_file(&template_path)
            .and_then(|file| file.contents_utf8())
            .map(str::to_string)
            .ok_or_else(|| {
                TeraError::msg(format!("Template not found: {}", template_path.display()))
            })?
    };

    load_prompt(&template_content, context_data)
}

/// Names of the built-in templates, sorted
pub fn builtin_templates() -> Vec<String> {
    let mut names: Vec<String> = PROMPTS
        .files()
        .map(|file| file.path().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
