use std::path::Path;

use anyhow::{anyhow, Result};
use sculpt::providers::factory::ModelRef;
use sculpt::translate::{default_translation_model, translate, TranslationInput};

use super::{build_engine, cancel_on_ctrl_c, load_settings};

pub async fn execute(
    config: Option<&Path>,
    input: TranslationInput,
    model: Option<&str>,
) -> Result<()> {
    let model = match model {
        Some(model) => model.parse::<ModelRef>()?,
        None => default_translation_model(),
    };
    if input.text.trim().is_empty() {
        return Err(anyhow!("nothing to translate"));
    }

    let settings = load_settings(config)?;
    let engine = build_engine(&settings)?;
    let cancel = cancel_on_ctrl_c();

    let result = translate(&engine, &model, &input, &cancel).await?;
    tracing::debug!(
        input_tokens = ?result.usage.input_tokens,
        output_tokens = ?result.usage.output_tokens,
        "translation finished"
    );
    println!("{}", result.value.translated);
    Ok(())
}
