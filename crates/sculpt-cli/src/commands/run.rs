use std::path::Path;

use anyhow::{anyhow, Result};
use console::style;
use sculpt::batch::{BatchOrchestrator, BatchResult};

use super::{build_engine, cancel_on_ctrl_c, load_settings};

pub async fn execute(config: Option<&Path>, profile: &str, root: &Path) -> Result<()> {
    let settings = load_settings(config)?;
    let profiles = settings.profiles();
    let profile = profiles.get(profile).cloned().ok_or_else(|| {
        anyhow!(
            "unknown profile '{}' (available: {})",
            profile,
            profiles.names().join(", ")
        )
    })?;

    let engine = build_engine(&settings)?;
    let cancel = cancel_on_ctrl_c();

    println!(
        "{} {} over {}",
        style("Running").bold().green(),
        style(&profile.name).bold(),
        root.display()
    );
    let result = BatchOrchestrator::new(engine, profile)
        .run(root, &cancel)
        .await;

    for path in &result.modified {
        println!("  {} {}", style("modified").cyan(), path.display());
    }
    println!("{}", summary(&result));

    match result.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn summary(result: &BatchResult) -> String {
    let files = match result.modified.len() {
        1 => "1 file".to_string(),
        n => format!("{} files", n),
    };
    match &result.error {
        None => format!("{} modified", files),
        Some(err) => format!(
            "{} modified before stopping at {}",
            files,
            err.path().display()
        ),
    }
}
