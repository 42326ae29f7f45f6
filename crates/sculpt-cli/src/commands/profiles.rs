use std::path::Path;

use anyhow::Result;
use console::style;
use sculpt::profile::Profile;

use super::load_settings;

pub async fn execute(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    for profile in settings.profiles().iter() {
        println!("{}", style(&profile.name).bold().green());
        for line in describe(profile) {
            println!("  {}", line);
        }
    }
    Ok(())
}

fn describe(profile: &Profile) -> Vec<String> {
    let mut lines = Vec::new();
    if !profile.description.is_empty() {
        lines.push(profile.description.clone());
    }
    lines.push(format!("model: {}", profile.model));
    lines.push(format!("files: {}", profile.suffixes.join(" ")));
    if !profile.tools.is_empty() {
        lines.push(format!("tools: {}", profile.tools.join(", ")));
    }
    lines
}
