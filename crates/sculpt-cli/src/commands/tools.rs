use std::sync::Arc;

use anyhow::Result;
use console::style;
use sculpt::catalog::ToolCatalog;
use sculpt::tools::builtin_catalog;
use sculpt::tools::search::AstGrep;

pub async fn execute(verbose: bool) -> Result<()> {
    let catalog = builtin_catalog(Arc::new(AstGrep::default()))?;
    for (name, kind, summary) in listing(&catalog) {
        println!("{} {} {}", style(name).bold(), style(format!("[{}]", kind)).dim(), summary);
        if verbose {
            if let Some(tool) = catalog.get(name) {
                println!("{}", serde_json::to_string_pretty(&tool.input_schema)?);
            }
        }
    }
    Ok(())
}

/// Name, kind and the first line of the description for every tool
fn listing(catalog: &ToolCatalog) -> Vec<(&str, String, String)> {
    catalog
        .names()
        .into_iter()
        .filter_map(|name| {
            let tool = catalog.get(name)?;
            let kind = catalog.kind(name)?;
            let summary = tool.description.lines().next().unwrap_or_default().to_string();
            Some((name, kind.to_string(), summary))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_covers_catalog() {
        let catalog = builtin_catalog(Arc::new(AstGrep::default())).unwrap();
        let listing = listing(&catalog);
        assert_eq!(listing.len(), catalog.len());

        let (_, kind, summary) = listing
            .iter()
            .find(|(name, _, _)| *name == "FindDefinition")
            .unwrap();
        assert_eq!(kind, "structural_lookup");
        assert!(!summary.is_empty());
    }
}
