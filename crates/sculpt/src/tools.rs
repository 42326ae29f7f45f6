//! Built-in capabilities offered to the model.
pub mod filesystem;
pub mod language;
pub mod search;
pub mod structural;
pub mod time;

use std::sync::Arc;

use crate::catalog::ToolCatalog;
use crate::errors::AgentResult;
use search::StructuralSearch;

/// A catalog holding every built-in capability
pub fn builtin_catalog(search: Arc<dyn StructuralSearch>) -> AgentResult<ToolCatalog> {
    let mut catalog = ToolCatalog::new();

    catalog.register(structural::FindDefinition::new(search.clone()))?;
    catalog.register(structural::FindUsage::new(search.clone()))?;
    catalog.register(structural::FindStructs::new(search))?;

    catalog.register(filesystem::ReadFile)?;
    catalog.register(filesystem::WriteFile)?;
    catalog.register(filesystem::ListFiles)?;
    catalog.register(filesystem::WalkDirectory)?;
    catalog.register(filesystem::CreateDirectory)?;
    catalog.register(filesystem::DeleteDirectory)?;
    catalog.register(filesystem::GetCurrentDirectory)?;

    catalog.register(time::GetCurrentTime)?;

    Ok(catalog)
}
