//! Configuration surface: one credential variable per provider-side
//! concern, plus a YAML agent roster.
//!
//! Absence of a credential silently removes the corresponding capability
//! (the provider from routing, the tool from the registry); it is never a
//! startup error.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::code_tool::CodeRunTool;
use crate::data_tool::DataAnalysisTool;
use crate::email_tool::EmailTool;
use crate::image_tool::ImageGenTool;
use crate::tool::ToolRegistry;
use crate::web_search_tool::WebSearchTool;
use crate::AgentConfig;

pub const BRAVE_API_KEY_VAR: &str = "BRAVE_API_KEY";
pub const EMAIL_WEBHOOK_VAR: &str = "EMAIL_WEBHOOK_URL";
pub const IMAGE_API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize)]
struct RosterFile {
    agents: Vec<AgentConfig>,
}

/// Load the agent roster from a YAML file.
pub fn load_agents(path: &Path) -> Result<Vec<AgentConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading agent roster {}", path.display()))?;
    let roster: RosterFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing agent roster {}", path.display()))?;
    Ok(roster.agents)
}

/// Build the builtin tool registry. Network-backed tools register only
/// when their credential/endpoint variable is set; local tools always
/// register.
pub fn builtin_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    if let Some(key) = non_empty_env(BRAVE_API_KEY_VAR) {
        registry.register(Arc::new(WebSearchTool::new(key)));
    }
    if let Some(key) = non_empty_env(IMAGE_API_KEY_VAR) {
        registry.register(Arc::new(ImageGenTool::new(key)));
    }
    if let Some(url) = non_empty_env(EMAIL_WEBHOOK_VAR) {
        registry.register(Arc::new(EmailTool::new(url)));
    }
    registry.register(Arc::new(CodeRunTool::default()));
    registry.register(Arc::new(DataAnalysisTool::new()));

    tracing::info!("builtin tool registry: {:?}", registry.ids());
    registry
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
