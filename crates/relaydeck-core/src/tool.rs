//! Tool framework: the `ToolExecutor` trait and the insertion-ordered
//! `ToolRegistry`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use relaydeck_schema::ExecutionContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
}

impl ParamSpec {
    pub fn string(name: impl Into<String>, required: bool, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::String,
            required,
            description: description.into(),
            enum_values: None,
        }
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

/// A named, independently invocable capability.
///
/// Handlers may fail with any error; containment into a `ToolOutcome`
/// happens in the dispatcher, never here.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definition(&self) -> ToolDef;

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ExecutionContext,
    ) -> Result<serde_json::Value>;
}

/// Registry of available tools, preserving declaration order.
///
/// Built once at startup and read-only afterwards. Registering two tools
/// with the same id is a programmer error and panics.
#[derive(Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn ToolExecutor>) {
        let id = tool.definition().id;
        if self.tools.contains_key(&id) {
            panic!("duplicate tool id registered: {id}");
        }
        self.order.push(id.clone());
        self.tools.insert(id, tool);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    /// Tool definitions in declaration order.
    pub fn defs(&self) -> Vec<ToolDef> {
        self.order
            .iter()
            .filter_map(|id| self.tools.get(id))
            .map(|t| t.definition())
            .collect()
    }

    /// Tool ids in declaration order.
    pub fn ids(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Declaration index of a tool id; classifier output is sorted by this.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|t| t == id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
