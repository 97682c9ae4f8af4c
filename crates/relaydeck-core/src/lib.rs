pub mod assemble;
pub mod code_tool;
pub mod config;
pub mod data_tool;
pub mod dispatch;
pub mod email_tool;
pub mod executor;
pub mod image_tool;
pub mod intent;
pub mod orchestrator;
pub mod router;
pub mod tool;
pub mod usage;
pub mod web_search_tool;

pub use assemble::*;
pub use code_tool::*;
pub use config::*;
pub use data_tool::*;
pub use dispatch::*;
pub use email_tool::*;
pub use executor::*;
pub use image_tool::*;
pub use intent::*;
pub use orchestrator::*;
pub use router::*;
pub use tool::*;
pub use usage::*;
pub use web_search_tool::*;

use serde::{Deserialize, Serialize};

/// Which model an agent asks for first, and which model ids to try next
/// before the executor's static chain kicks in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPolicy {
    pub primary: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent_id: String,
    pub name: String,
    /// Base persona/instructions placed at the top of the system message.
    #[serde(default)]
    pub instructions: String,
    /// Tool ids this agent may trigger. Ids not present in the registry are
    /// ignored at classification time.
    #[serde(default)]
    pub enabled_tools: Vec<String>,
    pub model_policy: ModelPolicy,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
