use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a conversation message. The ordering of messages carrying these
/// roles is insertion order and is exactly what goes upstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// Per-turn execution state handed to tools and the model call.
///
/// Created at the start of one user turn and owned exclusively by it.
/// `history` belongs to the caller across turns; the core only appends the
/// user and assistant messages of the current turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub user_id: String,
    pub session_id: Uuid,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    pub fn new(user_id: impl Into<String>, session_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            session_id,
            agent_id: None,
            history: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::assistant(content));
    }
}

/// Result of one tool run. A failed handler degrades to `Failure`; it never
/// aborts the turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome {
    Success { payload: serde_json::Value },
    Failure { kind: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_id: String,
    pub parameters: serde_json::Value,
    pub outcome: ToolOutcome,
}

impl ToolInvocation {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }
}

/// Running token/call/cost accumulator scoped to a single orchestration run.
///
/// Not a persisted ledger. Cost only ever grows within a turn.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub tokens: u64,
    pub api_calls: u32,
    pub cost: f64,
}

impl UsageRecord {
    /// Record one completed provider call.
    pub fn add_call(&mut self, tokens: u64, cost: f64) {
        self.tokens += tokens;
        self.api_calls += 1;
        self.cost += cost.max(0.0);
    }

    /// Record a flat-priced unit (per-call billed tools).
    pub fn add_flat(&mut self, cost: f64) {
        self.cost += cost.max(0.0);
    }

    pub fn merge(&mut self, other: &UsageRecord) {
        self.tokens += other.tokens;
        self.api_calls += other.api_calls;
        self.cost += other.cost.max(0.0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model_used: String,
    pub response_time_ms: u64,
    pub confidence: f32,
}

/// Terminal artifact of one orchestration run, serialized as JSON for the
/// UI layer. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    pub tools_used: Vec<String>,
    pub usage: UsageRecord,
    pub metadata: ResponseMetadata,
}
