//! Builds the provider-agnostic message sequence for one turn.
//!
//! Order is contractual: system (persona + tool list), prior history
//! verbatim, the new user message, and finally (only when tools ran) one
//! synthetic user-role message carrying the tool results. Tool results
//! come strictly after the user's own message so the model reads them as
//! newly retrieved evidence, not as part of the question.

use relaydeck_provider::WireMessage;
use relaydeck_schema::{ChatMessage, Role, ToolInvocation, ToolOutcome};

use crate::tool::ToolRegistry;
use crate::AgentConfig;

pub fn assemble(
    agent: &AgentConfig,
    tools: &ToolRegistry,
    history: &[ChatMessage],
    invocations: &[ToolInvocation],
    user_message: &str,
) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);

    messages.push(WireMessage::system(system_prompt(agent, tools)));

    for msg in history {
        messages.push(WireMessage {
            role: role_str(msg.role).to_string(),
            content: msg.content.clone(),
        });
    }

    messages.push(WireMessage::user(user_message));

    if !invocations.is_empty() {
        messages.push(WireMessage::user(render_tool_results(invocations)));
    }

    messages
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Persona plus a name/description rendering of the agent's enabled tools.
/// The full parameter schemas stay out of the prompt.
fn system_prompt(agent: &AgentConfig, tools: &ToolRegistry) -> String {
    let mut prompt = if agent.instructions.is_empty() {
        format!("You are {}, a helpful assistant.", agent.name)
    } else {
        agent.instructions.clone()
    };

    let available: Vec<String> = tools
        .defs()
        .into_iter()
        .filter(|def| agent.enabled_tools.iter().any(|id| id == &def.id))
        .map(|def| format!("- {}: {}", def.name, def.description))
        .collect();

    if !available.is_empty() {
        prompt.push_str("\n\nTools available to you (run on your behalf when relevant):\n");
        prompt.push_str(&available.join("\n"));
    }

    prompt
}

fn render_tool_results(invocations: &[ToolInvocation]) -> String {
    let mut parts = Vec::with_capacity(invocations.len() + 1);

    for inv in invocations {
        let rendered = match &inv.outcome {
            ToolOutcome::Success { payload } => {
                serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string())
            }
            ToolOutcome::Failure { kind, message } => {
                format!("(no result available: {kind}: {message})")
            }
        };
        parts.push(format!("[{}] {rendered}", inv.tool_id));
    }

    parts.push(
        "Answer the question above using these freshly retrieved tool results where they help."
            .to_string(),
    );
    parts.join("\n")
}
