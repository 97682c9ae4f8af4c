//! Sequential tool execution with failure containment.
//!
//! One failing tool degrades its own contribution to a `Failure` outcome
//! and never aborts the turn or the tools queued behind it.

use std::sync::Arc;
use std::time::Duration;

use relaydeck_schema::{ExecutionContext, ToolInvocation, ToolOutcome};
use tokio::time::timeout;

use crate::intent::ToolSelection;
use crate::tool::ToolRegistry;

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    call_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            call_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Run the selected tools strictly sequentially, in classifier output
    /// order. Tools share only the read-only context; there is no
    /// cross-tool data flow within a turn.
    pub async fn execute(
        &self,
        selections: &[ToolSelection],
        ctx: &ExecutionContext,
    ) -> Vec<ToolInvocation> {
        let mut invocations = Vec::with_capacity(selections.len());

        for selection in selections {
            let outcome = self.run_one(selection, ctx).await;
            if let ToolOutcome::Failure { kind, message } = &outcome {
                tracing::warn!(
                    "tool {} failed (kind={kind}): {message}",
                    selection.tool_id
                );
            }
            invocations.push(ToolInvocation {
                tool_id: selection.tool_id.clone(),
                parameters: selection.params.clone(),
                outcome,
            });
        }

        invocations
    }

    async fn run_one(&self, selection: &ToolSelection, ctx: &ExecutionContext) -> ToolOutcome {
        let Some(tool) = self.registry.get(&selection.tool_id) else {
            return ToolOutcome::Failure {
                kind: "unknown_tool".into(),
                message: format!("tool not found: {}", selection.tool_id),
            };
        };

        match timeout(self.call_timeout, tool.execute(selection.params.clone(), ctx)).await {
            Ok(Ok(payload)) => ToolOutcome::Success { payload },
            Ok(Err(err)) => ToolOutcome::Failure {
                kind: "tool_error".into(),
                message: err.to_string(),
            },
            Err(_) => ToolOutcome::Failure {
                kind: "timeout".into(),
                message: format!(
                    "tool {} timed out after {}s",
                    selection.tool_id,
                    self.call_timeout.as_secs()
                ),
            },
        }
    }
}
