//! Top-level entry point sequencing one user turn.
//!
//! classify intents -> dispatch tools -> assemble messages -> resolve the
//! primary model -> walk the fallback chain -> account usage -> return an
//! `AgentResponse`. Tool failures and provider failures are independent
//! domains; neither triggers the other's fallback, and neither escapes:
//! the orchestrator never returns an error to its caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use relaydeck_provider::{ProviderError, ProviderRegistry};
use relaydeck_schema::{
    AgentResponse, ExecutionContext, ResponseMetadata, ToolInvocation, UsageRecord,
};

use crate::assemble::assemble;
use crate::dispatch::ToolDispatcher;
use crate::executor::{diagnostic_message, FallbackExecutor, ProviderOutcome, RunOptions};
use crate::intent::IntentClassifier;
use crate::router::{ModelRouter, RouteTarget};
use crate::tool::ToolRegistry;
use crate::usage::UsageAccountant;
use crate::AgentConfig;

const CONFIDENCE_CLEAN: f32 = 0.9;
const CONFIDENCE_DEGRADED_TOOLS: f32 = 0.75;
const CONFIDENCE_DIAGNOSTIC: f32 = 0.3;

pub struct Orchestrator {
    tools: Arc<ToolRegistry>,
    router: ModelRouter,
    classifier: IntentClassifier,
    dispatcher: ToolDispatcher,
    executor: FallbackExecutor,
    agents: HashMap<String, AgentConfig>,
    options: RunOptions,
}

impl Orchestrator {
    /// Registries and the agent roster are injected; there is no global
    /// state, so tests construct isolated instances freely.
    pub fn new(
        providers: Arc<ProviderRegistry>,
        tools: Arc<ToolRegistry>,
        agents: Vec<AgentConfig>,
    ) -> Self {
        let agents = agents
            .into_iter()
            .map(|a| (a.agent_id.clone(), a))
            .collect();
        Self {
            router: ModelRouter::new(providers.clone()),
            classifier: IntentClassifier::default(),
            dispatcher: ToolDispatcher::new(tools.clone()),
            executor: FallbackExecutor::new(providers),
            tools,
            agents,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_executor(mut self, executor: FallbackExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Run one user turn. Always returns a response; every failure path
    /// degrades to a low-confidence diagnostic answer.
    pub async fn handle_message(
        &self,
        agent_id: &str,
        ctx: &mut ExecutionContext,
        text: &str,
    ) -> AgentResponse {
        let started = Instant::now();

        let Some(agent) = self.agents.get(agent_id).filter(|a| a.enabled) else {
            tracing::warn!("unknown or disabled agent: {agent_id}");
            return degraded_response(
                format!(
                    "I'm experiencing difficulties: agent \"{agent_id}\" is not configured. \
                     You can verify service status at /api/health."
                ),
                vec![],
                UsageRecord::default(),
                started,
            );
        };

        match self.run_turn(agent, ctx, text, started).await {
            Ok(response) => response,
            Err(TurnFailure {
                error,
                invocations,
                usage,
            }) => {
                tracing::warn!("turn degraded for agent {agent_id} (kind={})", error.kind());
                let content = format!(
                    "I'm experiencing difficulties completing that request ({error}). \
                     You can verify provider status at /api/health. \
                     Ask again and I'll answer from built-in knowledge if the issue persists."
                );
                ctx.push_assistant(&content);
                degraded_response(content, tool_ids(&invocations), usage, started)
            }
        }
    }

    async fn run_turn(
        &self,
        agent: &AgentConfig,
        ctx: &mut ExecutionContext,
        text: &str,
        started: Instant,
    ) -> Result<AgentResponse, TurnFailure> {
        // history as it stood before this turn; the new user message is
        // threaded separately so the assembler controls its position
        let prior_history = ctx.history.clone();
        ctx.push_user(text);

        let selections = self
            .classifier
            .classify(text, &agent.enabled_tools, &self.tools);
        let invocations = self.dispatcher.execute(&selections, ctx).await;

        let mut accountant = UsageAccountant::new();
        for inv in &invocations {
            if inv.succeeded() {
                accountant.account_tool(&inv.tool_id);
            }
        }

        let messages = assemble(agent, &self.tools, &prior_history, &invocations, text);

        let primary = match self.router.resolve(&agent.model_policy.primary) {
            Ok(target) => target,
            Err(error) => {
                return Err(TurnFailure {
                    error,
                    invocations,
                    usage: accountant.record(),
                })
            }
        };

        let extra: Vec<RouteTarget> = agent
            .model_policy
            .fallbacks
            .iter()
            .filter_map(|model| self.router.resolve(model).ok())
            .collect();

        let outcome = self
            .executor
            .run(messages, primary, &extra, &self.options)
            .await;

        let response = match outcome {
            ProviderOutcome::Answered {
                completion,
                provider_id,
                model,
                attempts,
            } => {
                accountant.account(completion.usage.total(), &provider_id, &model);
                ctx.push_assistant(&completion.content);

                let confidence = if invocations.iter().all(ToolInvocation::succeeded) {
                    CONFIDENCE_CLEAN
                } else {
                    CONFIDENCE_DEGRADED_TOOLS
                };
                tracing::info!(
                    "turn answered by {provider_id}/{model} after {} attempt(s)",
                    attempts.len()
                );

                AgentResponse {
                    content: completion.content,
                    tools_used: tool_ids(&invocations),
                    usage: accountant.record(),
                    metadata: ResponseMetadata {
                        model_used: model,
                        response_time_ms: elapsed_ms(started),
                        confidence,
                    },
                }
            }
            ProviderOutcome::Exhausted { attempts, detail } => {
                let content = diagnostic_message(&attempts, &detail);
                ctx.push_assistant(&content);
                degraded_response(content, tool_ids(&invocations), accountant.record(), started)
            }
        };

        Ok(response)
    }
}

struct TurnFailure {
    error: ProviderError,
    invocations: Vec<ToolInvocation>,
    usage: UsageRecord,
}

fn tool_ids(invocations: &[ToolInvocation]) -> Vec<String> {
    invocations.iter().map(|i| i.tool_id.clone()).collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn degraded_response(
    content: String,
    tools_used: Vec<String>,
    usage: UsageRecord,
    started: Instant,
) -> AgentResponse {
    AgentResponse {
        content,
        tools_used,
        usage,
        metadata: ResponseMetadata {
            model_used: "none".into(),
            response_time_ms: elapsed_ms(started),
            confidence: CONFIDENCE_DIAGNOSTIC,
        },
    }
}
