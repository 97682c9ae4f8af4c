//! Walks the fallback chain until a provider answers.
//!
//! Candidates are tried strictly sequentially. A candidate is skipped when
//! its provider credential is absent or the (provider, model) pair was
//! already attempted this run. Exhaustion does not propagate an error:
//! the caller receives `ProviderOutcome::Exhausted` and degrades to a
//! diagnostic answer.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use relaydeck_provider::{ChatCompletion, ChatRequest, ProviderError, ProviderRegistry, WireMessage};
use tokio::time::timeout;

use crate::router::RouteTarget;

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

// Statically ordered chain tried after the primary and the agent's own
// fallbacks. Uncredentialed entries are skipped at run time.
const DEFAULT_CHAIN: &[(&str, &str)] = &[
    ("anthropic", "claude-3-5-sonnet-20241022"),
    ("openai", "gpt-4o-mini"),
    ("openrouter", "meta-llama/llama-3.1-70b-instruct"),
    ("google", "gemini-1.5-flash"),
    ("groq", "llama-3.1-70b-versatile"),
    ("together", "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo"),
];

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub call_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Result of one fallback run. Never an `Err`: provider failures are data.
#[derive(Debug)]
pub enum ProviderOutcome {
    Answered {
        completion: ChatCompletion,
        provider_id: String,
        model: String,
        /// Every (provider/model) pair actually called, in order.
        attempts: Vec<String>,
    },
    Exhausted {
        attempts: Vec<String>,
        detail: String,
    },
}

pub struct FallbackExecutor {
    registry: Arc<ProviderRegistry>,
    chain: Vec<RouteTarget>,
}

impl FallbackExecutor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let chain = DEFAULT_CHAIN
            .iter()
            .map(|(provider, model)| RouteTarget::new(*provider, *model))
            .collect();
        Self { registry, chain }
    }

    /// Replace the static chain, e.g. for tests or a cheaper deployment.
    pub fn with_chain(mut self, chain: Vec<RouteTarget>) -> Self {
        self.chain = chain;
        self
    }

    pub async fn run(
        &self,
        messages: Vec<WireMessage>,
        primary: RouteTarget,
        extra_fallbacks: &[RouteTarget],
        opts: &RunOptions,
    ) -> ProviderOutcome {
        let mut candidates = Vec::with_capacity(1 + extra_fallbacks.len() + self.chain.len());
        candidates.push(primary.clone());
        candidates.extend(extra_fallbacks.iter().cloned());
        candidates.extend(self.chain.iter().cloned());

        // never revisit a (provider, model) pair within one run
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));

        let mut attempts: Vec<String> = Vec::new();
        let mut last_detail = String::from("no candidate was callable");

        for (idx, candidate) in candidates.iter().enumerate() {
            if !self.registry.has_credential(&candidate.provider_id) {
                tracing::info!(
                    "skipping {}/{} (credential absent)",
                    candidate.provider_id,
                    candidate.model
                );
                continue;
            }

            let provider = match self.registry.get(&candidate.provider_id) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("provider {} not available: {e}", candidate.provider_id);
                    continue;
                }
            };

            attempts.push(format!("{}/{}", candidate.provider_id, candidate.model));

            let request = ChatRequest {
                model: candidate.model.clone(),
                messages: messages.clone(),
                max_tokens: opts.max_tokens,
                temperature: opts.temperature,
            };

            let result = match timeout(opts.call_timeout, provider.chat(request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Network(format!(
                    "{} call timed out after {}s",
                    candidate.provider_id,
                    opts.call_timeout.as_secs()
                ))),
            };

            match result {
                Ok(completion) => {
                    if idx > 0 {
                        tracing::info!(
                            "fallback_triggered=true, from={}/{}, to={}/{}, attempt={}",
                            primary.provider_id,
                            primary.model,
                            candidate.provider_id,
                            candidate.model,
                            attempts.len()
                        );
                    }
                    return ProviderOutcome::Answered {
                        completion,
                        provider_id: candidate.provider_id.clone(),
                        model: candidate.model.clone(),
                        attempts,
                    };
                }
                Err(err) => {
                    tracing::warn!(
                        "provider {}/{} failed (kind={}): {err}",
                        candidate.provider_id,
                        candidate.model,
                        err.kind()
                    );
                    last_detail = err.to_string();
                }
            }
        }

        ProviderOutcome::Exhausted {
            attempts,
            detail: last_detail,
        }
    }
}

/// User-facing explanation for the exhausted path. Names what was tried,
/// points at the health endpoint, and offers a built-in-knowledge answer.
pub fn diagnostic_message(attempts: &[String], detail: &str) -> String {
    let tried = if attempts.is_empty() {
        "no provider could be called (check credential configuration)".to_string()
    } else {
        format!("attempted: {}", attempts.join(" -> "))
    };
    format!(
        "I'm experiencing difficulties reaching the AI providers right now ({tried}; last error: {detail}). \
         You can verify provider status at /api/health. \
         If you'd like, ask me again and I'll answer from built-in knowledge without live tools."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaydeck_provider::{ChatProvider, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FailProvider;
    struct SuccessProvider;

    struct RecordingProvider {
        log: Arc<Mutex<Vec<String>>>,
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl ChatProvider for FailProvider {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
    }

    #[async_trait]
    impl ChatProvider for SuccessProvider {
        async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
            Ok(ChatCompletion {
                content: "success from fallback".into(),
                usage: TokenUsage::new(5, 7),
                model_echo: request.model,
            })
        }
    }

    #[async_trait]
    impl ChatProvider for RecordingProvider {
        async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}/{}", self.name, request.model));
            if self.fail {
                Err(ProviderError::RateLimit("429".into()))
            } else {
                Ok(ChatCompletion {
                    content: "ok".into(),
                    usage: TokenUsage::default(),
                    model_echo: request.model,
                })
            }
        }
    }

    fn messages() -> Vec<WireMessage> {
        vec![WireMessage::user("hi")]
    }

    #[tokio::test]
    async fn primary_success_short_circuits() {
        let mut registry = ProviderRegistry::new();
        registry.register_with_credential("good", Arc::new(SuccessProvider), true);
        let executor = FallbackExecutor::new(Arc::new(registry)).with_chain(vec![]);

        let outcome = executor
            .run(
                messages(),
                RouteTarget::new("good", "model-a"),
                &[],
                &RunOptions::default(),
            )
            .await;

        match outcome {
            ProviderOutcome::Answered {
                provider_id,
                attempts,
                ..
            } => {
                assert_eq!(provider_id, "good");
                assert_eq!(attempts, vec!["good/model-a"]);
            }
            ProviderOutcome::Exhausted { .. } => unreachable!(),
        }
    }

    #[tokio::test]
    async fn failure_falls_through_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProviderRegistry::new();
        registry.register_with_credential(
            "first",
            Arc::new(RecordingProvider {
                log: log.clone(),
                name: "first",
                fail: true,
            }),
            true,
        );
        registry.register_with_credential(
            "second",
            Arc::new(RecordingProvider {
                log: log.clone(),
                name: "second",
                fail: true,
            }),
            true,
        );
        registry.register_with_credential(
            "third",
            Arc::new(RecordingProvider {
                log: log.clone(),
                name: "third",
                fail: false,
            }),
            true,
        );

        let executor = FallbackExecutor::new(Arc::new(registry)).with_chain(vec![
            RouteTarget::new("second", "m2"),
            RouteTarget::new("third", "m3"),
        ]);

        let outcome = executor
            .run(
                messages(),
                RouteTarget::new("first", "m1"),
                &[],
                &RunOptions::default(),
            )
            .await;

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls, vec!["first/m1", "second/m2", "third/m3"]);
        assert!(matches!(outcome, ProviderOutcome::Answered { provider_id, .. } if provider_id == "third"));
    }

    #[tokio::test]
    async fn already_attempted_pair_is_never_revisited() {
        let count = Arc::new(AtomicUsize::new(0));

        struct CountingFail(Arc<AtomicUsize>);

        #[async_trait]
        impl ChatProvider for CountingFail {
            async fn chat(&self, _request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Network("down".into()))
            }
        }

        let mut registry = ProviderRegistry::new();
        registry.register_with_credential("only", Arc::new(CountingFail(count.clone())), true);

        // primary duplicated in the chain; it must be called exactly once
        let executor = FallbackExecutor::new(Arc::new(registry))
            .with_chain(vec![RouteTarget::new("only", "m")]);

        let outcome = executor
            .run(
                messages(),
                RouteTarget::new("only", "m"),
                &[RouteTarget::new("only", "m")],
                &RunOptions::default(),
            )
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome, ProviderOutcome::Exhausted { .. }));
    }

    #[tokio::test]
    async fn credential_less_candidates_are_skipped() {
        let mut registry = ProviderRegistry::new();
        registry.register_with_credential("nokey", Arc::new(FailProvider), false);
        registry.register_with_credential("good", Arc::new(SuccessProvider), true);

        let executor = FallbackExecutor::new(Arc::new(registry))
            .with_chain(vec![RouteTarget::new("good", "m2")]);

        let outcome = executor
            .run(
                messages(),
                RouteTarget::new("nokey", "m1"),
                &[],
                &RunOptions::default(),
            )
            .await;

        match outcome {
            ProviderOutcome::Answered { attempts, .. } => {
                // the credential-less primary never shows up as an attempt
                assert_eq!(attempts, vec!["good/m2"]);
            }
            ProviderOutcome::Exhausted { .. } => unreachable!(),
        }
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts_not_an_error() {
        let mut registry = ProviderRegistry::new();
        registry.register_with_credential("a", Arc::new(FailProvider), true);
        registry.register_with_credential("b", Arc::new(FailProvider), true);

        let executor = FallbackExecutor::new(Arc::new(registry))
            .with_chain(vec![RouteTarget::new("b", "m2")]);

        let outcome = executor
            .run(
                messages(),
                RouteTarget::new("a", "m1"),
                &[],
                &RunOptions::default(),
            )
            .await;

        match outcome {
            ProviderOutcome::Exhausted { attempts, detail } => {
                assert_eq!(attempts, vec!["a/m1", "b/m2"]);
                assert!(detail.contains("connection refused"));
            }
            ProviderOutcome::Answered { .. } => unreachable!(),
        }
    }

    #[tokio::test]
    async fn hung_provider_times_out_and_falls_back() {
        struct HangingProvider;

        #[async_trait]
        impl ChatProvider for HangingProvider {
            async fn chat(&self, _request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!()
            }
        }

        let mut registry = ProviderRegistry::new();
        registry.register_with_credential("hang", Arc::new(HangingProvider), true);
        registry.register_with_credential("good", Arc::new(SuccessProvider), true);

        let executor = FallbackExecutor::new(Arc::new(registry))
            .with_chain(vec![RouteTarget::new("good", "m2")]);

        let opts = RunOptions {
            call_timeout: Duration::from_millis(50),
            ..RunOptions::default()
        };

        let outcome = executor
            .run(messages(), RouteTarget::new("hang", "m1"), &[], &opts)
            .await;

        assert!(matches!(outcome, ProviderOutcome::Answered { provider_id, .. } if provider_id == "good"));
    }

    #[test]
    fn diagnostic_message_names_attempts() {
        let msg = diagnostic_message(
            &["anthropic/claude-3-5-sonnet".into(), "openai/gpt-4o-mini".into()],
            "network failure: down",
        );
        assert!(msg.contains("difficulties"));
        assert!(msg.contains("anthropic/claude-3-5-sonnet -> openai/gpt-4o-mini"));
        assert!(msg.contains("/api/health"));
    }
}
