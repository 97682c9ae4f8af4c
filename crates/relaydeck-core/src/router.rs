//! Maps a requested model identifier to a provider.
//!
//! Matching is rule-based: the lowercased model id is tested against a
//! fixed, ordered table of family fragments; the first hit names the
//! candidate provider. A candidate without its credential does not fail
//! the resolution; a substitute is picked from the rule's preference
//! list, then the global order. The system optimizes for "answer
//! something" over "fail fast"; only a fully credential-less deployment
//! raises `Configuration`.

use std::sync::Arc;

use relaydeck_provider::{ProviderError, ProviderRegistry};

/// A resolved (provider, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteTarget {
    pub provider_id: String,
    pub model: String,
}

impl RouteTarget {
    pub fn new(provider_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model: model.into(),
        }
    }
}

struct ModelRoute {
    fragment: &'static str,
    provider_id: &'static str,
    substitutes: &'static [&'static str],
}

// First matching fragment wins, top to bottom. Open-weight families prefer
// the cheap/fast backends as substitutes; premium families prefer the
// aggregator.
const ROUTE_TABLE: &[ModelRoute] = &[
    ModelRoute {
        fragment: "claude",
        provider_id: "anthropic",
        substitutes: &["openrouter"],
    },
    ModelRoute {
        fragment: "gemini",
        provider_id: "google",
        substitutes: &["openrouter"],
    },
    ModelRoute {
        fragment: "gpt",
        provider_id: "openai",
        substitutes: &["openrouter"],
    },
    ModelRoute {
        fragment: "mixtral",
        provider_id: "groq",
        substitutes: &["together", "openrouter"],
    },
    ModelRoute {
        fragment: "llama",
        provider_id: "groq",
        substitutes: &["together", "openrouter"],
    },
    ModelRoute {
        fragment: "mistral",
        provider_id: "together",
        substitutes: &["groq", "openrouter"],
    },
    ModelRoute {
        fragment: "qwen",
        provider_id: "together",
        substitutes: &["groq", "openrouter"],
    },
    ModelRoute {
        fragment: "deepseek",
        provider_id: "openrouter",
        substitutes: &["together"],
    },
];

// Anything still unresolved lands on the aggregator.
const DEFAULT_PROVIDER: &str = "openrouter";

// Last-resort order when neither the rule provider nor its substitutes are
// credentialed.
const GLOBAL_PREFERENCE: &[&str] = &[
    "anthropic",
    "openai",
    "openrouter",
    "google",
    "groq",
    "together",
];

pub struct ModelRouter {
    registry: Arc<ProviderRegistry>,
}

impl ModelRouter {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve a model id to a credentialed provider. Deterministic and
    /// idempotent for a fixed environment.
    pub fn resolve(&self, model_id: &str) -> Result<RouteTarget, ProviderError> {
        let lower = model_id.to_lowercase();
        let (candidate, substitutes) = ROUTE_TABLE
            .iter()
            .find(|route| lower.contains(route.fragment))
            .map(|route| (route.provider_id, route.substitutes))
            .unwrap_or((DEFAULT_PROVIDER, &[] as &[&str]));

        if self.registry.has_credential(candidate) {
            return Ok(RouteTarget::new(candidate, model_id));
        }

        for sub in substitutes.iter().chain(GLOBAL_PREFERENCE) {
            if *sub != candidate && self.registry.has_credential(sub) {
                tracing::info!(
                    "provider {candidate} has no credential, substituting {sub} for model {model_id}"
                );
                return Ok(RouteTarget::new(*sub, model_id));
            }
        }

        Err(ProviderError::Configuration(format!(
            "no credentialed provider available for model {model_id}"
        )))
    }
}
