pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai_compat;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use openai_compat::{custom, groq, openai, openrouter, together, OpenAiCompatProvider};
pub use types::{ChatCompletion, ChatRequest, TokenUsage, WireMessage};

/// An upstream service that answers chat/completion requests for one or
/// more model families.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError>;

    async fn health(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

// ============================================================
// Provider descriptors
// ============================================================

/// What a provider can do, as declared in the static table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Chat,
    Vision,
    ImageGen,
}

/// Static description of a known provider: its id, the credential variable
/// that gates it, and the capabilities it supports.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    pub id: &'static str,
    pub credential_var: &'static str,
    pub capabilities: &'static [Capability],
}

impl ProviderDescriptor {
    /// Re-checks the environment on every call. Within one run the answer
    /// is stable; across deployments it can change.
    pub fn credential_present(&self) -> bool {
        std::env::var(self.credential_var)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn supports(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

pub const KNOWN_PROVIDERS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        id: "anthropic",
        credential_var: "ANTHROPIC_API_KEY",
        capabilities: &[Capability::Chat, Capability::Vision],
    },
    ProviderDescriptor {
        id: "openai",
        credential_var: "OPENAI_API_KEY",
        capabilities: &[Capability::Chat, Capability::Vision, Capability::ImageGen],
    },
    ProviderDescriptor {
        id: "openrouter",
        credential_var: "OPENROUTER_API_KEY",
        capabilities: &[Capability::Chat, Capability::Vision],
    },
    ProviderDescriptor {
        id: "google",
        credential_var: "GEMINI_API_KEY",
        capabilities: &[Capability::Chat, Capability::Vision],
    },
    ProviderDescriptor {
        id: "groq",
        credential_var: "GROQ_API_KEY",
        capabilities: &[Capability::Chat],
    },
    ProviderDescriptor {
        id: "together",
        credential_var: "TOGETHER_API_KEY",
        capabilities: &[Capability::Chat, Capability::ImageGen],
    },
];

pub fn descriptor(id: &str) -> Option<&'static ProviderDescriptor> {
    KNOWN_PROVIDERS.iter().find(|d| d.id == id)
}

// ============================================================
// Provider Registry
// ============================================================

enum CredentialSource {
    /// Re-check an environment variable on every lookup.
    Env(&'static str),
    /// Fixed answer, used by tests and custom registrations.
    Fixed(bool),
}

/// Registry of live provider clients, keyed by provider id.
///
/// Built once at startup and read-only afterwards; safe to share across
/// concurrent turns.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
    credentials: HashMap<String, CredentialSource>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Credential presence follows the known-provider
    /// table when the id is known, and defaults to present otherwise.
    pub fn register(&mut self, id: impl Into<String>, provider: Arc<dyn ChatProvider>) {
        let id = id.into();
        let source = match descriptor(&id) {
            Some(desc) => CredentialSource::Env(desc.credential_var),
            None => CredentialSource::Fixed(true),
        };
        self.credentials.insert(id.clone(), source);
        self.providers.insert(id, provider);
    }

    /// Register with an explicit credential answer, bypassing the
    /// environment. Test seam and escape hatch for custom backends.
    pub fn register_with_credential(
        &mut self,
        id: impl Into<String>,
        provider: Arc<dyn ChatProvider>,
        present: bool,
    ) {
        let id = id.into();
        self.credentials.insert(id.clone(), CredentialSource::Fixed(present));
        self.providers.insert(id, provider);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::Configuration(format!("provider not found: {id}")))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Whether the provider is registered and its credential is present.
    pub fn has_credential(&self, id: &str) -> bool {
        match self.credentials.get(id) {
            Some(CredentialSource::Env(var)) => std::env::var(var)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false),
            Some(CredentialSource::Fixed(present)) => *present,
            None => false,
        }
    }
}

/// Build live clients for every known provider whose credential variable is
/// set. Absence of a credential removes the provider from routing
/// candidates; it is never a startup error.
pub fn register_from_env(registry: &mut ProviderRegistry) {
    for desc in KNOWN_PROVIDERS {
        let Ok(key) = std::env::var(desc.credential_var) else {
            tracing::debug!("provider {} skipped, {} not set", desc.id, desc.credential_var);
            continue;
        };
        if key.trim().is_empty() {
            continue;
        }
        let provider: Arc<dyn ChatProvider> = match desc.id {
            "anthropic" => Arc::new(AnthropicProvider::new(key, "https://api.anthropic.com")),
            "openai" => Arc::new(openai(key)),
            "openrouter" => Arc::new(openrouter(key)),
            "google" => Arc::new(GeminiProvider::new(key)),
            "groq" => Arc::new(groq(key)),
            "together" => Arc::new(together(key)),
            other => {
                tracing::warn!("no client builder for provider {other}");
                continue;
            }
        };
        registry.register(desc.id, provider);
        tracing::info!("registered provider: {}", desc.id);
    }
}

/// Deterministic echo provider used by tests.
pub struct StubProvider;

#[async_trait]
impl ChatProvider for StubProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let user_text = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatCompletion {
            content: format!("[stub:{}] {user_text}", request.model),
            usage: TokenUsage::new(10, 20),
            model_echo: request.model,
        })
    }
}
