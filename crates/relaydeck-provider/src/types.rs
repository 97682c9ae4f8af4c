use serde::{Deserialize, Serialize};

/// A single message as sent upstream. Role strings are the lowercase
/// `system` / `user` / `assistant` convention shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Provider-agnostic chat request. Adapters are responsible for translating
/// this into each vendor's wire format (e.g. hoisting system-role messages
/// where the API takes them out-of-band).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn simple(model: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![WireMessage::user(user_text)],
            max_tokens: 1024,
            temperature: None,
        }
    }

    /// System-role content joined for APIs with an out-of-band system slot.
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Messages with system-role entries removed, for the same APIs.
    pub fn non_system_messages(&self) -> Vec<&WireMessage> {
        self.messages.iter().filter(|m| m.role != "system").collect()
    }
}

/// Token accounting as reported by the upstream, normalized to "units"
/// so per-call billed media providers fit the same shape.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_units: u64,
    pub completion_units: u64,
    pub total_units: u64,
}

impl TokenUsage {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt_units: prompt,
            completion_units: completion,
            total_units: prompt + completion,
        }
    }

    pub fn total(&self) -> u64 {
        if self.total_units > 0 {
            self.total_units
        } else {
            self.prompt_units + self.completion_units
        }
    }
}

/// Successful provider call result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: TokenUsage,
    /// Model id as echoed by the upstream; may differ from the requested id
    /// (aliases, dated snapshots).
    pub model_echo: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_request_has_one_user_message() {
        let req = ChatRequest::simple("claude-3-5-sonnet", "hi");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
        assert!(req.system_text().is_none());
    }

    #[test]
    fn system_text_joins_system_messages() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![
                WireMessage::system("You are helpful."),
                WireMessage::user("hi"),
                WireMessage::system("Be brief."),
            ],
            max_tokens: 100,
            temperature: None,
        };
        assert_eq!(
            req.system_text().as_deref(),
            Some("You are helpful.\n\nBe brief.")
        );
        assert_eq!(req.non_system_messages().len(), 1);
    }

    #[test]
    fn usage_total_falls_back_to_sum() {
        let explicit = TokenUsage {
            prompt_units: 10,
            completion_units: 5,
            total_units: 15,
        };
        assert_eq!(explicit.total(), 15);

        let implicit = TokenUsage {
            prompt_units: 10,
            completion_units: 5,
            total_units: 0,
        };
        assert_eq!(implicit.total(), 15);
    }
}
