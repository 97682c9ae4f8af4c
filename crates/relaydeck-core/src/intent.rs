//! Keyword-driven intent classification.
//!
//! Decides which tools, if any, a user message should trigger before the
//! model answers. The rules are a plain data table so they can be unit
//! tested and swapped out without touching control flow. Overlapping
//! keywords across tools are a documented ambiguity: multiple tools may
//! fire on one message.

use serde_json::json;

use crate::tool::ToolRegistry;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolSelection {
    pub tool_id: String,
    pub params: serde_json::Value,
}

/// One row of the classification table.
///
/// `keywords` detect the intent (any substring match fires the tool);
/// `strip_phrases` are the command fragments removed from the message when
/// extracting the primary parameter.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub tool_id: String,
    pub keywords: Vec<&'static str>,
    pub strip_phrases: Vec<&'static str>,
    pub param_name: &'static str,
}

pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl IntentClassifier {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    /// Select tools for a message. Only tools that are both enabled for the
    /// agent and present in the registry can fire. Selections come back in
    /// registry-declaration order, not detection order.
    pub fn classify(
        &self,
        message: &str,
        enabled_tool_ids: &[String],
        registry: &ToolRegistry,
    ) -> Vec<ToolSelection> {
        let lower = message.to_lowercase();
        let mut fired: Vec<&IntentRule> = Vec::new();

        for rule in &self.rules {
            if !enabled_tool_ids.iter().any(|id| id == &rule.tool_id) {
                continue;
            }
            if !registry.contains(&rule.tool_id) {
                continue;
            }
            if rule.keywords.iter().any(|kw| lower.contains(kw)) {
                fired.push(rule);
            }
        }

        fired.sort_by_key(|rule| registry.position(&rule.tool_id).unwrap_or(usize::MAX));

        fired
            .into_iter()
            .map(|rule| {
                let extracted = extract_param(message, &rule.strip_phrases);
                tracing::debug!(
                    "intent matched tool={} param={}=\"{}\"",
                    rule.tool_id,
                    rule.param_name,
                    extracted
                );
                ToolSelection {
                    tool_id: rule.tool_id.clone(),
                    params: json!({ rule.param_name: extracted }),
                }
            })
            .collect()
    }
}

/// Crude text-stripping parameter extraction: drop the command phrases,
/// drop leading filler, use the remainder.
fn extract_param(message: &str, strip_phrases: &[&str]) -> String {
    let mut text = message.trim().to_string();

    // ascii lowering keeps byte offsets aligned with the original
    for phrase in strip_phrases {
        if let Some(pos) = text.to_ascii_lowercase().find(phrase) {
            text.replace_range(pos..pos + phrase.len(), "");
        }
    }

    let mut rest = text.trim();
    loop {
        let lowered = rest.to_ascii_lowercase();
        let word = lowered.split_whitespace().next().unwrap_or("");
        if matches!(word, "for" | "about" | "me" | "of" | "please") {
            rest = rest[word.len()..].trim_start();
        } else {
            break;
        }
    }

    let cleaned = rest.trim_matches(|c: char| c.is_whitespace() || c == ':' || c == ',');
    if cleaned.is_empty() {
        message.trim().to_string()
    } else {
        cleaned.to_string()
    }
}

/// Default rule table for the builtin tools.
pub fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule {
            tool_id: "web_search".into(),
            keywords: vec!["search", "look up", "latest", "current", "news", "today"],
            strip_phrases: vec!["search the web", "search", "look up", "find out"],
            param_name: "query",
        },
        IntentRule {
            tool_id: "generate_image".into(),
            keywords: vec!["image", "draw", "picture", "illustration", "sketch"],
            strip_phrases: vec![
                "generate an image of",
                "generate an image",
                "create an image of",
                "create an image",
                "make a picture of",
                "draw me",
                "draw",
                "picture of",
                "image of",
            ],
            param_name: "prompt",
        },
        IntentRule {
            tool_id: "send_email".into(),
            keywords: vec!["email", "e-mail", "send a mail"],
            strip_phrases: vec!["send an email", "send email", "email"],
            param_name: "body",
        },
        IntentRule {
            tool_id: "run_code".into(),
            keywords: vec!["run code", "execute", "run this"],
            strip_phrases: vec!["run code", "run this code", "run this", "execute"],
            param_name: "code",
        },
        IntentRule {
            tool_id: "analyze_data".into(),
            keywords: vec!["analyze", "analyse", "average", "statistics", "stats"],
            strip_phrases: vec!["analyze", "analyse"],
            param_name: "data",
        },
    ]
}
