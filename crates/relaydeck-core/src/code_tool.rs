//! Short-snippet code execution through a subprocess with a hard timeout.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use relaydeck_schema::ExecutionContext;
use serde_json::json;
use tokio::process::Command;
use tokio::time::timeout;

use crate::tool::{ParamSpec, ToolDef, ToolExecutor};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_OUTPUT_BYTES: usize = 8 * 1024;

pub struct CodeRunTool {
    timeout_secs: u64,
}

impl Default for CodeRunTool {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

impl CodeRunTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl ToolExecutor for CodeRunTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            id: "run_code".into(),
            name: "Code Execution".into(),
            description: "Run a short code snippet and return its output".into(),
            parameters: vec![
                ParamSpec::string("language", false, "Snippet language")
                    .with_enum(&["python", "sh"]),
                ParamSpec::string("code", true, "The code to run"),
            ],
        }
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ExecutionContext,
    ) -> Result<serde_json::Value> {
        let code = params["code"]
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("missing required parameter: code"))?;
        let language = params["language"].as_str().unwrap_or("python");

        let (program, flag) = match language {
            "python" => ("python3", "-c"),
            "sh" => ("sh", "-c"),
            other => return Err(anyhow!("unsupported language: {other}")),
        };

        let run = Command::new(program).arg(flag).arg(code).output();
        let output = timeout(std::time::Duration::from_secs(self.timeout_secs), run)
            .await
            .map_err(|_| anyhow!("code execution timed out after {}s", self.timeout_secs))?
            .with_context(|| format!("failed to launch {program}"))?;

        Ok(json!({
            "language": language,
            "exit_code": output.status.code(),
            "stdout": clip(&String::from_utf8_lossy(&output.stdout)),
            "stderr": clip(&String::from_utf8_lossy(&output.stderr)),
        }))
    }
}

fn clip(s: &str) -> String {
    if s.len() <= MAX_OUTPUT_BYTES {
        return s.to_string();
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... (truncated)", &s[..end])
}
