//! Local summary statistics over an inline numeric series. No network,
//! no billing.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use relaydeck_schema::ExecutionContext;
use serde_json::json;

use crate::tool::{ParamSpec, ToolDef, ToolExecutor};

pub struct DataAnalysisTool;

impl Default for DataAnalysisTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DataAnalysisTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolExecutor for DataAnalysisTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            id: "analyze_data".into(),
            name: "Data Analysis".into(),
            description: "Compute summary statistics over a series of numbers".into(),
            parameters: vec![
                ParamSpec::string(
                    "data",
                    true,
                    "Numbers separated by commas, whitespace, or newlines",
                ),
                ParamSpec::string("operation", false, "Which statistic to compute")
                    .with_enum(&["summary", "mean", "sum", "min", "max", "count"]),
            ],
        }
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ExecutionContext,
    ) -> Result<serde_json::Value> {
        let raw = params["data"]
            .as_str()
            .ok_or_else(|| anyhow!("missing required parameter: data"))?;
        let operation = params["operation"].as_str().unwrap_or("summary");

        let values: Vec<f64> = raw
            .split(|c: char| c == ',' || c.is_whitespace() || c == ';')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();

        if values.is_empty() {
            return Err(anyhow!("no numeric values found in data"));
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let result = match operation {
            "mean" => json!({ "operation": "mean", "value": mean }),
            "sum" => json!({ "operation": "sum", "value": sum }),
            "min" => json!({ "operation": "min", "value": min }),
            "max" => json!({ "operation": "max", "value": max }),
            "count" => json!({ "operation": "count", "value": count }),
            _ => {
                let variance =
                    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
                json!({
                    "operation": "summary",
                    "count": count,
                    "sum": sum,
                    "mean": mean,
                    "min": min,
                    "max": max,
                    "stddev": variance.sqrt(),
                })
            }
        };

        Ok(result)
    }
}
