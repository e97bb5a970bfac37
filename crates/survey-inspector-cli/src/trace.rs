//! Recorded engine snapshots replayed through the change tracker.
//!
//! A trace file is a JSON array of steps, one per committed survey state transition:
//!
//! ```json
//! [
//!   { "label": "start", "values": { "isLoggedIn()": true } },
//!   {
//!     "label": "answered Q1",
//!     "responses": [{ "key": "weekly.Q1", "response": { "key": "rg" } }],
//!     "values": { "isLoggedIn()": true, "responseHasKeysAny(\"weekly.Q1\",\"rg.mcg\",\"1\")": true }
//!   }
//! ]
//! ```
//!
//! `values` maps an expression rendering to what the engine resolved it to at that step.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use survey_inspector::{
    EngineError, Expression, ExpressionEngine, ResolvedValue, SurveyItemResponse,
};

#[derive(Clone, Debug, Deserialize)]
pub struct TraceStep {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub responses: Vec<SurveyItemResponse>,
    #[serde(default)]
    pub values: HashMap<String, JsonValue>,
}

impl TraceStep {
    pub fn engine(&self) -> SnapshotEngine {
        SnapshotEngine::new(self.values.clone())
    }
}

pub fn parse_trace(json: &str) -> Result<Vec<TraceStep>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceStep>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read trace {}", path.display()))?;
    parse_trace(&json).with_context(|| format!("parse trace {}", path.display()))
}

/// Engine that answers from one recorded snapshot; unknown expressions resolve to undefined.
#[derive(Clone, Debug, Default)]
pub struct SnapshotEngine {
    values: HashMap<String, Arc<JsonValue>>,
}

impl SnapshotEngine {
    pub fn new(values: HashMap<String, JsonValue>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(rendering, value)| (rendering, Arc::new(value)))
                .collect(),
        }
    }
}

impl ExpressionEngine for SnapshotEngine {
    fn resolve_expression(&self, expression: &Expression) -> Result<ResolvedValue, EngineError> {
        Ok(self
            .values
            .get(&expression.to_string())
            .map(|value| ResolvedValue::shared(Arc::clone(value)))
            .unwrap_or_default())
    }
}
