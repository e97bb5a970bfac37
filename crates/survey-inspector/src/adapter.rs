//! Seam between the inspector and the external, opaque expression engine.

use crate::expression::Expression;
use crate::survey::SurveyItemResponse;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("engine failed to resolve {expression}: {message}")]
pub struct EngineError {
    pub expression: String,
    pub message: String,
}

impl EngineError {
    pub fn new(expression: &Expression, message: impl Into<String>) -> Self {
        Self {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}

/// Result of resolving an expression.
///
/// `Undefined` is what an unbound adapter (or an engine with no answer) yields. Values are held
/// behind an [`Arc`] so that an engine handing back the same allocation twice can be told apart
/// from one that builds a fresh composite on every call.
#[derive(Clone, Debug, Default)]
pub enum ResolvedValue {
    #[default]
    Undefined,
    Value(Arc<JsonValue>),
}

impl ResolvedValue {
    pub fn shared(value: Arc<JsonValue>) -> Self {
        ResolvedValue::Value(value)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ResolvedValue::Undefined)
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            ResolvedValue::Undefined => None,
            ResolvedValue::Value(value) => Some(value),
        }
    }

    /// Strict equality: scalars by value (numbers numerically), arrays and objects by identity.
    pub fn identical(&self, other: &ResolvedValue) -> bool {
        match (self, other) {
            (ResolvedValue::Undefined, ResolvedValue::Undefined) => true,
            (ResolvedValue::Value(a), ResolvedValue::Value(b)) => match (a.as_ref(), b.as_ref()) {
                (JsonValue::Null, JsonValue::Null) => true,
                (JsonValue::Bool(x), JsonValue::Bool(y)) => x == y,
                (JsonValue::String(x), JsonValue::String(y)) => x == y,
                (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
                (JsonValue::Array(_), JsonValue::Array(_))
                | (JsonValue::Object(_), JsonValue::Object(_)) => Arc::ptr_eq(a, b),
                _ => false,
            },
            _ => false,
        }
    }

    /// Deep equality of the resolved JSON (numbers compared numerically).
    pub fn structurally_equal(&self, other: &ResolvedValue) -> bool {
        match (self, other) {
            (ResolvedValue::Undefined, ResolvedValue::Undefined) => true,
            (ResolvedValue::Value(a), ResolvedValue::Value(b)) => json_eq(a, b),
            _ => false,
        }
    }
}

fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_eq(l, r))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| json_eq(l, r)))
        }
        _ => a == b,
    }
}

impl From<JsonValue> for ResolvedValue {
    fn from(value: JsonValue) -> Self {
        ResolvedValue::Value(Arc::new(value))
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Undefined => f.write_str("undefined"),
            ResolvedValue::Value(value) => write!(f, "{value}"),
        }
    }
}

/// The external evaluation engine: resolves an expression against its hidden state.
pub trait ExpressionEngine {
    fn resolve_expression(&self, expression: &Expression) -> Result<ResolvedValue, EngineError>;
}

/// Engine backed by a closure; see [`engine_fn`].
pub struct FnEngine<F>(F);

/// Wraps a closure as an [`ExpressionEngine`].
pub fn engine_fn<F>(resolve: F) -> FnEngine<F>
where
    F: Fn(&Expression) -> Result<ResolvedValue, EngineError>,
{
    FnEngine(resolve)
}

impl<F> ExpressionEngine for FnEngine<F>
where
    F: Fn(&Expression) -> Result<ResolvedValue, EngineError>,
{
    fn resolve_expression(&self, expression: &Expression) -> Result<ResolvedValue, EngineError> {
        (self.0)(expression)
    }
}

/// Holds the currently bound engine and the most recent response set.
#[derive(Default)]
pub struct EvaluationAdapter {
    engine: Option<Box<dyn ExpressionEngine>>,
    responses: Option<Vec<SurveyItemResponse>>,
}

impl fmt::Debug for EvaluationAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationAdapter")
            .field("engine", &self.engine.as_ref().map(|_| "<engine>"))
            .field("responses", &self.responses)
            .finish()
    }
}

impl EvaluationAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the bound engine; the last bind wins.
    pub fn bind<E: ExpressionEngine + 'static>(&mut self, engine: E) {
        self.engine = Some(Box::new(engine));
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn set_responses(&mut self, responses: Vec<SurveyItemResponse>) {
        self.responses = Some(responses);
    }

    pub fn responses(&self) -> Option<&[SurveyItemResponse]> {
        self.responses.as_deref()
    }

    /// Resolves `expression` with the bound engine, or `Undefined` when none is bound.
    pub fn resolve(&self, expression: &Expression) -> Result<ResolvedValue, EngineError> {
        match &self.engine {
            Some(engine) => engine.resolve_expression(expression),
            None => Ok(ResolvedValue::Undefined),
        }
    }

    /// Evaluates an ad-hoc expression outside the registry. `None` when no engine is bound.
    pub fn evaluate_custom(
        &self,
        expression: &Expression,
    ) -> Option<Result<ResolvedValue, EngineError>> {
        self.engine
            .as_ref()
            .map(|engine| engine.resolve_expression(expression))
    }
}
