//! Re-evaluation of every registered expression after each survey state transition.

use crate::adapter::{EngineError, EvaluationAdapter, ExpressionEngine, ResolvedValue};
use crate::expression::Expression;
use crate::registry::{ExpressionDescriptor, ExpressionField, ExpressionRegistry};
use crate::survey::{SurveyItem, SurveyItemResponse};
use serde::{Deserialize, Serialize};

/// How a re-resolved value is compared with the previous one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDetection {
    /// Strict equality: scalars by value, arrays/objects by allocation. A composite rebuilt on
    /// every resolution is reported as changed on every pass.
    #[default]
    Identity,
    /// Deep equality of the resolved JSON.
    Structural,
}

impl ChangeDetection {
    pub fn has_changed(self, previous: &ResolvedValue, next: &ResolvedValue) -> bool {
        match self {
            ChangeDetection::Identity => !previous.identical(next),
            ChangeDetection::Structural => !previous.structurally_equal(next),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InspectorOptions {
    pub change_detection: ChangeDetection,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub evaluated: usize,
    pub changed: usize,
}

/// Owns the registry of one loaded survey and tracks per-expression changes across passes.
#[derive(Debug)]
pub struct ChangeTracker {
    registry: ExpressionRegistry,
    adapter: EvaluationAdapter,
    options: InspectorOptions,
    passes: u64,
}

impl ChangeTracker {
    pub fn new(registry: ExpressionRegistry, options: InspectorOptions) -> Self {
        Self {
            registry,
            adapter: EvaluationAdapter::new(),
            options,
            passes: 0,
        }
    }

    pub fn from_definition(root: Option<&SurveyItem>, options: InspectorOptions) -> Self {
        Self::new(ExpressionRegistry::build(root), options)
    }

    pub fn registry(&self) -> &ExpressionRegistry {
        &self.registry
    }

    pub fn adapter(&self) -> &EvaluationAdapter {
        &self.adapter
    }

    pub fn options(&self) -> &InspectorOptions {
        &self.options
    }

    /// Number of completed refresh passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// True once an engine has been bound; results before that are all `Undefined`.
    pub fn is_ready(&self) -> bool {
        self.adapter.has_engine()
    }

    pub fn bind_engine<E: ExpressionEngine + 'static>(&mut self, engine: E) {
        self.adapter.bind(engine);
    }

    pub fn set_responses(&mut self, responses: Vec<SurveyItemResponse>) {
        self.adapter.set_responses(responses);
    }

    /// Entry point for the rendering widget: call once per committed state transition.
    pub fn on_state_change<E: ExpressionEngine + 'static>(
        &mut self,
        engine: E,
        responses: Vec<SurveyItemResponse>,
    ) -> Result<RefreshSummary, EngineError> {
        self.adapter.bind(engine);
        self.adapter.set_responses(responses);
        self.refresh()
    }

    /// Re-resolves every descriptor in registry order, updating `last_value` and `changed`.
    ///
    /// An engine error aborts the pass: descriptors before the failing one are updated, the
    /// failing one and everything after it keep their previous state.
    pub fn refresh(&mut self) -> Result<RefreshSummary, EngineError> {
        let Self {
            registry,
            adapter,
            options,
            ..
        } = self;
        let mut summary = RefreshSummary::default();

        for descriptor in registry.descriptors_mut() {
            let next = match adapter.resolve(&descriptor.expression) {
                Ok(value) => value,
                Err(err) => {
                    log::warn!(
                        "refresh aborted at {}:{} {} after {} expressions: {err}",
                        descriptor.item_key,
                        descriptor.sub_key,
                        descriptor.field,
                        summary.evaluated
                    );
                    return Err(err);
                }
            };
            let previous = std::mem::replace(&mut descriptor.last_value, next);
            descriptor.changed = options
                .change_detection
                .has_changed(&previous, &descriptor.last_value);

            summary.evaluated += 1;
            if descriptor.changed {
                summary.changed += 1;
                log::trace!(
                    "{}:{} {} changed: {previous} -> {}",
                    descriptor.item_key,
                    descriptor.sub_key,
                    descriptor.field,
                    descriptor.last_value
                );
            }
        }

        self.passes += 1;
        log::debug!(
            "refresh pass {}: {} evaluated, {} changed",
            self.passes,
            summary.evaluated,
            summary.changed
        );
        Ok(summary)
    }

    /// Descriptors flagged as changed by the last pass, in registry order.
    pub fn changed(&self) -> impl Iterator<Item = (&str, &ExpressionDescriptor)> {
        self.registry
            .list(None)
            .filter(|(_, descriptor)| descriptor.changed)
    }

    /// Restricts which fields show up in [`ChangeTracker::feed`]; `None` shows all of them.
    ///
    /// Visibility is display state only and does not affect evaluation.
    pub fn set_visible_fields(&mut self, fields: Option<&[ExpressionField]>) {
        for descriptor in self.registry.descriptors_mut() {
            descriptor.visible = fields.map_or(true, |fields| fields.contains(&descriptor.field));
        }
    }

    /// Evaluates an expression that is not part of the registry against the bound engine.
    pub fn evaluate_custom(
        &self,
        expression: &Expression,
    ) -> Option<Result<ResolvedValue, EngineError>> {
        self.adapter.evaluate_custom(expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::engine_fn;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn tracker_with(names: &[&str], options: InspectorOptions) -> ChangeTracker {
        let mut registry = ExpressionRegistry::new();
        for name in names {
            registry.add(
                name,
                "",
                ExpressionField::Condition,
                Some(Arc::new(Expression::new(*name))),
            );
        }
        ChangeTracker::new(registry, options)
    }

    #[test]
    fn refresh_without_engine_leaves_values_undefined() {
        let mut tracker = tracker_with(&["a"], InspectorOptions::default());
        let summary = tracker.refresh().unwrap();
        assert_eq!(summary, RefreshSummary { evaluated: 1, changed: 0 });
        assert!(!tracker.is_ready());
        let (_, d) = tracker.registry().list(None).next().unwrap();
        assert!(d.last_value.is_undefined());
    }

    #[test]
    fn engine_failure_leaves_failing_and_later_descriptors_stale() {
        let mut tracker = tracker_with(&["a", "b", "c"], InspectorOptions::default());
        tracker
            .on_state_change(engine_fn(|_| Ok(ResolvedValue::from(json!(1)))), vec![])
            .unwrap();

        let err = tracker
            .on_state_change(
                engine_fn(|exp| match exp.name.as_str() {
                    "b" => Err(EngineError::new(exp, "boom")),
                    _ => Ok(ResolvedValue::from(json!(2))),
                }),
                vec![],
            )
            .unwrap_err();
        assert_eq!(err.expression, "b()");

        let values: Vec<_> = tracker
            .registry()
            .list(None)
            .map(|(_, d)| (d.last_value.as_json().cloned(), d.changed))
            .collect();
        assert_eq!(
            values,
            vec![
                (Some(json!(2)), true),
                (Some(json!(1)), true),
                (Some(json!(1)), true),
            ]
        );
        assert_eq!(tracker.passes(), 1);
    }

    #[test]
    fn engine_is_called_once_per_descriptor_in_order() {
        let calls = Rc::new(Cell::new(0usize));
        let seen = calls.clone();
        let mut tracker = tracker_with(&["a", "b"], InspectorOptions::default());
        tracker.bind_engine(engine_fn(move |_| {
            seen.set(seen.get() + 1);
            Ok(ResolvedValue::Undefined)
        }));
        tracker.refresh().unwrap();
        tracker.refresh().unwrap();
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn visibility_filters_fields_without_touching_state() {
        let mut tracker = tracker_with(&["a"], InspectorOptions::default());
        tracker.set_visible_fields(Some(&[ExpressionField::Disabled]));
        assert!(tracker.registry().list(None).all(|(_, d)| !d.visible));
        tracker.set_visible_fields(None);
        assert!(tracker.registry().list(None).all(|(_, d)| d.visible));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: InspectorOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options.change_detection, ChangeDetection::Identity);
        let options: InspectorOptions =
            serde_json::from_value(json!({ "changeDetection": "structural" })).unwrap();
        assert_eq!(options.change_detection, ChangeDetection::Structural);
    }
}
