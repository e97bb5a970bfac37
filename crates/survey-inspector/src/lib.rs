//! `survey-inspector` finds every conditional or computed expression in a survey definition and
//! tracks how their values change while the survey is being filled in.
//!
//! - [`ExpressionRegistry::build`] walks the definition tree once and records each expression
//!   with its location (item key, component/validation sub-key, field).
//! - [`ChangeTracker`] re-resolves all of them through an external [`ExpressionEngine`] after
//!   every state transition and flags the ones whose value changed since the previous pass.
//! - [`ChangeTracker::feed`] / [`ExpressionRegistry::list`] expose the result to a front-end.
//!
//! The engine itself is opaque: this crate never interprets expressions.

mod adapter;
mod expression;
pub mod extract;
mod query;
mod registry;
pub mod survey;
mod tracker;

pub use adapter::{
    engine_fn, EngineError, EvaluationAdapter, ExpressionEngine, FnEngine, ResolvedValue,
};
pub use expression::{ArgType, Expression, ExpressionArg};
pub use extract::{component_sub_key, extract};
pub use query::InspectorEntry;
pub use registry::{ExpressionDescriptor, ExpressionField, ExpressionRegistry};
pub use survey::{
    load_definition, load_definition_file, ComponentAttrs, ComponentProperties, Condition,
    DefinitionError, ItemComponent, PropertyValue, SurveyGroupItem, SurveyItem,
    SurveyItemResponse, SurveySingleItem, Validation,
};
pub use tracker::{ChangeDetection, ChangeTracker, InspectorOptions, RefreshSummary};
