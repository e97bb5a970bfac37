use crate::adapter::ResolvedValue;
use crate::expression::Expression;
use crate::extract::extract;
use crate::survey::SurveyItem;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The slot of a survey node an expression was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionField {
    #[serde(rename = "condition")]
    Condition,
    #[serde(rename = "disabled")]
    Disabled,
    #[serde(rename = "displayCondition")]
    DisplayCondition,
    #[serde(rename = "properties.min")]
    PropertyMin,
    #[serde(rename = "properties.max")]
    PropertyMax,
    #[serde(rename = "properties.dateInputMode")]
    PropertyDateInputMode,
    #[serde(rename = "properties.stepSize")]
    PropertyStepSize,
    #[serde(rename = "validations")]
    Validations,
}

impl ExpressionField {
    pub const ALL: [ExpressionField; 8] = [
        ExpressionField::Condition,
        ExpressionField::Disabled,
        ExpressionField::DisplayCondition,
        ExpressionField::PropertyMin,
        ExpressionField::PropertyMax,
        ExpressionField::PropertyDateInputMode,
        ExpressionField::PropertyStepSize,
        ExpressionField::Validations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpressionField::Condition => "condition",
            ExpressionField::Disabled => "disabled",
            ExpressionField::DisplayCondition => "displayCondition",
            ExpressionField::PropertyMin => "properties.min",
            ExpressionField::PropertyMax => "properties.max",
            ExpressionField::PropertyDateInputMode => "properties.dateInputMode",
            ExpressionField::PropertyStepSize => "properties.stepSize",
            ExpressionField::Validations => "validations",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == input)
    }
}

impl fmt::Display for ExpressionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One located expression plus its tracked evaluation state.
#[derive(Clone, Debug)]
pub struct ExpressionDescriptor {
    pub item_key: String,
    /// Owning component or validation rule; empty for item-level conditions.
    pub sub_key: String,
    pub field: ExpressionField,
    /// Shared with the definition tree, never copied.
    pub expression: Arc<Expression>,
    pub last_value: ResolvedValue,
    pub changed: bool,
    pub visible: bool,
}

impl ExpressionDescriptor {
    pub fn new(
        item_key: impl Into<String>,
        sub_key: impl Into<String>,
        field: ExpressionField,
        expression: Arc<Expression>,
    ) -> Self {
        Self {
            item_key: item_key.into(),
            sub_key: sub_key.into(),
            field,
            expression,
            last_value: ResolvedValue::Undefined,
            changed: false,
            visible: true,
        }
    }

    /// Stable `(item_key, sub_key, field)` identity of this descriptor.
    pub fn location(&self) -> (&str, &str, ExpressionField) {
        (&self.item_key, &self.sub_key, self.field)
    }
}

/// All expressions found in one survey definition, grouped by item key.
///
/// Group order is the order in which item keys were first seen and descriptor order within a
/// group is append order, so both follow the depth-first traversal of the tree. The structure is
/// fixed once built; only descriptor evaluation state changes afterwards.
#[derive(Clone, Debug, Default)]
pub struct ExpressionRegistry {
    groups: IndexMap<String, Vec<ExpressionDescriptor>>,
    fields: IndexSet<ExpressionField>,
}

impl ExpressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry for `root`. A new tree needs a new registry.
    pub fn build(root: Option<&SurveyItem>) -> Self {
        let mut registry = Self::new();
        for descriptor in extract(root) {
            registry.push(descriptor);
        }
        log::debug!(
            "registered {} expressions across {} items",
            registry.len(),
            registry.group_count()
        );
        registry
    }

    /// Appends a descriptor for `expression` under `item_key`. Absent expressions are ignored.
    ///
    /// No de-duplication takes place: adding the same location twice yields two descriptors.
    pub fn add(
        &mut self,
        item_key: &str,
        sub_key: &str,
        field: ExpressionField,
        expression: Option<Arc<Expression>>,
    ) {
        let Some(expression) = expression else {
            return;
        };
        self.push(ExpressionDescriptor::new(item_key, sub_key, field, expression));
    }

    fn push(&mut self, descriptor: ExpressionDescriptor) {
        self.fields.insert(descriptor.field);
        match self.groups.get_mut(&descriptor.item_key) {
            Some(group) => group.push(descriptor),
            None => {
                self.groups
                    .insert(descriptor.item_key.clone(), vec![descriptor]);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn item_keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn group(&self, item_key: &str) -> Option<&[ExpressionDescriptor]> {
        self.groups.get(item_key).map(Vec::as_slice)
    }

    /// Distinct fields seen so far, in first-seen order.
    pub fn fields(&self) -> impl Iterator<Item = ExpressionField> + '_ {
        self.fields.iter().copied()
    }

    pub fn find(
        &self,
        item_key: &str,
        sub_key: &str,
        field: ExpressionField,
    ) -> Option<&ExpressionDescriptor> {
        self.group(item_key)?
            .iter()
            .find(|descriptor| descriptor.sub_key == sub_key && descriptor.field == field)
    }

    /// Flattens the registry into `(item_key, descriptor)` pairs.
    ///
    /// With a `filter`, only groups whose item key contains it (case-sensitive) are included,
    /// all-or-nothing per group. The iterator is recomputed on every call.
    pub fn list<'a>(
        &'a self,
        filter: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a ExpressionDescriptor)> + 'a {
        self.groups
            .iter()
            .filter(move |(item_key, _)| filter.map_or(true, |needle| item_key.contains(needle)))
            .flat_map(|(item_key, group)| {
                group
                    .iter()
                    .map(move |descriptor| (item_key.as_str(), descriptor))
            })
    }

    pub(crate) fn descriptors_mut(&mut self) -> impl Iterator<Item = &mut ExpressionDescriptor> {
        self.groups.values_mut().flat_map(|group| group.iter_mut())
    }
}
