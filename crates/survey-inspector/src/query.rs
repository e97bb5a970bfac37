//! Read side consumed by inspector front-ends.

use crate::registry::{ExpressionDescriptor, ExpressionField};
use crate::survey::SurveyItemResponse;
use crate::tracker::ChangeTracker;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// One row of the inspector feed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorEntry {
    pub item_key: String,
    pub sub_key: String,
    pub field: ExpressionField,
    /// `name(arg1,arg2,...)` rendering of the expression.
    pub expression: String,
    /// `None` while the expression resolves to undefined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
    pub changed: bool,
}

impl InspectorEntry {
    pub fn new(item_key: &str, descriptor: &ExpressionDescriptor) -> Self {
        Self {
            item_key: item_key.to_string(),
            sub_key: descriptor.sub_key.clone(),
            field: descriptor.field,
            expression: descriptor.expression.to_string(),
            value: descriptor.last_value.as_json().cloned(),
            changed: descriptor.changed,
        }
    }

    /// `item_key`, or `item_key [sub_key]` when the expression belongs to a sub-element.
    pub fn label(&self) -> String {
        if self.sub_key.is_empty() {
            self.item_key.clone()
        } else {
            format!("{} [{}]", self.item_key, self.sub_key)
        }
    }
}

impl ChangeTracker {
    /// Visible descriptors as display rows, filtered by item-key substring like
    /// [`ExpressionRegistry::list`](crate::ExpressionRegistry::list).
    pub fn feed(&self, filter: Option<&str>) -> Vec<InspectorEntry> {
        self.registry()
            .list(filter)
            .filter(|(_, descriptor)| descriptor.visible)
            .map(|(item_key, descriptor)| InspectorEntry::new(item_key, descriptor))
            .collect()
    }

    /// Stored responses whose key contains `filter` (all of them without a filter).
    pub fn responses(&self, filter: Option<&str>) -> Vec<&SurveyItemResponse> {
        self.adapter()
            .responses()
            .unwrap_or_default()
            .iter()
            .filter(|response| filter.map_or(true, |needle| response.key.contains(needle)))
            .collect()
    }
}
