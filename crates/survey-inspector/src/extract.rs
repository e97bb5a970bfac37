//! Depth-first discovery of every expression embedded in a survey definition.
//!
//! Traversal order is the registry order: an item's own `condition` first, then (for group
//! items) each child item, or (for single items) the component tree followed by validation
//! rules. Components emit `disabled`, `displayCondition` and the expression-valued properties
//! before descending into their children.

use crate::expression::Expression;
use crate::registry::{ExpressionDescriptor, ExpressionField};
use crate::survey::{ItemComponent, SurveyItem, SurveySingleItem};
use std::sync::Arc;

/// Returns every expression in `root`, in traversal order.
///
/// A missing root (or any `null` node inside the tree) contributes nothing.
pub fn extract(root: Option<&SurveyItem>) -> Vec<ExpressionDescriptor> {
    let mut extractor = Extractor::default();
    extractor.visit_item(root);
    extractor.into_descriptors()
}

/// Identity of a component within its item: its `key`, or `role#ordinal` among its siblings.
///
/// Anonymous components sharing a role are told apart only by position, so reordering them
/// changes their identity.
pub fn component_sub_key(component: &ItemComponent, ordinal: usize) -> String {
    let attrs = component.attrs();
    match &attrs.key {
        Some(key) => key.clone(),
        None => format!("{}#{ordinal}", attrs.role),
    }
}

#[derive(Debug, Default)]
pub struct Extractor {
    descriptors: Vec<ExpressionDescriptor>,
}

impl Extractor {
    pub fn into_descriptors(self) -> Vec<ExpressionDescriptor> {
        self.descriptors
    }

    pub fn visit_item(&mut self, item: Option<&SurveyItem>) {
        let Some(item) = item else {
            return;
        };
        self.emit(
            item.key(),
            "",
            ExpressionField::Condition,
            item.condition().and_then(|c| c.as_expression()),
        );

        match item {
            SurveyItem::Group(group) => {
                for child in &group.items {
                    self.visit_item(child.as_ref());
                }
            }
            SurveyItem::Single(single) => self.visit_single_item(single),
        }
    }

    fn visit_single_item(&mut self, item: &SurveySingleItem) {
        if let Some(root) = &item.components {
            self.visit_component(&item.key, Some(root), 0);
        }
        for validation in &item.validations {
            self.emit(
                &item.key,
                &validation.key,
                ExpressionField::Validations,
                validation.rule.as_ref().and_then(|rule| rule.as_expression()),
            );
        }
    }

    pub fn visit_component(
        &mut self,
        item_key: &str,
        component: Option<&ItemComponent>,
        ordinal: usize,
    ) {
        let Some(component) = component else {
            return;
        };
        let sub_key = component_sub_key(component, ordinal);
        let attrs = component.attrs();

        self.emit(
            item_key,
            &sub_key,
            ExpressionField::Disabled,
            attrs.disabled.as_ref().and_then(|c| c.as_expression()),
        );
        self.emit(
            item_key,
            &sub_key,
            ExpressionField::DisplayCondition,
            attrs.display_condition.as_ref().and_then(|c| c.as_expression()),
        );

        if let Some(props) = &attrs.properties {
            let slots = [
                (ExpressionField::PropertyMin, &props.min),
                (ExpressionField::PropertyMax, &props.max),
                (ExpressionField::PropertyDateInputMode, &props.date_input_mode),
                (ExpressionField::PropertyStepSize, &props.step_size),
            ];
            for (field, value) in slots {
                self.emit(
                    item_key,
                    &sub_key,
                    field,
                    value.as_ref().and_then(|v| v.as_expression()),
                );
            }
        }

        // Ordinals restart at 0 for every parent.
        for (idx, child) in component.children().iter().enumerate() {
            self.visit_component(item_key, child.as_ref(), idx);
        }
    }

    fn emit(
        &mut self,
        item_key: &str,
        sub_key: &str,
        field: ExpressionField,
        expression: Option<&Arc<Expression>>,
    ) {
        if let Some(expression) = expression {
            self.descriptors.push(ExpressionDescriptor::new(
                item_key,
                sub_key,
                field,
                Arc::clone(expression),
            ));
        }
    }
}
