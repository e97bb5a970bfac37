//! Survey definition tree, as consumed (read-only) by the extractor.
//!
//! The JSON layout follows the survey engine's data types: items and components with an `items`
//! array are groups, everything else is a leaf. Both node kinds are closed enums so traversal can
//! dispatch on them exhaustively.

use crate::expression::{Expression, ExpressionArg};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read survey definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid survey definition json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("survey definition must be a JSON object")]
    NotAnItem,
}

/// A slot that may hold an expression or a plain literal (`"disabled": true`).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Expression(Arc<Expression>),
    Literal(JsonValue),
}

impl Condition {
    pub fn as_expression(&self) -> Option<&Arc<Expression>> {
        match self {
            Condition::Expression(exp) => Some(exp),
            Condition::Literal(_) => None,
        }
    }
}

impl From<Expression> for Condition {
    fn from(value: Expression) -> Self {
        Condition::Expression(Arc::new(value))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurveyItem {
    Group(SurveyGroupItem),
    Single(SurveySingleItem),
}

impl SurveyItem {
    pub fn key(&self) -> &str {
        match self {
            SurveyItem::Group(group) => &group.key,
            SurveyItem::Single(single) => &single.key,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            SurveyItem::Group(group) => group.condition.as_ref(),
            SurveyItem::Single(single) => single.condition.as_ref(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurveyGroupItem {
    pub key: String,
    pub condition: Option<Condition>,
    /// `None` entries are `null`s in the source document.
    pub items: Vec<Option<SurveyItem>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurveySingleItem {
    pub key: String,
    pub condition: Option<Condition>,
    pub item_type: Option<String>,
    /// Root of the component tree (normally a group component with role `root`).
    pub components: Option<ItemComponent>,
    pub validations: Vec<Validation>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Validation {
    pub key: String,
    #[serde(rename = "type", default)]
    pub validation_type: Option<String>,
    #[serde(default)]
    pub rule: Option<Condition>,
}

/// Attributes shared by group and leaf components.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAttrs {
    #[serde(default)]
    pub key: Option<String>,
    pub role: String,
    #[serde(default)]
    pub disabled: Option<Condition>,
    #[serde(default)]
    pub display_condition: Option<Condition>,
    #[serde(default)]
    pub properties: Option<ComponentProperties>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemComponent {
    Group {
        attrs: ComponentAttrs,
        items: Vec<Option<ItemComponent>>,
    },
    Leaf(ComponentAttrs),
}

impl ItemComponent {
    pub fn attrs(&self) -> &ComponentAttrs {
        match self {
            ItemComponent::Group { attrs, .. } => attrs,
            ItemComponent::Leaf(attrs) => attrs,
        }
    }

    pub fn children(&self) -> &[Option<ItemComponent>] {
        match self {
            ItemComponent::Group { items, .. } => items,
            ItemComponent::Leaf(_) => &[],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentProperties {
    #[serde(default)]
    pub min: Option<PropertyValue>,
    #[serde(default)]
    pub max: Option<PropertyValue>,
    #[serde(default)]
    pub date_input_mode: Option<PropertyValue>,
    #[serde(default)]
    pub step_size: Option<PropertyValue>,
}

/// A component property that is either a plain literal or an expression argument.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Arg(ExpressionArg),
    Other(JsonValue),
}

impl PropertyValue {
    /// The wrapped expression when the value is an argument tagged `exp`.
    pub fn as_expression(&self) -> Option<&Arc<Expression>> {
        match self {
            PropertyValue::Arg(arg) => arg.as_expression(),
            _ => None,
        }
    }
}

/// One answered item, as handed over by the rendering widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyItemResponse {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<JsonValue>,
}

#[derive(Deserialize)]
struct RawSurveyItem {
    key: String,
    #[serde(default)]
    condition: Option<Condition>,
    #[serde(default)]
    items: Option<Vec<Option<SurveyItem>>>,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
    #[serde(default)]
    components: Option<ItemComponent>,
    #[serde(default)]
    validations: Option<Vec<Validation>>,
}

impl<'de> Deserialize<'de> for SurveyItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSurveyItem::deserialize(deserializer)?;
        Ok(match raw.items {
            Some(items) => SurveyItem::Group(SurveyGroupItem {
                key: raw.key,
                condition: raw.condition,
                items,
            }),
            None => SurveyItem::Single(SurveySingleItem {
                key: raw.key,
                condition: raw.condition,
                item_type: raw.item_type,
                components: raw.components,
                validations: raw.validations.unwrap_or_default(),
            }),
        })
    }
}

#[derive(Deserialize)]
struct RawItemComponent {
    #[serde(flatten)]
    attrs: ComponentAttrs,
    #[serde(default)]
    items: Option<Vec<Option<ItemComponent>>>,
}

impl<'de> Deserialize<'de> for ItemComponent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawItemComponent::deserialize(deserializer)?;
        Ok(match raw.items {
            Some(items) => ItemComponent::Group {
                attrs: raw.attrs,
                items,
            },
            None => ItemComponent::Leaf(raw.attrs),
        })
    }
}

/// Parses a survey definition from JSON.
///
/// Accepts a full survey (`current.surveyDefinition`), a survey with a top-level
/// `surveyDefinition`, or a bare root item, tried in that order.
pub fn load_definition(json: &str) -> Result<SurveyItem, DefinitionError> {
    let document: JsonValue = serde_json::from_str(json)?;
    let definition = document
        .pointer("/current/surveyDefinition")
        .or_else(|| document.get("surveyDefinition"))
        .unwrap_or(&document);
    if !definition.is_object() {
        return Err(DefinitionError::NotAnItem);
    }
    Ok(SurveyItem::deserialize(definition)?)
}

pub fn load_definition_file(path: &Path) -> Result<SurveyItem, DefinitionError> {
    let json = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_definition(&json)
}
