mod common;

use common::{snapshot_engine, survey, weekly_survey};
use pretty_assertions::assert_eq;
use serde_json::json;
use survey_inspector::{ChangeTracker, ExpressionField, ExpressionRegistry, InspectorOptions};

fn three_item_registry() -> ExpressionRegistry {
    let tree = survey(json!({
        "key": "root",
        "items": [
            { "key": "q1", "condition": { "name": "a" } },
            { "key": "q2", "condition": { "name": "b" } },
            {
                "key": "q1_sub",
                "condition": { "name": "c" },
                "components": { "key": "rg", "role": "responseGroup", "disabled": { "name": "d" } }
            }
        ]
    }));
    ExpressionRegistry::build(Some(&tree))
}

#[test]
fn filter_keeps_whole_groups_whose_key_contains_the_needle() {
    let registry = three_item_registry();
    let listed: Vec<_> = registry
        .list(Some("q1"))
        .map(|(item_key, d)| (item_key, d.expression.name.as_str()))
        .collect();
    assert_eq!(listed, vec![("q1", "a"), ("q1_sub", "c"), ("q1_sub", "d")]);
}

#[test]
fn filter_is_case_sensitive() {
    let registry = three_item_registry();
    assert_eq!(registry.list(Some("Q1")).count(), 0);
}

#[test]
fn list_is_restartable() {
    let registry = three_item_registry();
    let first: Vec<_> = registry.list(None).map(|(k, _)| k).collect();
    let second: Vec<_> = registry.list(None).map(|(k, _)| k).collect();
    assert_eq!(first, second);
    assert_eq!(first, vec!["q1", "q2", "q1_sub", "q1_sub"]);
}

#[test]
fn feed_renders_expressions_and_values() {
    let mut tracker =
        ChangeTracker::from_definition(Some(&weekly_survey()), InspectorOptions::default());
    tracker
        .on_state_change(snapshot_engine(&[("isLoggedIn()", json!(true))]), vec![])
        .unwrap();

    let feed = tracker.feed(Some("weekly.Q1"));
    assert_eq!(feed.len(), 3);
    assert_eq!(feed[0].label(), "weekly.Q1");
    assert_eq!(feed[0].expression, "isLoggedIn()");
    assert_eq!(feed[0].value, Some(json!(true)));
    assert!(feed[0].changed);
    assert_eq!(feed[1].label(), "weekly.Q1 [1]");
    assert_eq!(feed[1].value, None);
    assert!(!feed[1].changed);

    assert_eq!(
        serde_json::to_value(&feed[0]).unwrap(),
        json!({
            "itemKey": "weekly.Q1",
            "subKey": "",
            "field": "condition",
            "expression": "isLoggedIn()",
            "value": true,
            "changed": true
        })
    );
    assert_eq!(
        serde_json::to_value(&feed[2]).unwrap(),
        json!({
            "itemKey": "weekly.Q1",
            "subKey": "r1",
            "field": "validations",
            "expression": "hasResponse(\"weekly.Q1\",\"rg\")",
            "changed": false
        })
    );
}

#[test]
fn feed_skips_hidden_fields() {
    let mut tracker =
        ChangeTracker::from_definition(Some(&weekly_survey()), InspectorOptions::default());
    tracker.set_visible_fields(Some(&[ExpressionField::Condition]));
    let fields: Vec<_> = tracker.feed(None).into_iter().map(|e| e.item_key).collect();
    assert_eq!(fields, vec!["weekly.Q1", "weekly.HS.Q2"]);
    assert_eq!(tracker.registry().len(), 8);
}
