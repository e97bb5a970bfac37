#![allow(dead_code)]

use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use survey_inspector::{engine_fn, ExpressionEngine, ResolvedValue, SurveyItem};

pub fn survey(value: JsonValue) -> SurveyItem {
    serde_json::from_value(value).expect("valid survey definition")
}

/// Engine answering from a fixed table keyed by expression rendering; anything else is undefined.
pub fn snapshot_engine(values: &[(&str, JsonValue)]) -> impl ExpressionEngine + 'static {
    let table: HashMap<String, JsonValue> = values
        .iter()
        .map(|(rendering, value)| (rendering.to_string(), value.clone()))
        .collect();
    engine_fn(move |exp| {
        Ok(table
            .get(&exp.to_string())
            .cloned()
            .map(ResolvedValue::from)
            .unwrap_or_default())
    })
}

/// A weekly symptoms survey exercising every expression slot.
pub fn weekly_survey() -> SurveyItem {
    survey(json!({
        "key": "weekly",
        "items": [
            {
                "key": "weekly.Q1",
                "condition": { "name": "isLoggedIn" },
                "components": {
                    "role": "root",
                    "items": [
                        { "role": "title" },
                        {
                            "key": "rg",
                            "role": "responseGroup",
                            "items": [
                                {
                                    "key": "mcg",
                                    "role": "multipleChoiceGroup",
                                    "items": [
                                        { "key": "0", "role": "option" },
                                        {
                                            "key": "1",
                                            "role": "option",
                                            "disabled": {
                                                "name": "responseHasKeysAny",
                                                "data": [
                                                    { "str": "weekly.Q1" },
                                                    { "str": "rg.mcg" },
                                                    { "str": "0" }
                                                ]
                                            }
                                        }
                                    ]
                                }
                            ]
                        }
                    ]
                },
                "validations": [
                    {
                        "key": "r1",
                        "type": "hard",
                        "rule": { "name": "hasResponse", "data": [{ "str": "weekly.Q1" }, { "str": "rg" }] }
                    },
                    { "key": "r2", "type": "soft", "rule": true }
                ]
            },
            {
                "key": "weekly.HS",
                "items": [
                    {
                        "key": "weekly.HS.Q2",
                        "condition": {
                            "name": "responseHasKeysAny",
                            "data": [{ "str": "weekly.Q1" }, { "str": "rg.mcg" }, { "str": "1" }]
                        },
                        "components": {
                            "role": "root",
                            "items": [
                                {
                                    "key": "rg",
                                    "role": "responseGroup",
                                    "items": [
                                        {
                                            "role": "dateInput",
                                            "displayCondition": { "name": "isDefined", "data": [{ "str": "x" }] },
                                            "properties": {
                                                "min": {
                                                    "dtype": "exp",
                                                    "exp": {
                                                        "name": "timestampWithOffset",
                                                        "data": [{ "dtype": "num", "num": -31536000 }]
                                                    }
                                                },
                                                "max": { "dtype": "exp", "exp": { "name": "timestampWithOffset", "data": [{ "dtype": "num", "num": 0 }] } },
                                                "dateInputMode": "YMD",
                                                "stepSize": 1
                                            }
                                        },
                                        {
                                            "role": "dateInput",
                                            "properties": {
                                                "dateInputMode": { "dtype": "exp", "exp": { "name": "getAttribute", "data": [{ "str": "mode" }] } }
                                            }
                                        }
                                    ]
                                }
                            ]
                        }
                    },
                    { "key": "weekly.HS.Q3" }
                ]
            },
            null
        ]
    }))
}
