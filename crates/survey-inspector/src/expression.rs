use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A named operation over literal or nested-expression arguments.
///
/// Expressions are opaque to this crate: they are located, rendered and handed to an
/// [`ExpressionEngine`](crate::ExpressionEngine), never interpreted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<ExpressionArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

impl Expression {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
            return_type: None,
        }
    }

    pub fn with_arg(mut self, arg: ExpressionArg) -> Self {
        self.data.push(arg);
        self
    }
}

/// Type tag carried by an [`ExpressionArg`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    Num,
    Str,
    Exp,
}

/// One argument of an [`Expression`].
///
/// The wire layout is `{dtype?, num?, str?, exp?}`; an argument without `dtype` is a string.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionArg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<ArgType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<f64>,
    #[serde(rename = "str", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<Arc<Expression>>,
}

impl ExpressionArg {
    pub fn num(value: f64) -> Self {
        Self {
            dtype: Some(ArgType::Num),
            num: Some(value),
            ..Self::default()
        }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self {
            dtype: Some(ArgType::Str),
            text: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn exp(expression: impl Into<Arc<Expression>>) -> Self {
        Self {
            dtype: Some(ArgType::Exp),
            exp: Some(expression.into()),
            ..Self::default()
        }
    }

    /// The wrapped expression, if this argument is tagged `exp` and carries one.
    pub fn as_expression(&self) -> Option<&Arc<Expression>> {
        match self.dtype {
            Some(ArgType::Exp) => self.exp.as_ref(),
            _ => None,
        }
    }
}

/// Renders `name(arg1,arg2,...)`.
///
/// Nested expressions recurse, numeric arguments print as bare numbers and everything else
/// prints as a double-quoted string.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (idx, arg) in self.data.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for ExpressionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.dtype, &self.exp) {
            (Some(ArgType::Exp), Some(exp)) => write!(f, "{exp}"),
            // `f64` display already drops the fractional part of integral values (`3`, not `3.0`).
            (Some(ArgType::Num), _) => match self.num {
                Some(num) => write!(f, "{num}"),
                None => f.write_str("NaN"),
            },
            _ => write!(f, "\"{}\"", self.text.as_deref().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_numbers_without_fraction() {
        let exp = Expression::new("gt")
            .with_arg(ExpressionArg::num(3.0))
            .with_arg(ExpressionArg::num(2.5));
        assert_eq!(exp.to_string(), "gt(3,2.5)");
    }

    #[test]
    fn renders_untagged_args_as_strings() {
        let exp: Expression = serde_json::from_value(json!({
            "name": "gt",
            "data": [{ "dtype": "num", "num": 3 }, { "str": "x" }]
        }))
        .unwrap();
        assert_eq!(exp.to_string(), r#"gt(3,"x")"#);
    }

    #[test]
    fn renders_nested_expressions() {
        let exp: Expression = serde_json::from_value(json!({
            "name": "and",
            "data": [
                { "dtype": "exp", "exp": { "name": "responseHasKeysAny", "data": [
                    { "str": "weekly.Q1" }, { "str": "rg.mcg" }, { "str": "1" }
                ]}},
                { "dtype": "exp", "exp": { "name": "getContext" } }
            ]
        }))
        .unwrap();
        assert_eq!(
            exp.to_string(),
            r#"and(responseHasKeysAny("weekly.Q1","rg.mcg","1"),getContext())"#
        );
    }

    #[test]
    fn renders_incomplete_args_without_panicking() {
        let exp: Expression = serde_json::from_value(json!({
            "name": "f",
            "data": [{ "dtype": "num" }, { "dtype": "exp" }, {}]
        }))
        .unwrap();
        assert_eq!(exp.to_string(), r#"f(NaN,"","")"#);
    }

    #[test]
    fn as_expression_requires_exp_tag() {
        let mut arg = ExpressionArg::exp(Expression::new("getContext"));
        assert!(arg.as_expression().is_some());
        arg.dtype = Some(ArgType::Num);
        assert!(arg.as_expression().is_none());
    }
}
