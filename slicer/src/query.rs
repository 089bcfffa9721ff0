//! Query fragments handed to the query layer: value sets, expressions, and the
//! filter/limit actions derived from a color assignment.

use serde::{Deserialize, Serialize};

use crate::value::{value_equals, Value};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),
}

/// An ordered set of values. Duplicates are dropped on construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    pub set_type: String,
    pub elements: Vec<Value>,
}

impl ValueSet {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut elements: Vec<Value> = Vec::new();
        for value in values {
            if !elements.iter().any(|existing| value_equals(existing, &value)) {
                elements.push(value);
            }
        }

        let set_type = elements
            .first()
            .map(Value::type_name)
            .unwrap_or("NULL")
            .to_string();

        Self { set_type, elements }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.elements
            .iter()
            .any(|element| value_equals(element, value))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Set(ValueSet),
    Value(Value),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Expression {
    Ref {
        name: String,
    },
    Literal {
        value: Literal,
    },
    In {
        operand: Box<Expression>,
        expression: Box<Expression>,
    },
}

impl Expression {
    pub fn reference(name: impl Into<String>) -> Self {
        Expression::Ref { name: name.into() }
    }

    /// `self` is a member of `set`.
    pub fn is_in(self, set: ValueSet) -> Self {
        Expression::In {
            operand: Box::new(self),
            expression: Box::new(Expression::Literal {
                value: Literal::Set(set),
            }),
        }
    }

    /// Accepts the shorthand reference forms `$name` and `${name}`.
    pub fn parse_loose(text: &str) -> Result<Self, QueryError> {
        let unsupported = || QueryError::UnsupportedExpression(text.to_string());

        let name = text.trim().strip_prefix('$').ok_or_else(unsupported)?;
        let name = match name.strip_prefix('{') {
            Some(braced) => braced.strip_suffix('}').ok_or_else(unsupported)?,
            None => name,
        };

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(unsupported());
        }

        Ok(Expression::reference(name))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterAction {
    pub expression: Expression,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitAction {
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Filter(FilterAction),
    Limit(LimitAction),
}

impl From<FilterAction> for Action {
    fn from(action: FilterAction) -> Self {
        Action::Filter(action)
    }
}

impl From<LimitAction> for Action {
    fn from(action: LimitAction) -> Self {
        Action::Limit(action)
    }
}
