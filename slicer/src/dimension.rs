//! Dimension descriptors: the named, typed columns a dashboard can split on.

use std::fmt;

use heck::ToTitleCase;
use serde::{Deserialize, Serialize};

use crate::query::{Expression, QueryError};

const DEFAULT_KIND: &str = "STRING";
const GEO_TERMS: [&str; 4] = ["continent", "country", "city", "region"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DimensionError {
    #[error("dimension must have a name")]
    MissingName,
    #[error(transparent)]
    Expression(#[from] QueryError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DimensionJs", into = "DimensionJs")]
pub struct Dimension {
    name: String,
    title: String,
    expression: Expression,
    kind: String,
    class_name: String,
}

impl Dimension {
    /// A string dimension reading the field `name`, titled after it.
    pub fn new(name: impl Into<String>) -> Result<Self, DimensionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DimensionError::MissingName);
        }

        let kind = DEFAULT_KIND.to_string();
        Ok(Self {
            title: name.to_title_case(),
            expression: Expression::reference(name.as_str()),
            class_name: class_name_for(&name, &kind),
            name,
            kind,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.expression = expression;
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self.class_name = class_name_for(&self.name, &self.kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Presentation hint for the frontend.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Dimension: {}]", self.name)
    }
}

/// Case-insensitive lookup by name.
pub fn get_dimension<'a>(dimensions: &'a [Dimension], name: &str) -> Option<&'a Dimension> {
    let wanted = name.to_lowercase();
    dimensions
        .iter()
        .find(|dimension| dimension.name.to_lowercase() == wanted)
}

pub fn get_dimension_by_expression<'a>(
    dimensions: &'a [Dimension],
    expression: &Expression,
) -> Option<&'a Dimension> {
    dimensions
        .iter()
        .find(|dimension| &dimension.expression == expression)
}

fn class_name_for(name: &str, kind: &str) -> String {
    if kind == DEFAULT_KIND && is_geo(name) {
        return "string-geo".to_string();
    }
    kind.to_lowercase().replace('_', "-")
}

fn is_geo(name: &str) -> bool {
    let name = name.to_lowercase();
    GEO_TERMS.iter().any(|term| name.contains(term))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ExpressionJs {
    Shorthand(String),
    Full(Expression),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct DimensionJs {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expression: Option<ExpressionJs>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl TryFrom<DimensionJs> for Dimension {
    type Error = DimensionError;

    fn try_from(js: DimensionJs) -> Result<Self, Self::Error> {
        let mut dimension = Dimension::new(js.name)?;
        if let Some(title) = js.title.filter(|title| !title.is_empty()) {
            dimension = dimension.with_title(title);
        }
        if let Some(expression) = js.expression {
            let expression = match expression {
                ExpressionJs::Shorthand(text) => Expression::parse_loose(&text)?,
                ExpressionJs::Full(expression) => expression,
            };
            dimension = dimension.with_expression(expression);
        }
        if let Some(kind) = js.kind.filter(|kind| !kind.is_empty()) {
            dimension = dimension.with_kind(kind);
        }
        Ok(dimension)
    }
}

impl From<Dimension> for DimensionJs {
    fn from(dimension: Dimension) -> Self {
        DimensionJs {
            name: dimension.name,
            title: Some(dimension.title),
            expression: Some(ExpressionJs::Full(dimension.expression)),
            kind: Some(dimension.kind),
        }
    }
}
