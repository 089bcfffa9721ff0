//! Rows for the multi-series hover bubble: one color swab per split value in
//! the hovered time bucket, colored from the same assignment the query used.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::colors::Colors;
use crate::value::Value;

pub const SEGMENT: &str = "SEGMENT";
pub const TIME_SEGMENT: &str = "TIME";

pub type Datum = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorSwab {
    /// `None` renders as an uncolored swab.
    pub color: Option<&'static str>,
    pub slot: Option<usize>,
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HoverBubble {
    pub bucket: Option<Value>,
    pub swabs: Vec<ColorSwab>,
}

pub fn hover_bubble<M, F>(
    datums: &[Datum],
    colors: &Colors,
    measure: M,
    format: F,
) -> Option<HoverBubble>
where
    M: Fn(&Datum) -> f64,
    F: Fn(f64) -> String,
{
    let first = datums.first()?;

    let swabs = datums
        .iter()
        .map(|datum| {
            let segment = datum.get(SEGMENT).cloned().unwrap_or(Value::Null);
            ColorSwab {
                color: colors.get_color(&segment),
                slot: colors.value_index(&segment),
                name: segment.to_string(),
                value: format(measure(datum)),
            }
        })
        .collect();

    Some(HoverBubble {
        bucket: first.get(TIME_SEGMENT).cloned(),
        swabs,
    })
}
