//! Color assignment for a split dimension.
//!
//! A [`Colors`] binds up to [`PALETTE_SIZE`] dimension values to palette
//! slots. Slots are sparse: removing a value frees its slot without shifting
//! the others, so every remaining value keeps its color. An assignment with no
//! slot table is in limit mode and waits for a top-N query to supply values.
//!
//! Every mutator returns a new assignment and leaves `self` untouched.

use std::collections::BTreeMap;
use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::palette::{color_at, PALETTE_SIZE};
use crate::query::{Expression, FilterAction, LimitAction, ValueSet};
use crate::value::{value_equals, Value};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ColorsError {
    #[error("must have a dimension")]
    MissingDimension,
    #[error("no free color slot for dimension '{dimension}'")]
    PaletteFull { dimension: String },
}

/// Fixed-size table of palette slots; `None` marks a free slot.
#[derive(Clone, Debug, Default)]
pub struct SlotTable([Option<Value>; PALETTE_SIZE]);

impl SlotTable {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut table = Self::default();
        for (slot, value) in table.0.iter_mut().zip(values) {
            *slot = Some(value);
        }
        table
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index).and_then(Option::as_ref)
    }

    /// Occupied slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (index, value)))
    }

    pub fn len(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn position(&self, value: &Value) -> Option<usize> {
        self.iter()
            .find(|(_, stored)| value_equals(stored, value))
            .map(|(index, _)| index)
    }

    fn first_free(&self) -> Option<usize> {
        self.0.iter().position(Option::is_none)
    }
}

impl PartialEq for SlotTable {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|pair| match pair {
                (None, None) => true,
                (Some(a), Some(b)) => value_equals(a, b),
                _ => false,
            })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "ColorsJs", into = "ColorsJs")]
pub struct Colors {
    dimension: String,
    slots: Option<SlotTable>,
    limit: Option<u32>,
    same_as_limit: bool,
}

impl Colors {
    pub fn new(
        dimension: impl Into<String>,
        slots: Option<SlotTable>,
        limit: Option<u32>,
        same_as_limit: bool,
    ) -> Result<Self, ColorsError> {
        let dimension = dimension.into();
        if dimension.is_empty() {
            return Err(ColorsError::MissingDimension);
        }

        Ok(Self {
            dimension,
            slots,
            limit: limit.filter(|limit| *limit > 0),
            same_as_limit,
        })
    }

    /// An unresolved assignment that will be filled from a top-`limit` query.
    pub fn init(dimension: impl Into<String>, limit: u32) -> Result<Self, ColorsError> {
        Self::new(dimension, None, Some(limit), false)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn slots(&self) -> Option<&SlotTable> {
        self.slots.as_ref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn same_as_limit(&self) -> bool {
        self.same_as_limit
    }

    /// True when `self` can stand in for `other` without re-running a query:
    /// either the two are equal, or `self` holds the frozen result of a limit
    /// query and `other` asks for a limit.
    pub fn equivalent_to_limit(&self, other: &Colors) -> bool {
        if self == other {
            return true;
        }

        self.dimension == other.dimension
            && self.slots.is_some()
            && self.same_as_limit
            && other.limit.is_some()
    }

    /// Row cap for the split query. Zero when unresolved without a limit.
    pub fn num_colors(&self) -> usize {
        match &self.slots {
            Some(slots) => slots.len(),
            None => self.limit.unwrap_or(0) as usize,
        }
    }

    pub fn needs_values(&self) -> bool {
        self.slots.is_none()
    }

    pub fn value_index(&self, value: &Value) -> Option<usize> {
        self.slots.as_ref()?.position(value)
    }

    /// First free slot. Every slot is free while unresolved.
    pub fn next_index(&self) -> Option<usize> {
        match &self.slots {
            Some(slots) => slots.first_free(),
            None => Some(0),
        }
    }

    pub fn has(&self, value: &Value) -> bool {
        self.value_index(value).is_some()
    }

    pub fn get_color(&self, value: &Value) -> Option<&'static str> {
        self.value_index(value).and_then(color_at)
    }

    pub fn to_array(&self) -> Option<ArrayVec<Value, PALETTE_SIZE>> {
        let slots = self.slots.as_ref()?;
        Some(slots.iter().map(|(_, value)| value.clone()).collect())
    }

    pub fn to_set(&self) -> Option<ValueSet> {
        self.to_array().map(ValueSet::from_values)
    }

    /// Membership filter on `segment_name` (the dimension by default). `None`
    /// while unresolved; the caller should issue a limit query instead.
    pub fn to_having_filter(&self, segment_name: Option<&str>) -> Option<FilterAction> {
        let set = self.to_set()?;
        let segment_name = segment_name.unwrap_or(&self.dimension);
        Some(FilterAction {
            expression: Expression::reference(segment_name).is_in(set),
        })
    }

    pub fn to_limit_action(&self) -> LimitAction {
        LimitAction {
            limit: self.num_colors(),
        }
    }

    pub fn set_as_limit(&self, limit: u32) -> Colors {
        Colors {
            dimension: self.dimension.clone(),
            slots: None,
            limit: Some(limit).filter(|limit| *limit > 0),
            same_as_limit: false,
        }
    }

    /// Freezes the rows of a limit query into slots `0..`, keeping at most one
    /// value per palette color.
    pub fn set_value_equivalent<I>(&self, values: I) -> Colors
    where
        I: IntoIterator<Item = Value>,
    {
        let slots = SlotTable::from_values(values);
        trace!(
            dimension = %self.dimension,
            values = slots.len(),
            "froze limit values into color slots"
        );

        Colors {
            dimension: self.dimension.clone(),
            slots: Some(slots),
            limit: None,
            same_as_limit: true,
        }
    }

    /// Like [`Colors::add`], but reports a full palette instead of ignoring it.
    pub fn try_add(&self, value: Value) -> Result<Colors, ColorsError> {
        if self.has(&value) {
            return Ok(self.clone());
        }

        let index = self.next_index().ok_or_else(|| ColorsError::PaletteFull {
            dimension: self.dimension.clone(),
        })?;

        let mut slots = self.slots.clone().unwrap_or_default();
        slots.0[index] = Some(value);

        Ok(Colors {
            dimension: self.dimension.clone(),
            slots: Some(slots),
            limit: self.limit,
            same_as_limit: false,
        })
    }

    /// Binds `value` to the first free slot. Returns an unchanged copy when the
    /// value is already bound or the palette is full.
    pub fn add(&self, value: Value) -> Colors {
        match self.try_add(value) {
            Ok(colors) => colors,
            Err(err) => {
                debug!(%err, "color assignment left unchanged");
                self.clone()
            }
        }
    }

    /// Frees the slot holding `value`. Other slots keep their indices.
    pub fn remove(&self, value: &Value) -> Colors {
        let (Some(index), Some(slots)) = (self.value_index(value), &self.slots) else {
            return self.clone();
        };

        let mut slots = slots.clone();
        slots.0[index] = None;

        Colors {
            dimension: self.dimension.clone(),
            slots: Some(slots),
            limit: self.limit,
            same_as_limit: false,
        }
    }

    pub fn toggle(&self, value: Value) -> Colors {
        if self.has(&value) {
            self.remove(&value)
        } else {
            self.add(value)
        }
    }
}

impl PartialEq for Colors {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && self.slots == other.slots
            && self.limit == other.limit
            && self.same_as_limit == other.same_as_limit
    }
}

impl fmt::Display for Colors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Colors: {}]", self.dimension)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorsJs {
    #[serde(default)]
    dimension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<BTreeMap<usize, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    same_as_limit: bool,
}

impl TryFrom<ColorsJs> for Colors {
    type Error = ColorsError;

    fn try_from(js: ColorsJs) -> Result<Self, Self::Error> {
        let slots = js.values.map(|values| {
            let mut table = SlotTable::default();
            for (index, value) in values {
                if let Some(slot) = table.0.get_mut(index) {
                    *slot = Some(value);
                }
            }
            table
        });

        Colors::new(js.dimension, slots, js.limit, js.same_as_limit)
    }
}

impl From<Colors> for ColorsJs {
    fn from(colors: Colors) -> Self {
        let values = colors.slots.map(|slots| {
            slots
                .iter()
                .map(|(index, value)| (index, value.clone()))
                .collect()
        });

        ColorsJs {
            dimension: colors.dimension,
            values,
            limit: colors.limit,
            same_as_limit: colors.same_as_limit,
        }
    }
}
