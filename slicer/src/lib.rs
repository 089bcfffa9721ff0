pub mod colors;
pub mod dimension;
pub mod hover;
pub mod palette;
pub mod query;
pub mod state;
pub mod value;

pub use colors::{Colors, ColorsError, SlotTable};
pub use dimension::{get_dimension, get_dimension_by_expression, Dimension, DimensionError};
pub use palette::{PALETTE, PALETTE_SIZE};
pub use query::{Action, Expression, FilterAction, LimitAction, ValueSet};
pub use state::{DashboardState, StatePersistenceError};
pub use value::Value;
