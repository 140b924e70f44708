//! Domain vocabulary shared by the compiler and its callers.
//!
//! - [`value`] - scalar values and their declared types
//! - [`filter`] - filter trees over aspect attributes
//! - [`request`] - item query requests and sort specs
//! - [`item`] - hydrated media items

pub mod filter;
pub mod item;
pub mod request;
pub mod value;

pub use filter::{like_escape, AttributePath, BooleanOperator, Filter, RelationalOperator};
pub use item::{AttributeValue, MediaItem, MediaItemAspect};
pub use request::{MediaItemQuery, SortDirection, SortSpec};
pub use value::{Value, ValueType};
