pub mod error;
pub mod types;
pub mod value;

pub use error::{DeskError, Result};
pub use types::{Entity, EntityId, EntitySchema, Field, Fields};
pub use value::{DataType, Value};
