//! Domain types shared across the pipeline.

pub mod item;
pub mod record;

pub use item::WorkItem;
pub use record::{cell_text, flatten_into, Record};
