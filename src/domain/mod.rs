// Data shapes shared across the pipeline stages

pub mod review;
pub mod table;

pub use review::{Field, FlagEncoding, RatingLabel, Review, ReviewColumn, ReviewDataset};
pub use table::{Column, ColumnType, Table, Value};
