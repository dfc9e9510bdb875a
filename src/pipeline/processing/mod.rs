// Pipeline processing: enrichment, transformation, and validation

pub mod enrich;
pub mod transform;
pub mod validate;

pub use enrich::{DefaultEnricher, Enricher};
pub use transform::{DefaultTransformer, TransformOutcome, Transformer};
pub use validate::{check_nulls, validate_schema, ExpectedType, Schema, ValidationReport, Validator};
