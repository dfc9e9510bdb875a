/// Column names shared across the pipeline stages
pub const PRODUCT_ID: &str = "product_id";
pub const REVIEW_RATING: &str = "review_rating";
pub const DESCRIPTION: &str = "description";

// Derived columns, added by the enricher
pub const REVIEW_LENGTH: &str = "review_length";
pub const RATING_LABEL: &str = "rating_label";
pub const HAS_EXCLAMATION: &str = "has_exclamation";
pub const CLEAN_TEXT: &str = "clean_text";

/// Cell text treated as missing when reading delimited files
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "<NA>", "#N/A",
];

pub const DEFAULT_PREVIEW_ROWS: usize = 5;
pub const DEFAULT_LOG_DIR: &str = "logs";

