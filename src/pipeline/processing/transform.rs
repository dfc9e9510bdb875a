use std::collections::HashSet;
use std::time::Instant;

use crate::domain::{Field, FlagEncoding, Review, ReviewColumn, ReviewDataset};
use crate::observability::{metrics, Diagnostics};

/// Result of transforming a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    pub dataset: ReviewDataset,
    pub duplicates_removed: usize,
}

/// Trait for shaping an enriched dataset into its output layout
pub trait Transformer {
    fn transform(&self, dataset: ReviewDataset, diag: &dyn Diagnostics) -> TransformOutcome;
}

/// Deduplicates on (product_id, description), projects onto the target
/// column order and normalizes the rating and flag types.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTransformer;

impl DefaultTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for DefaultTransformer {
    fn transform(&self, dataset: ReviewDataset, diag: &dyn Diagnostics) -> TransformOutcome {
        let started = Instant::now();
        let (layout, rows, flag_encoding) = dataset.into_parts();

        let (mut rows, duplicates_removed) = deduplicate(rows);
        metrics::transform::duplicates_removed(duplicates_removed);
        diag.info(&format!("Deduplicated {} rows", duplicates_removed));

        let layout = project_layout(&layout);
        let round = layout.contains(&Field::Known(ReviewColumn::ReviewRating));
        for row in rows.iter_mut() {
            // Extra columns are not part of the output layout
            row.extras.clear();
            if round {
                row.review_rating = row.review_rating.map(round_rating);
            }
        }

        let flag_encoding = if layout.contains(&Field::Known(ReviewColumn::HasExclamation)) {
            FlagEncoding::Integer
        } else {
            flag_encoding
        };

        metrics::stage_duration("transform", started.elapsed());
        diag.info("Transformation complete: reordered columns, deduplicated, formatted types");

        TransformOutcome {
            dataset: ReviewDataset::new(layout, rows, flag_encoding),
            duplicates_removed,
        }
    }
}

/// Drop rows whose (product_id, description) pair was already seen.
/// The first occurrence wins and order is preserved.
pub fn deduplicate(rows: Vec<Review>) -> (Vec<Review>, usize) {
    let before = rows.len();
    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::with_capacity(before);
    let kept: Vec<Review> = rows
        .into_iter()
        .filter(|row| seen.insert((row.product_id.clone(), row.description.clone())))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// The target column order restricted to the columns that are present
pub fn project_layout(layout: &[Field]) -> Vec<Field> {
    ReviewColumn::TARGET_ORDER
        .into_iter()
        .map(Field::Known)
        .filter(|field| layout.contains(field))
        .collect()
}

/// Round to one decimal place with `f64::round`, i.e. ties away from zero.
/// Magnitudes too large to scale have no fractional digit and pass unchanged.
pub fn round_rating(rating: f64) -> f64 {
    let scaled = rating * 10.0;
    if !scaled.is_finite() {
        return rating;
    }
    scaled.round() / 10.0
}
