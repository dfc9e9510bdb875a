use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;

use crate::domain::{Field, FlagEncoding, RatingLabel, Review, ReviewColumn, ReviewDataset};
use crate::observability::{metrics, Diagnostics};

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Trait for adding derived features to a review dataset
pub trait Enricher {
    /// Return the dataset with every derived column populated for every row
    fn enrich(&self, dataset: ReviewDataset, diag: &dyn Diagnostics) -> ReviewDataset;
}

/// Derives text and rating features from each review on its own
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEnricher;

impl DefaultEnricher {
    pub fn new() -> Self {
        Self
    }
}

impl Enricher for DefaultEnricher {
    fn enrich(&self, dataset: ReviewDataset, diag: &dyn Diagnostics) -> ReviewDataset {
        let started = Instant::now();
        let (mut layout, mut rows, _) = dataset.into_parts();

        rows.iter_mut().for_each(enrich_review);

        // Existing derived columns keep their position
        for column in ReviewColumn::DERIVED {
            if !layout.contains(&Field::Known(column)) {
                layout.push(Field::Known(column));
            }
        }

        metrics::enrich::rows_enriched(rows.len());
        metrics::stage_duration("enrich", started.elapsed());
        diag.info("Enrichment complete: added review_length, rating_label, has_exclamation, clean_text");

        ReviewDataset::new(layout, rows, FlagEncoding::Boolean)
    }
}

/// Populate the four derived fields of one review
pub fn enrich_review(review: &mut Review) {
    let text = review.description_text();
    let review_length = word_count(text);
    let has_exclamation = has_exclamation(text);
    let clean = clean_text(text);

    review.review_length = Some(review_length);
    review.rating_label = Some(rating_label(review.review_rating));
    review.has_exclamation = Some(has_exclamation);
    review.clean_text = Some(clean);
    // Recomputed columns no longer carry their unreadable source values
    review
        .unreadable
        .retain(|(column, _)| !ReviewColumn::DERIVED.contains(column));
}

/// Number of whitespace-separated tokens
pub fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}

/// Bucket a rating; missing and NaN ratings fall below neutral
pub fn rating_label(rating: Option<f64>) -> RatingLabel {
    match rating {
        Some(r) if r >= 4.0 => RatingLabel::Positive,
        Some(r) if r == 3.0 => RatingLabel::Neutral,
        _ => RatingLabel::Negative,
    }
}

pub fn has_exclamation(text: &str) -> bool {
    text.contains('!')
}

/// Lowercase, keep only ASCII letters, digits and whitespace, then collapse
/// whitespace runs to single spaces and trim.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_ALPHANUMERIC.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}
