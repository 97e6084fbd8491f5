//! crates/feedback_core/src/validation.rs
//!
//! Rules for admissible feedback input. Everything here runs locally, before
//! any remote call is attempted.

use std::ops::RangeInclusive;

/// Accepted star ratings.
pub const RATING_RANGE: RangeInclusive<i32> = 1..=5;

/// Minimum comment length, counted in characters after trimming.
pub const MIN_COMMENT_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a rating from 1 to 5 stars")]
    MissingRating,
    #[error("Your comment must be at least 10 characters long")]
    CommentTooShort,
}

/// Checks a rating/comment pair. The rating is checked first.
pub fn validate(rating: i32, comment: &str) -> Result<(), ValidationError> {
    if !RATING_RANGE.contains(&rating) {
        return Err(ValidationError::MissingRating);
    }
    if comment.trim().chars().count() < MIN_COMMENT_CHARS {
        return Err(ValidationError::CommentTooShort);
    }
    Ok(())
}
