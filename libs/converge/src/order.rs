//! One-shot ordering assertions.
//!
//! Ordering belongs to a single stable listing, so it is checked once after
//! convergence instead of being folded into a poll predicate.

use thiserror::Error;

/// A listing that is not in lexicographic order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("listing out of order at position {index}: '{previous}' precedes '{next}'")]
pub struct OrderingError {
    /// Position of `next` in the listing.
    pub index: usize,
    pub previous: String,
    pub next: String,
}

/// Check that names are in non-decreasing byte-wise lexicographic order.
pub fn check_sorted<S: AsRef<str>>(names: &[S]) -> Result<(), OrderingError> {
    for (index, pair) in names.windows(2).enumerate() {
        let (previous, next) = (pair[0].as_ref(), pair[1].as_ref());
        if previous > next {
            return Err(OrderingError {
                index: index + 1,
                previous: previous.to_string(),
                next: next.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted() {
        let names: Vec<String> = (1..=20).map(|i| format!("hello@{i:02}.service")).collect();
        assert!(check_sorted(&names).is_ok());
        assert!(check_sorted::<&str>(&[]).is_ok());
    }

    #[test]
    fn test_unpadded_numbers_sort_as_strings() {
        let err = check_sorted(&["hello@1.service", "hello@2.service", "hello@10.service"])
            .unwrap_err();
        assert_eq!(err.index, 2);
        assert_eq!(err.previous, "hello@2.service");
        assert_eq!(err.next, "hello@10.service");
    }
}
