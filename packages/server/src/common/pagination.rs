//! Keyset pagination helpers.
//!
//! List endpoints order by a monotonic id, filter with `id > cursor`, and
//! fetch `limit + 1` rows to learn whether a further page exists.

use crate::common::{ServiceError, ServiceResult};

/// Hard cap on page size across all list endpoints.
pub const MAX_LIST_LIMIT: u64 = 50;

/// Normalize a requested limit: 0 means "default to the cap",
/// anything above the cap is a caller error.
pub fn normalize_limit(limit: u64) -> ServiceResult<u64> {
    if limit > MAX_LIST_LIMIT {
        return Err(ServiceError::bad_request(format!(
            "maximum items count in one request is {MAX_LIST_LIMIT}"
        )));
    }

    Ok(if limit == 0 { MAX_LIST_LIMIT } else { limit })
}

/// Get the SQL LIMIT value (limit + 1 to detect has_next).
pub fn fetch_limit(limit: u64) -> i64 {
    (limit + 1) as i64
}

/// Trim an over-fetched result set to the requested limit.
///
/// Queries fetch `limit + 1` rows; the extra row only signals that a
/// further page exists and is never returned.
pub fn trim_results<T>(mut items: Vec<T>, limit: u64) -> (Vec<T>, bool) {
    let has_next = items.len() as u64 > limit;
    if has_next {
        items.truncate(limit as usize);
    }
    (items, has_next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_limit_defaults_to_cap() {
        assert_eq!(normalize_limit(0).unwrap(), MAX_LIST_LIMIT);
    }

    #[test]
    fn test_normalize_limit_passes_through() {
        assert_eq!(normalize_limit(10).unwrap(), 10);
        assert_eq!(normalize_limit(MAX_LIST_LIMIT).unwrap(), MAX_LIST_LIMIT);
    }

    #[test]
    fn test_normalize_limit_rejects_over_cap() {
        assert!(normalize_limit(MAX_LIST_LIMIT + 1).is_err());
    }

    #[test]
    fn test_trim_results() {
        let items: Vec<i32> = (1..=12).collect();
        let (trimmed, has_next) = trim_results(items, 10);
        assert_eq!(trimmed.len(), 10);
        assert!(has_next);

        let items: Vec<i32> = (1..=5).collect();
        let (trimmed, has_next) = trim_results(items, 10);
        assert_eq!(trimmed.len(), 5);
        assert!(!has_next);
    }

    #[test]
    fn test_trim_results_exact_page() {
        let items: Vec<i32> = (1..=10).collect();
        let (trimmed, has_next) = trim_results(items, 10);
        assert_eq!(trimmed.len(), 10);
        assert!(!has_next);
    }
}
