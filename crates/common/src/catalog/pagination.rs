//! Page arithmetic shared by every listing

use crate::errors::{AppError, Result};
use serde::Serialize;

/// A validated page window (both values >= 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    per_page: u64,
}

impl PageRequest {
    /// Validate raw caller input. Non-positive values are rejected, never clamped.
    /// `size_field` names the page-size parameter in violation details.
    pub fn new(page: i64, per_page: i64, max_per_page: u64, size_field: &str) -> Result<Self> {
        if page < 1 {
            return Err(AppError::Validation {
                message: format!("page must be at least 1, got {}", page),
                field: Some("page".to_string()),
            });
        }
        if per_page < 1 || per_page as u64 > max_per_page {
            return Err(AppError::Validation {
                message: format!("page size must be between 1 and {}, got {}", max_per_page, per_page),
                field: Some(size_field.to_string()),
            });
        }

        // The row offset is bound as a signed 64-bit value
        let offset = (page as u64 - 1).checked_mul(per_page as u64);
        if !matches!(offset, Some(o) if o <= i64::MAX as u64) {
            return Err(AppError::Validation {
                message: format!("page {} is out of range", page),
                field: Some("page".to_string()),
            });
        }

        Ok(Self {
            page: page as u64,
            per_page: per_page as u64,
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Rows to skip: (page - 1) * per_page, never above `i64::MAX`
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }

    pub fn is_first(&self) -> bool {
        self.page == 1
    }
}

/// ceil(total_count / per_page); zero when per_page is zero
pub fn total_pages(total_count: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total_count.div_ceil(per_page)
}

/// Pagination block of a listing response.
///
/// Only `(current_page, items_per_page, total_count)` are inputs; the page
/// count and the next/previous flags are always derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    current_page: u64,
    items_per_page: u64,
    total_count: u64,
    total_pages: u64,
    has_next_page: bool,
    has_previous_page: bool,
}

impl Pagination {
    pub fn new(current_page: u64, items_per_page: u64, total_count: u64) -> Self {
        let total_pages = total_pages(total_count, items_per_page);
        Self {
            current_page,
            items_per_page,
            total_count,
            total_pages,
            has_next_page: current_page < total_pages,
            has_previous_page: current_page > 1,
        }
    }

    pub fn for_request(request: PageRequest, total_count: u64) -> Self {
        Self::new(request.page(), request.per_page(), total_count)
    }

    /// Zero-valued counters with the page echoed back
    pub fn empty(current_page: u64, items_per_page: u64) -> Self {
        Self::new(current_page, items_per_page, 0)
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn items_per_page(&self) -> u64 {
        self.items_per_page
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.has_previous_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(99, 1), 99);
    }

    #[test]
    fn test_flags_are_derived() {
        for total in 0..40u64 {
            for per_page in 1..8u64 {
                for page in 1..10u64 {
                    let p = Pagination::new(page, per_page, total);
                    let expected = (total + per_page - 1) / per_page;
                    assert_eq!(p.total_pages(), expected);
                    assert_eq!(p.has_next_page(), page < expected);
                    assert_eq!(p.has_previous_page(), page > 1);
                }
            }
        }
    }

    #[test]
    fn test_empty_has_zero_counters() {
        let p = Pagination::empty(3, 10);
        assert_eq!(p.total_count(), 0);
        assert_eq!(p.total_pages(), 0);
        assert_eq!(p.current_page(), 3);
        assert!(!p.has_next_page());
        assert!(p.has_previous_page());
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(1, 10, 100, "limit").unwrap().offset(), 0);
        assert_eq!(PageRequest::new(3, 15, 50, "limit").unwrap().offset(), 30);
    }

    #[test]
    fn test_rejects_page_past_offset_range() {
        let err = PageRequest::new(i64::MAX, 10, 100, "limit").unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.violations()[0].field, "page");
        assert!(PageRequest::new(1 << 62, 4, 100, "limit").is_err());

        // per_page of 1 keeps the largest page in range
        let last = PageRequest::new(i64::MAX, 1, 100, "limit").unwrap();
        assert_eq!(last.offset(), i64::MAX as u64 - 1);
    }

    #[test]
    fn test_page_size_violation_uses_wire_name() {
        let err = PageRequest::new(1, 0, 50, "itemsPerPage").unwrap_err();
        assert_eq!(err.violations()[0].field, "itemsPerPage");
    }

    #[test]
    fn test_rejects_out_of_range_input() {
        assert!(PageRequest::new(0, 10, 100, "limit").is_err());
        assert!(PageRequest::new(-2, 10, 100, "limit").is_err());
        assert!(PageRequest::new(1, 0, 100, "limit").is_err());
        assert!(PageRequest::new(1, -5, 100, "limit").is_err());
        assert!(PageRequest::new(1, 51, 50, "limit").is_err());
        assert!(PageRequest::new(1, 50, 50, "limit").is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(2, 10, 25)).unwrap();
        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["hasNextPage"], true);
        assert_eq!(json["hasPreviousPage"], true);
    }
}
