//! Pagination utilities for list endpoints.
//!
//! Two styles are accepted on every list endpoint:
//!
//! - offset-based: `?limit=20&offset=40`
//! - page-based: `?limit=20&page=3` (takes precedence over `offset`)
//!
//! `limit` is clamped to `[1, 100]` and defaults to 10.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::serde::deserialize_optional_i64;

/// Metadata about a paginated response.
///
/// ```json
/// { "total": 100, "limit": 10, "offset": 20, "page": 3, "has_more": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Total number of items across all pages
    pub total: i64,
    /// Maximum items per page (the limit that was applied)
    pub limit: i64,
    /// Number of items skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Current page number (only present if page-based pagination was used)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Whether there are more items after this page
    pub has_more: bool,
}

impl PaginationMeta {
    /// Builds the metadata for a page fetched with `params` out of `total` rows.
    pub fn from_params(total: i64, params: &PaginationParams) -> Self {
        let limit = params.limit();
        let offset = params.offset();

        Self {
            total,
            limit,
            offset: Some(offset),
            page: params.page(),
            has_more: offset + limit < total,
        }
    }
}

/// Query parameters for pagination.
#[derive(Debug, Clone, Hash, Deserialize, ToSchema)]
pub struct PaginationParams {
    /// Maximum number of items to return (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0, ignored if `page` is set)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub offset: Option<i64>,
    /// Page number (1-indexed)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: Some(10),
            offset: Some(0),
            page: None,
        }
    }
}

impl PaginationParams {
    /// Returns the effective limit, clamped to [1, 100].
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    /// Returns the effective offset, derived from `page` when present.
    #[must_use]
    pub fn offset(&self) -> i64 {
        if let Some(page) = self.page {
            (page.max(1) - 1) * self.limit()
        } else {
            self.offset.unwrap_or(0).max(0)
        }
    }

    /// Returns the page number if provided, clamped to a minimum of 1.
    #[must_use]
    pub fn page(&self) -> Option<i64> {
        self.page.map(|p| p.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.page(), None);
    }

    #[test]
    fn test_limit_is_clamped() {
        for (input, expected) in [(Some(0), 1), (Some(-3), 1), (Some(50), 50), (Some(500), 100)] {
            let params = PaginationParams {
                limit: input,
                offset: None,
                page: None,
            };
            assert_eq!(params.limit(), expected);
        }
    }

    #[test]
    fn test_page_takes_precedence_over_offset() {
        let params = PaginationParams {
            limit: Some(20),
            offset: Some(5),
            page: Some(3),
        };
        assert_eq!(params.offset(), 40);
        assert_eq!(params.page(), Some(3));
    }

    #[test]
    fn test_negative_offset_is_zero() {
        let params = PaginationParams {
            limit: Some(10),
            offset: Some(-5),
            page: None,
        };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_meta_from_params() {
        let params = PaginationParams {
            limit: Some(10),
            offset: None,
            page: Some(2),
        };
        let meta = PaginationMeta::from_params(25, &params);
        assert_eq!(meta.offset, Some(10));
        assert_eq!(meta.page, Some(2));
        assert!(meta.has_more);

        let last = PaginationMeta::from_params(
            20,
            &PaginationParams {
                limit: Some(10),
                offset: None,
                page: Some(2),
            },
        );
        assert!(!last.has_more);
    }

    #[test]
    fn test_deserialize_empty_strings() {
        let params: PaginationParams = serde_json::from_str(r#"{"limit":"","offset":""}"#).unwrap();
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_deserialize_values() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"limit":"25","offset":"50"}"#).unwrap();
        assert_eq!(params.limit(), 25);
        assert_eq!(params.offset(), 50);
    }
}
