//! Pagination types shared by every list endpoint

use serde::{Deserialize, Serialize};

/// Largest page size a client may request
pub const MAX_PER_PAGE: u32 = 100;

/// Default page size
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamped to the accepted range
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = self.per_page as i64;
        ((self.total + per_page - 1) / per_page) as u32
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of items in the current page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Pagination block for list responses
    pub fn pagination(&self) -> Pagination {
        let limit = self.per_page;
        Pagination {
            page: self.page,
            limit,
            total_pages: self.total_pages(),
            next: self.has_next().then(|| PageLink {
                page: self.page + 1,
                limit,
            }),
            prev: self.has_prev().then(|| PageLink {
                page: self.page - 1,
                limit,
            }),
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Pagination metadata returned with every list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

/// Reference to a neighbouring page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 1);

        let params = ListParams::new(3, 500);
        assert_eq!(params.per_page, MAX_PER_PAGE);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn test_pagination_links() {
        let params = ListParams::new(2, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![1; 10], 25, &params);
        let pagination = result.pagination();

        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.next, Some(PageLink { page: 3, limit: 10 }));
        assert_eq!(pagination.prev, Some(PageLink { page: 1, limit: 10 }));
    }

    #[test]
    fn test_pagination_single_page_has_no_links() {
        let result: PagedResult<i32> = PagedResult::new(vec![1, 2], 2, &ListParams::default());
        let pagination = result.pagination();

        assert_eq!(pagination.total_pages, 1);
        assert!(pagination.next.is_none());
        assert!(pagination.prev.is_none());

        let json = serde_json::to_value(&pagination).unwrap();
        assert!(json.get("next").is_none());
        assert_eq!(json["totalPages"], 1);
    }

    #[test]
    fn test_empty_result_has_zero_pages() {
        let result: PagedResult<i32> = PagedResult::default();
        assert_eq!(result.total_pages(), 0);
        assert!(!result.has_next());
    }

    proptest! {
        #[test]
        fn prop_pages_cover_total(total in 0i64..1000, per_page in 1u32..=100) {
            let probe: PagedResult<()> =
                PagedResult::new(Vec::new(), total, &ListParams::new(1, per_page));
            let pages = probe.total_pages();

            let mut covered = 0i64;
            let mut expected_offset = 0i64;
            for page in 1..=pages {
                let params = ListParams::new(page, per_page);
                prop_assert_eq!(params.offset(), expected_offset);
                let len = (total - params.offset()).min(params.limit());
                prop_assert!(len > 0);
                covered += len;
                expected_offset += params.limit();
            }
            prop_assert_eq!(covered, total);
        }
    }
}
