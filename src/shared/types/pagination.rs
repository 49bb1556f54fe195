use serde::Serialize;

use super::errors::{DomainError, DomainResult};

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> DomainResult<Self> {
        if size == 0 {
            return Err(DomainError::validation("Page size must be positive"));
        }
        Ok(Self { page, size })
    }

    /// Build a request from optional query values, falling back to
    /// `default_size` and capping at `max_size`.
    pub fn from_query(page: Option<u32>, size: Option<u32>, default_size: u32, max_size: u32) -> Self {
        let size = size.unwrap_or(default_size).clamp(1, max_size.max(1));
        Self {
            page: page.unwrap_or(0),
            size,
        }
    }

    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }
}

/// Default and maximum page size applied to list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl PageLimits {
    pub fn request(&self, page: Option<u32>, size: Option<u32>) -> PageRequest {
        PageRequest::from_query(page, size, self.default_size, self.max_size)
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size as u64) as u32
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], PageRequest::new(0, 2).unwrap(), 5);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page: Page<u8> = Page::new(vec![], PageRequest::new(0, 20).unwrap(), 0);
        assert_eq!(page.total_pages(), 0);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(PageRequest::new(0, 0).is_err());
    }

    #[test]
    fn query_values_are_clamped() {
        let req = PageRequest::from_query(None, Some(500), 20, 100);
        assert_eq!(req, PageRequest { page: 0, size: 100 });
        let req = PageRequest::from_query(Some(3), None, 20, 100);
        assert_eq!(req.offset(), 60);
    }

    #[test]
    fn default_limits_use_twenty_per_page() {
        let req = PageLimits::default().request(None, None);
        assert_eq!(req, PageRequest { page: 0, size: 20 });
    }
}
