//! Page requests, source-of-record pages and the cached page envelope

use serde::{Deserialize, Serialize};

use super::DomainError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated request for one page of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::validation("Page numbers start at 1"));
        }

        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(DomainError::validation(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self { page, page_size })
    }

    /// Build from optional query parameters, falling back to the configured size
    pub fn from_query(
        page: Option<u32>,
        page_size: Option<u32>,
        default_page_size: u32,
    ) -> Result<Self, DomainError> {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(default_page_size))
    }

    pub fn first(page_size: u32) -> Result<Self, DomainError> {
        Self::new(1, page_size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of entities plus the total size of the filtered collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Page<T> {
    /// Cut a page out of an already filtered and ordered collection
    ///
    /// Asking for a page past the end is not-found, except page 1 of an empty
    /// collection which is an empty page.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Result<Self, DomainError> {
        let total = all.len();
        let offset = request.offset();

        if offset >= total && request.page() > 1 {
            return Err(DomainError::not_found(format!(
                "Invalid page: page {} is out of range",
                request.page()
            )));
        }

        let items = all
            .into_iter()
            .skip(offset)
            .take(request.page_size() as usize)
            .collect();

        Ok(Self { items, total })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Externally serializable paginated payload, cached as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub count: usize,
    pub page: u32,
    pub page_size: u32,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> PageEnvelope<T> {
    pub fn new(page: Page<T>, request: PageRequest) -> Self {
        let consumed = request.offset() + page.items.len();
        let next = (consumed < page.total).then(|| request.page() + 1);
        let previous = (request.page() > 1).then(|| request.page() - 1);

        Self {
            count: page.total,
            page: request.page(),
            page_size: request.page_size(),
            next,
            previous,
            results: page.items,
        }
    }
}
