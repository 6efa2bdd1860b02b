use serde::Deserialize;

use crate::domain::pagination::PageRequest;
use crate::domain::DomainError;

/// `?page=&page_size=` on list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn into_request(self, default_page_size: u32) -> Result<PageRequest, DomainError> {
        PageRequest::from_query(self.page, self.page_size, default_page_size)
    }
}
