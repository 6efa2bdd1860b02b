//! Shared handler state

use std::sync::Arc;

use crate::domain::cache::Cache;
use crate::domain::pagination::PageRequest;
use crate::infrastructure::auth::JwtGenerator;
use crate::infrastructure::services::SocialServices;

use super::types::{ApiError, PageQuery};

#[derive(Debug, Clone)]
pub struct AppState {
    pub services: SocialServices,
    pub jwt: Arc<dyn JwtGenerator>,
    /// The cache store itself, for readiness checks
    pub store: Arc<dyn Cache>,
    pub default_page_size: u32,
}

impl AppState {
    pub fn new(
        services: SocialServices,
        jwt: Arc<dyn JwtGenerator>,
        store: Arc<dyn Cache>,
        default_page_size: u32,
    ) -> Self {
        Self {
            services,
            jwt,
            store,
            default_page_size,
        }
    }

    pub fn page(&self, query: PageQuery) -> Result<PageRequest, ApiError> {
        Ok(query.into_request(self.default_page_size)?)
    }
}
