//! Listing filters and page metadata.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_NUMBER, MAX_PAGE_SIZE};
use crate::status::ParcelStatus;

/// Normalised parcel listing query. Page is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParcelQuery {
    pub status: Option<ParcelStatus>,
    pub page: u64,
    pub limit: u64,
}

impl ParcelQuery {
    /// Apply defaults and clamp out-of-range values.
    pub fn new(status: Option<ParcelStatus>, page: Option<u64>, limit: Option<u64>) -> Self {
        let page = page
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE_NUMBER)
            .min(MAX_PAGE_NUMBER);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self {
            status,
            page,
            limit,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for ParcelQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total_page: u64,
    pub total_documents: u64,
}

impl PageMeta {
    pub fn new(query: &ParcelQuery, total_documents: u64) -> Self {
        Self {
            page: query.page,
            limit: query.limit,
            total_page: total_documents.div_ceil(query.limit),
            total_documents,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}
