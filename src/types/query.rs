//! Pagination and filtering types for transaction listings

use super::account::AccountId;
use super::error::LedgerError;
use serde::Serialize;

/// Optional filters for paginated transaction listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Case-insensitive substring over description, category and amount
    pub search: Option<String>,
    pub account_id: Option<AccountId>,
}

impl TransactionFilter {
    /// Search needle lower-cased, or `None` when absent or blank
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// A page request; `page` is 1-based
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub filter: TransactionFilter,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        PageRequest {
            page,
            page_size,
            filter: TransactionFilter::default(),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.filter.search = Some(search.into());
        self
    }

    pub fn with_account(mut self, account_id: impl Into<AccountId>) -> Self {
        self.filter.account_id = Some(account_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.page == 0 || self.page_size == 0 {
            return Err(LedgerError::InvalidPage {
                page: self.page,
                page_size: self.page_size,
            });
        }
        Ok(())
    }

    /// Number of items skipped before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// A zero `page_size` yields zero pages rather than dividing by zero
    pub fn new(items: Vec<T>, total: u64, request: &PageRequest) -> Self {
        let page_size = u64::from(request.page_size);
        Page {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages: if page_size == 0 {
                0
            } else {
                total.div_ceil(page_size)
            },
        }
    }
}
