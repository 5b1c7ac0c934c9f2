//! Gallery query types
//!
//! Unified list query and pagination shapes consumed by the client engine
//! for loads and reconciliation refetches. How these become URL parameters
//! is the transport's business.

use serde::{Deserialize, Serialize};

/// Image list query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageQuery {
    /// Restrict to public images (the shared gallery view)
    #[serde(default)]
    pub only_public: bool,
    /// Page number (1-based)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Sort field (e.g. "created_at_desc")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl ImageQuery {
    /// Query for the current user's whole gallery
    pub fn mine() -> Self {
        Self {
            only_public: false,
            page: None,
            limit: None,
            sort: None,
        }
    }

    /// Query for the public gallery
    pub fn public() -> Self {
        Self {
            only_public: true,
            page: None,
            limit: None,
            sort: None,
        }
    }

    /// Add pagination
    pub fn paginate(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Add sorting
    pub fn order_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

impl Default for ImageQuery {
    fn default() -> Self {
        Self::mine()
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit > 0 {
            ((total as f64) / (limit as f64)).ceil() as u32
        } else {
            1
        };

        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Single-page response (when not paginating)
    pub fn single_page(data: Vec<T>) -> Self {
        let total = data.len() as u64;
        Self {
            data,
            total,
            page: 1,
            limit: total as u32,
            total_pages: 1,
        }
    }
}
