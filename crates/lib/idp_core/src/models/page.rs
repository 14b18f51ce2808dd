//! Offset pagination.

use serde::Serialize;

/// Page size used when the caller asks for `limit=0` (or omits it).
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a single request may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A normalized `offset`/`limit` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Build a page request, defaulting `limit=0` and clamping oversize pages.
    pub fn new(offset: u32, limit: u32) -> Self {
        let limit = match limit {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        Self { offset, limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// One page of results plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}
