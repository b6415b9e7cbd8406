/// Offset pagination shared by list endpoints
use serde::{Deserialize, Serialize};

/// SQLite binds OFFSET as a signed 64-bit integer
pub const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

impl PageQuery {
    /// Missing or zero limit falls back to `default`; larger ones clamp to `max`.
    /// Offsets are clamped to what the store can bind.
    pub fn resolve(&self, default_limit: u64, max_limit: u64) -> PageRequest {
        let limit = match self.limit {
            Some(0) | None => default_limit,
            Some(limit) => limit,
        };
        PageRequest {
            offset: self.offset.unwrap_or(0).min(MAX_OFFSET),
            limit: limit.min(max_limit.max(1)),
        }
    }
}

impl PageRequest {
    pub fn has_more(&self, returned: usize, total: u64) -> bool {
        self.offset.saturating_add(returned as u64) < total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_and_clamps() {
        let page = PageQuery::default().resolve(20, 100);
        assert_eq!(page, PageRequest { offset: 0, limit: 20 });

        let page = PageQuery { offset: Some(40), limit: Some(500) }.resolve(20, 100);
        assert_eq!(page, PageRequest { offset: 40, limit: 100 });

        assert!(page.has_more(100, 141));
        assert!(!page.has_more(100, 140));
    }

    #[test]
    fn test_resolve_clamps_huge_offset() {
        let page = PageQuery { offset: Some(u64::MAX), limit: None }.resolve(20, 100);
        assert_eq!(page.offset, MAX_OFFSET);
        assert_eq!(page.offset as i64, i64::MAX);
        assert!(!page.has_more(0, 3));
    }
}
