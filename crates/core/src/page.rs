//! Offset pagination shared by every listing.

use serde::{Deserialize, Serialize};

/// `skip`/`limit` window over an ordered listing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub const fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    /// Clamp `limit` to `max`.
    pub fn capped(self, max: usize) -> Self {
        Self {
            skip: self.skip,
            limit: self.limit.min(max),
        }
    }

    /// Apply the window to an iterator.
    pub fn apply<I: Iterator>(self, iter: I) -> impl Iterator<Item = I::Item> {
        iter.skip(self.skip).take(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_skips_then_limits() {
        let got: Vec<_> = Page::new(2, 3).apply(0..10).collect();
        assert_eq!(got, vec![2, 3, 4]);
    }

    #[test]
    fn capped_keeps_skip() {
        assert_eq!(Page::new(5, 1_000).capped(500), Page::new(5, 500));
    }
}
