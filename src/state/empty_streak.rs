/// Per-worker count of consecutive pages that returned no posts
///
/// Any non-empty page resets the count; a worker stops once the count
/// reaches its limit.
#[derive(Debug, Clone)]
pub struct EmptyStreak {
    current: u32,
    limit: u32,
}

impl EmptyStreak {
    /// Creates a streak that is exhausted after `limit` consecutive empty pages
    pub fn new(limit: u32) -> Self {
        Self { current: 0, limit }
    }

    /// Records one page and returns the streak after it
    pub fn record(&mut self, page_was_empty: bool) -> u32 {
        if page_was_empty {
            self.current += 1;
        } else {
            self.current = 0;
        }
        self.current
    }

    /// Consecutive empty pages seen so far
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns true once the worker should stop
    pub fn is_exhausted(&self) -> bool {
        self.current >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_after_exactly_limit() {
        let mut streak = EmptyStreak::new(10);
        for _ in 0..9 {
            streak.record(true);
            assert!(!streak.is_exhausted());
        }
        streak.record(true);
        assert!(streak.is_exhausted());
        assert_eq!(streak.current(), 10);
    }

    #[test]
    fn test_non_empty_page_resets() {
        let mut streak = EmptyStreak::new(10);
        for _ in 0..5 {
            streak.record(true);
        }
        assert_eq!(streak.record(false), 0);

        for _ in 0..4 {
            streak.record(true);
        }
        // 10 pages seen, but only 4 in a row are empty
        assert!(!streak.is_exhausted());
    }
}
