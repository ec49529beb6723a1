//! Adaptive fan-out controller.
//!
//! Multiplicative decrease when children pages are slow, additive increase
//! when they are fast, nothing in between. The 900ms / 250ms band keeps the
//! width from oscillating on noisy latencies.

/// Average page latency above which the fan-out width is halved.
pub const SLOW_PAGE_MS: f64 = 900.0;

/// Average page latency below which the fan-out width grows by one.
pub const FAST_PAGE_MS: f64 = 250.0;

/// Current fan-out width and its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveConcurrency {
    current: usize,
    min: usize,
    max: usize,
    enabled: bool,
}

impl AdaptiveConcurrency {
    /// Creates a controller; bounds are clamped so that `1 <= min <= max`
    /// and `initial` lies within them.
    pub fn new(initial: usize, min: usize, max: usize, enabled: bool) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            current: initial.clamp(min, max),
            min,
            max,
            enabled,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Retunes the width from the children-page latency average.
    ///
    /// Returns the width to use for the next batch split.
    pub fn adjust(&mut self, avg_children_ms: f64) -> usize {
        if !self.enabled {
            return self.current;
        }
        if avg_children_ms > SLOW_PAGE_MS && self.current > self.min {
            self.current = (self.current / 2).max(self.min);
        } else if avg_children_ms < FAST_PAGE_MS && self.current < self.max {
            self.current = (self.current + 1).min(self.max);
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_bounds() {
        let c = AdaptiveConcurrency::new(20, 0, 8, true);
        assert_eq!(c.bounds(), (1, 8));
        assert_eq!(c.current(), 8);

        let c = AdaptiveConcurrency::new(1, 4, 2, true);
        assert_eq!(c.bounds(), (4, 4));
        assert_eq!(c.current(), 4);
    }

    #[test]
    fn test_slow_pages_halve_width() {
        let mut c = AdaptiveConcurrency::new(12, 1, 12, true);
        assert_eq!(c.adjust(1_200.0), 6);
        assert_eq!(c.adjust(1_200.0), 3);
        assert_eq!(c.adjust(1_200.0), 1);
        assert_eq!(c.adjust(1_200.0), 1, "never drops below min");
    }

    #[test]
    fn test_halving_respects_min() {
        let mut c = AdaptiveConcurrency::new(5, 4, 10, true);
        assert_eq!(c.adjust(5_000.0), 4);
    }

    #[test]
    fn test_fast_pages_grow_width_by_one() {
        let mut c = AdaptiveConcurrency::new(6, 1, 8, true);
        assert_eq!(c.adjust(100.0), 7);
        assert_eq!(c.adjust(100.0), 8);
        assert_eq!(c.adjust(100.0), 8, "never exceeds max");
    }

    #[test]
    fn test_hysteresis_band_leaves_width_unchanged() {
        let mut c = AdaptiveConcurrency::new(6, 1, 12, true);
        assert_eq!(c.adjust(250.0), 6);
        assert_eq!(c.adjust(500.0), 6);
        assert_eq!(c.adjust(900.0), 6);
    }

    #[test]
    fn test_disabled_controller_is_fixed() {
        let mut c = AdaptiveConcurrency::new(6, 1, 12, false);
        assert_eq!(c.adjust(5_000.0), 6);
        assert_eq!(c.adjust(1.0), 6);
    }
}
