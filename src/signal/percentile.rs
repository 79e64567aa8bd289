//! Quantile estimation.
//!
//! Uses linear interpolation between order statistics: for `n` sorted values
//! and quantile `q`, the rank is `h = q * (n - 1)` and the result is
//! `x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])`.
//! This matches the default definition of most numeric libraries.

use std::collections::VecDeque;

/// Quantile of already sorted values. Returns `None` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Quantile of unsorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Fixed-capacity window that keeps a sorted copy of its contents.
///
/// Each push is a binary-search insert plus, once full, a binary-search
/// removal of the oldest value.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    arrival: VecDeque<f64>,
    sorted: Vec<f64>,
}

impl RollingWindow {
    /// Buffers grow on demand, so `capacity` may exceed any realistic length.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            arrival: VecDeque::new(),
            sorted: Vec::new(),
        }
    }

    /// Add a value, evicting the oldest first when the window is full.
    pub fn push(&mut self, value: f64) {
        if self.arrival.len() >= self.capacity {
            if let Some(oldest) = self.arrival.pop_front() {
                let pos = self
                    .sorted
                    .partition_point(|x| x.total_cmp(&oldest).is_lt());
                self.sorted.remove(pos);
            }
        }

        let pos = self.sorted.partition_point(|x| x.total_cmp(&value).is_lt());
        self.sorted.insert(pos, value);
        self.arrival.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.arrival.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrival.is_empty()
    }

    /// Whether the window holds `capacity` values.
    pub fn is_full(&self) -> bool {
        self.arrival.len() == self.capacity
    }

    /// Quantile of the current contents.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        quantile_sorted(&self.sorted, q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile_interpolates() {
        // h = 0.8 * 4 = 3.2 -> 4 + 0.2 * (5 - 4)
        let q = quantile(&[5.0, 1.0, 3.0, 2.0, 4.0], 0.8).unwrap();
        assert_relative_eq!(q, 4.2, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_bounds() {
        let values = [0.3, 0.1, 0.2];
        assert_eq!(quantile(&values, 0.0), Some(0.1));
        assert_eq!(quantile(&values, 1.0), Some(0.3));
        assert_eq!(quantile(&values, 0.5), Some(0.2));
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[0.7], 0.8), Some(0.7));
    }

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0] {
            window.push(v);
        }
        assert!(window.is_full());
        assert_eq!(window.quantile(0.0), Some(1.0));

        window.push(0.5);
        assert_eq!(window.len(), 3);
        // Contents are now {2, 3, 0.5}
        assert_eq!(window.quantile(0.0), Some(0.5));
        assert_eq!(window.quantile(1.0), Some(3.0));
        assert_eq!(window.quantile(0.5), Some(2.0));
    }

    #[test]
    fn test_rolling_window_matches_full_sort() {
        let values: Vec<f64> = (0..50)
            .map(|i| ((i * 37) % 17) as f64 / 10.0 + 0.05)
            .collect();
        let mut window = RollingWindow::new(10);

        for (i, &v) in values.iter().enumerate() {
            window.push(v);
            let start = (i + 1).saturating_sub(10);
            let expected = quantile(&values[start..=i], 0.8).unwrap();
            assert_relative_eq!(window.quantile(0.8).unwrap(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rolling_window_huge_capacity() {
        let mut window = RollingWindow::new(usize::MAX);
        window.push(0.4);
        window.push(0.1);
        assert_eq!(window.len(), 2);
        assert!(!window.is_full());
        assert_eq!(window.quantile(0.0), Some(0.1));
    }

    #[test]
    fn test_rolling_window_duplicates() {
        let mut window = RollingWindow::new(2);
        window.push(0.2);
        window.push(0.2);
        window.push(0.3);
        assert_eq!(window.quantile(0.0), Some(0.2));
        assert_eq!(window.quantile(1.0), Some(0.3));
    }
}
