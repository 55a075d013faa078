use std::collections::VecDeque;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Accumulates the 2D path length of a tag while ignoring positional jitter.
///
/// The reference point is only moved once a sample lands more than
/// `threshold` meters away from it. Small steps therefore add up against the
/// held reference instead of being discarded one by one.
#[derive(Debug, Clone)]
pub struct DistanceTracker {
    last_position: Option<(f64, f64)>,
    total_distance: f64,
    threshold: f64,
}

impl Default for DistanceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DistanceTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            last_position: None,
            total_distance: 0.0,
            threshold,
        }
    }

    /// Returns the accepted step length, if the sample moved the reference.
    pub fn update(&mut self, x: f64, y: f64) -> Option<f64> {
        let Some((last_x, last_y)) = self.last_position else {
            self.last_position = Some((x, y));
            return None;
        };
        let dist = (x - last_x).hypot(y - last_y);
        if dist > self.threshold {
            self.total_distance += dist;
            self.last_position = Some((x, y));
            Some(dist)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.last_position = None;
        self.total_distance = 0.0;
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn last_position(&self) -> Option<(f64, f64)> {
        self.last_position
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Bounded polyline of accepted positions, oldest first.
#[derive(Debug, Clone)]
pub struct Trail {
    points: VecDeque<(f64, f64)>,
    capacity: usize,
}

impl Trail {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, x: f64, y: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back((x, y));
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = (f64, f64)> + '_ {
        self.points.iter().copied()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_first_update_sets_reference_only() {
        let mut tracker = DistanceTracker::default();
        assert_eq!(tracker.update(100.0, 100.0), None);
        assert_eq!(tracker.total_distance(), 0.0);
        assert_eq!(tracker.last_position(), Some((100.0, 100.0)));
    }

    #[test]
    fn test_jitter_below_threshold_is_ignored() {
        let mut tracker = DistanceTracker::default();
        let jitter = [
            (1.0, 1.0),
            (1.2, 1.1),
            (0.9, 1.3),
            (1.1, 0.8),
            (1.3, 1.2),
            (1.0, 1.0),
        ];
        for (x, y) in jitter {
            tracker.update(x, y);
        }
        assert_eq!(tracker.total_distance(), 0.0);
        assert_eq!(tracker.last_position(), Some((1.0, 1.0)));
    }

    #[test]
    fn test_exact_threshold_is_not_counted() {
        let mut tracker = DistanceTracker::default();
        tracker.update(0.0, 0.0);
        assert_eq!(tracker.update(0.5, 0.0), None);
        assert_eq!(tracker.total_distance(), 0.0);
    }

    #[test]
    fn test_straight_line_steps() {
        let mut tracker = DistanceTracker::default();
        tracker.update(0.0, 0.0);
        for i in 1..=3 {
            let step = tracker.update(0.6 * i as f64, 0.0);
            assert_relative_eq!(step.unwrap(), 0.6, epsilon = 1e-9);
        }
        assert_relative_eq!(tracker.total_distance(), 1.8, epsilon = 1e-9);
    }

    #[test]
    fn test_slow_drift_accumulates_against_held_reference() {
        let mut tracker = DistanceTracker::default();
        tracker.update(0.0, 0.0);
        assert_eq!(tracker.update(0.3, 0.0), None);
        let step = tracker.update(0.6, 0.0).unwrap();
        assert_relative_eq!(step, 0.6, epsilon = 1e-9);
        assert_eq!(tracker.update(0.9, 0.0), None);
        assert_relative_eq!(tracker.update(1.2, 0.0).unwrap(), 0.6, epsilon = 1e-9);
        assert_relative_eq!(tracker.total_distance(), 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_diagonal_uses_euclidean_length() {
        let mut tracker = DistanceTracker::default();
        tracker.update(1.0, 1.0);
        tracker.update(4.0, 5.0);
        assert_relative_eq!(tracker.total_distance(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_clears_reference() {
        let mut tracker = DistanceTracker::default();
        tracker.update(0.0, 0.0);
        tracker.update(3.0, 0.0);
        assert_relative_eq!(tracker.total_distance(), 3.0);
        tracker.reset();
        assert_eq!(tracker.total_distance(), 0.0);
        assert_eq!(tracker.last_position(), None);
        assert_eq!(tracker.update(50.0, 50.0), None);
        assert_eq!(tracker.total_distance(), 0.0);
    }

    #[test]
    fn test_trail_evicts_oldest() {
        let mut trail = Trail::new(3);
        for i in 0..5 {
            trail.push(i as f64, 0.0);
        }
        assert_eq!(trail.len(), 3);
        let xs: Vec<f64> = trail.points().map(|(x, _)| x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
        assert_eq!(trail.last(), Some((4.0, 0.0)));
    }

    #[test]
    fn test_zero_capacity_trail_stays_empty() {
        let mut trail = Trail::new(0);
        trail.push(1.0, 1.0);
        assert!(trail.is_empty());
    }
}
