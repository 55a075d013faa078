use std::time::Instant;

use crate::{DistanceTracker, Error, Trail, Zone};

/// A single UWB tag and everything derived from its position reports.
#[derive(Debug, Clone)]
pub struct Tag {
    id: String,
    x: f64,
    y: f64,
    z: f64,
    is_in_zone: bool,
    last_update: Option<Instant>,
    distance: DistanceTracker,
    trail: Trail,
}

impl Tag {
    pub fn new(id: impl Into<String>, threshold: f64, trail_capacity: usize) -> Self {
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            is_in_zone: false,
            last_update: None,
            distance: DistanceTracker::new(threshold),
            trail: Trail::new(trail_capacity),
        }
    }

    pub fn update_position(&mut self, x: f64, y: f64, z: f64, zone: &Zone) -> Result<(), Error> {
        self.update_position_at(x, y, z, zone, Instant::now())
    }

    /// Applies a position report. Non-finite input is rejected and leaves the tag untouched.
    pub fn update_position_at(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        zone: &Zone,
        at: Instant,
    ) -> Result<(), Error> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(Error::NonFiniteCoordinate { x, y, z });
        }
        let first = self.distance.last_position().is_none();
        self.x = x;
        self.y = y;
        self.z = z;
        self.last_update = Some(at);
        self.is_in_zone = zone.contains(x, y);
        let moved = self.distance.update(x, y).is_some();
        if first || moved {
            self.trail.push(x, y);
        }
        Ok(())
    }

    pub fn reset_distance(&mut self) {
        self.distance.reset();
        self.trail.clear();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn position(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    pub fn is_in_zone(&self) -> bool {
        self.is_in_zone
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn has_position(&self) -> bool {
        self.last_update.is_some()
    }

    pub fn distance(&self) -> &DistanceTracker {
        &self.distance
    }

    pub fn total_distance(&self) -> f64 {
        self.distance.total_distance()
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }
}
