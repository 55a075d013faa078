use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::{Config, CoordinateMapper, Error, Rotation, Sample, Tag, Zone};

/// Consumer-side state: the tracked tag, the safespace it is checked
/// against and the map projection used to draw both.
#[derive(Debug, Clone)]
pub struct Monitor {
    tag: Tag,
    zone: Zone,
    mapper: CoordinateMapper,
    started: Instant,
    accepted: u64,
    ignored: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// The sample was for a different tag.
    OtherTag,
    Rejected,
}

/// Read-only view of the tracked state for a presenter.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tag_id: String,
    pub position: Option<(f64, f64, f64)>,
    pub display: Option<(f64, f64)>,
    pub in_zone: bool,
    pub distance: f64,
    pub since_update: Option<Duration>,
    pub rotation: Rotation,
}

impl Monitor {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let zone = Zone::inset("Safespace", &config.anchors, config.safe_margin)?;
        let mapper = CoordinateMapper::new(
            &config.anchors,
            config.map.margin,
            config.map.region,
            config.map.rotation,
        )?;
        let tag = Tag::new(
            config.target_tag.clone(),
            config.distance_threshold,
            config.map.trail_capacity,
        );
        Ok(Self::with_parts(tag, zone, mapper))
    }

    pub fn with_parts(tag: Tag, zone: Zone, mapper: CoordinateMapper) -> Self {
        Self {
            tag,
            zone,
            mapper,
            started: Instant::now(),
            accepted: 0,
            ignored: 0,
        }
    }

    pub fn apply(&mut self, sample: &Sample) -> Applied {
        self.apply_at(sample, Instant::now())
    }

    pub fn apply_at(&mut self, sample: &Sample, at: Instant) -> Applied {
        if sample.tag_id != self.tag.id() {
            trace!(tag = %sample.tag_id, "ignoring sample for other tag");
            self.ignored += 1;
            return Applied::OtherTag;
        }
        match self
            .tag
            .update_position_at(sample.x, sample.y, sample.z, &self.zone, at)
        {
            Ok(()) => {
                self.accepted += 1;
                Applied::Updated
            }
            Err(err) => {
                warn!(%err, "rejected sample");
                Applied::Rejected
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> Snapshot {
        let tag = &self.tag;
        let has_position = tag.has_position();
        Snapshot {
            tag_id: tag.id().to_string(),
            position: has_position.then(|| tag.position()),
            display: has_position.then(|| self.mapper.to_display(tag.x(), tag.y())),
            in_zone: tag.is_in_zone(),
            distance: tag.total_distance(),
            since_update: tag
                .last_update()
                .map(|t| now.saturating_duration_since(t)),
            rotation: self.mapper.rotation(),
        }
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.mapper.set_rotation(rotation);
    }

    pub fn rotate_quarter_turn(&mut self) -> Rotation {
        self.mapper.rotate_quarter_turn()
    }

    pub fn reset_distance(&mut self) {
        self.tag.reset_distance();
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn uptime(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    /// Accepted samples per second since the monitor was created.
    pub fn sample_rate(&self, now: Instant) -> f64 {
        let secs = self.uptime(now).as_secs_f64();
        if secs > 0.0 {
            self.accepted as f64 / secs
        } else {
            0.0
        }
    }
}
