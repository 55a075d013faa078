//! Projection of real-world coordinates (meters, Y up) onto a display region
//! (display units, origin top-left, Y down).

use crate::{Bounds, Error, Zone};

/// Map orientation in quarter turns.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Normalizes `degrees` modulo 360; anything that is not a quarter turn is rejected.
    pub fn from_degrees(degrees: i64) -> Result<Self, Error> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(Error::InvalidRotation(degrees)),
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// The orientation one quarter turn further.
    pub fn quarter_turn(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// 90 and 270 transpose the map, so the display box swaps width and height.
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    fn apply(self, dx: f64, dy: f64) -> (f64, f64) {
        match self {
            Rotation::Deg0 => (dx, dy),
            Rotation::Deg90 => (-dy, dx),
            Rotation::Deg180 => (-dx, -dy),
            Rotation::Deg270 => (dy, -dx),
        }
    }
}

impl TryFrom<i64> for Rotation {
    type Error = Error;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Rectangle of the display that the map is drawn into.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct DisplayRegion {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for DisplayRegion {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            width: 56.0,
            height: 30.0,
        }
    }
}

impl DisplayRegion {
    pub fn center(&self) -> (f64, f64) {
        (
            self.offset_x + self.width / 2.0,
            self.offset_y + self.height / 2.0,
        )
    }
}

/// Axis-normalized display rectangle: `left <= right`, `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub start: (f64, f64),
    pub end: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    world: Bounds,
    region: DisplayRegion,
    rotation: Rotation,
    view: Bounds,
    scale_x: f64,
    scale_y: f64,
}

impl CoordinateMapper {
    /// `anchors` are padded by `margin` on their max side to form the mapped area.
    pub fn new(
        anchors: &Bounds,
        margin: f64,
        region: DisplayRegion,
        rotation: Rotation,
    ) -> Result<Self, Error> {
        anchors.validate("anchors")?;
        if !margin.is_finite() || margin < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "display margin must be a non-negative number, got {margin}"
            )));
        }
        let valid_extent = |v: f64| v.is_finite() && v > 0.0;
        if !(valid_extent(region.width)
            && valid_extent(region.height)
            && region.offset_x.is_finite()
            && region.offset_y.is_finite())
        {
            return Err(Error::InvalidConfig(format!(
                "display region must have a positive size, got {}x{}",
                region.width, region.height
            )));
        }
        let world = Bounds {
            x0: anchors.x0,
            y0: anchors.y0,
            x1: anchors.x1 + margin,
            y1: anchors.y1 + margin,
        };
        if !(valid_extent(world.width()) && valid_extent(world.height())) {
            return Err(Error::InvalidConfig(
                "mapped area has zero width or height".to_string(),
            ));
        }
        let mut mapper = Self {
            world,
            region,
            rotation,
            view: world,
            scale_x: 1.0,
            scale_y: 1.0,
        };
        mapper.recompute();
        Ok(mapper)
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.recompute();
    }

    pub fn rotate_quarter_turn(&mut self) -> Rotation {
        self.set_rotation(self.rotation.quarter_turn());
        self.rotation
    }

    fn recompute(&mut self) {
        let (cx, cy) = self.world.center();
        let (w, h, vcx, vcy) = if self.rotation.is_transposed() {
            (self.world.height(), self.world.width(), cy, cx)
        } else {
            (self.world.width(), self.world.height(), cx, cy)
        };
        self.view = Bounds {
            x0: vcx - w / 2.0,
            y0: vcy - h / 2.0,
            x1: vcx + w / 2.0,
            y1: vcy + h / 2.0,
        };
        self.scale_x = self.region.width / w;
        self.scale_y = self.region.height / h;
    }

    pub fn to_display(&self, x: f64, y: f64) -> (f64, f64) {
        let (cx, cy) = self.world.center();
        let (rx, ry) = self.rotation.apply(x - cx, y - cy);
        let (vcx, vcy) = self.view.center();
        let (wx, wy) = (rx + vcx, ry + vcy);
        let px = self.region.offset_x + (wx - self.view.x0) * self.scale_x;
        let py = self.region.offset_y + self.region.height - (wy - self.view.y0) * self.scale_y;
        (px, py)
    }

    pub fn display_rect(&self, zone: &Zone) -> DisplayRect {
        let (ax, ay) = self.to_display(zone.min_x(), zone.min_y());
        let (bx, by) = self.to_display(zone.max_x(), zone.max_y());
        DisplayRect {
            left: ax.min(bx),
            top: ay.min(by),
            right: ax.max(bx),
            bottom: ay.max(by),
        }
    }

    /// Display-space segments for every whole meter inside the mapped area.
    pub fn grid_lines(&self) -> Vec<GridLine> {
        let w = &self.world;
        let xs = (w.x0.ceil() as i64..=w.x1.floor() as i64).map(|i| {
            let x = i as f64;
            ((x, w.y0), (x, w.y1))
        });
        let ys = (w.y0.ceil() as i64..=w.y1.floor() as i64).map(|i| {
            let y = i as f64;
            ((w.x0, y), (w.x1, y))
        });
        xs.chain(ys)
            .map(|((x0, y0), (x1, y1))| GridLine {
                start: self.to_display(x0, y0),
                end: self.to_display(x1, y1),
            })
            .collect()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Mapped real-world area, anchors plus margin.
    pub fn world(&self) -> &Bounds {
        &self.world
    }

    pub fn region(&self) -> &DisplayRegion {
        &self.region
    }

    /// Display units per meter along the display's horizontal and vertical axes.
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn region() -> DisplayRegion {
        DisplayRegion {
            offset_x: 220.0,
            offset_y: 0.0,
            width: 560.0,
            height: 600.0,
        }
    }

    fn mapper(rotation: Rotation) -> CoordinateMapper {
        CoordinateMapper::new(&Bounds::default(), 1.0, region(), rotation).unwrap()
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(720).unwrap(), Rotation::Deg0);
        assert!(matches!(
            Rotation::from_degrees(45),
            Err(Error::InvalidRotation(45))
        ));
    }

    #[test]
    fn test_quarter_turn_cycles() {
        let mut r = Rotation::Deg0;
        for expected in [90, 180, 270, 0] {
            r = r.quarter_turn();
            assert_eq!(r.degrees(), expected);
        }
    }

    #[test]
    fn test_center_maps_to_region_center() {
        let mapper = mapper(Rotation::Deg0);
        let (cx, cy) = mapper.world().center();
        let (px, py) = mapper.to_display(cx, cy);
        assert_relative_eq!(px, 500.0, epsilon = 1e-9);
        assert_relative_eq!(py, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_center_is_fixed_under_every_rotation() {
        for rotation in Rotation::ALL {
            let mapper = mapper(rotation);
            let (cx, cy) = mapper.world().center();
            let (px, py) = mapper.to_display(cx, cy);
            assert_relative_eq!(px, 500.0, epsilon = 1e-9);
            assert_relative_eq!(py, 300.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unrotated_corners() {
        let mapper = mapper(Rotation::Deg0);
        let (px, py) = mapper.to_display(0.0, 0.0);
        assert_relative_eq!(px, 220.0, epsilon = 1e-9);
        assert_relative_eq!(py, 600.0, epsilon = 1e-9);
        let (px, py) = mapper.to_display(8.8, 12.6);
        assert_relative_eq!(px, 780.0, epsilon = 1e-9);
        assert_relative_eq!(py, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scale_swaps_when_transposed() {
        let upright = mapper(Rotation::Deg0);
        let (sx, sy) = upright.scale();
        assert_relative_eq!(sx, 560.0 / 8.8, epsilon = 1e-9);
        assert_relative_eq!(sy, 600.0 / 12.6, epsilon = 1e-9);
        let sideways = mapper(Rotation::Deg90);
        let (sx, sy) = sideways.scale();
        assert_relative_eq!(sx, 560.0 / 12.6, epsilon = 1e-9);
        assert_relative_eq!(sy, 600.0 / 8.8, epsilon = 1e-9);
        assert!(sx > 0.0 && sy > 0.0);
    }

    #[test]
    fn test_quarter_turn_moves_east_edge_to_top() {
        let mapper = mapper(Rotation::Deg90);
        let (_, cy) = mapper.world().center();
        let (px, py) = mapper.to_display(8.8, cy);
        assert_relative_eq!(px, 500.0, epsilon = 1e-9);
        assert_relative_eq!(py, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_half_turn_swaps_corners() {
        let mapper = mapper(Rotation::Deg180);
        let (px, py) = mapper.to_display(0.0, 0.0);
        assert_relative_eq!(px, 780.0, epsilon = 1e-9);
        assert_relative_eq!(py, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_round_trip() {
        let mut mapper = mapper(Rotation::Deg0);
        let point = (5.70, 6.85);
        let original = mapper.to_display(point.0, point.1);
        mapper.set_rotation(Rotation::from_degrees(90).unwrap());
        let rotated = mapper.to_display(point.0, point.1);
        assert!((rotated.0 - original.0).abs() > 1.0 || (rotated.1 - original.1).abs() > 1.0);
        mapper.set_rotation(Rotation::from_degrees(270).unwrap());
        mapper.set_rotation(Rotation::from_degrees(0).unwrap());
        let restored = mapper.to_display(point.0, point.1);
        assert_relative_eq!(restored.0, original.0, epsilon = 1e-9);
        assert_relative_eq!(restored.1, original.1, epsilon = 1e-9);
    }

    #[test]
    fn test_four_quarter_turns_restore() {
        let mut mapper = mapper(Rotation::Deg0);
        let original = mapper.to_display(2.5, 9.0);
        for _ in 0..4 {
            mapper.rotate_quarter_turn();
        }
        assert_eq!(mapper.rotation(), Rotation::Deg0);
        let restored = mapper.to_display(2.5, 9.0);
        assert_relative_eq!(restored.0, original.0, epsilon = 1e-9);
        assert_relative_eq!(restored.1, original.1, epsilon = 1e-9);
    }

    #[test]
    fn test_display_rect_is_normalized() {
        let zone = Zone::new("Safespace", 1.0, 6.8, 1.0, 10.6).unwrap();
        for rotation in Rotation::ALL {
            let rect = mapper(rotation).display_rect(&zone);
            assert!(rect.left < rect.right, "{rotation}");
            assert!(rect.top < rect.bottom, "{rotation}");
            assert!(rect.left >= 220.0 - 1e-9 && rect.right <= 780.0 + 1e-9);
            assert!(rect.top >= -1e-9 && rect.bottom <= 600.0 + 1e-9);
        }
    }

    #[test]
    fn test_grid_has_one_line_per_meter() {
        let lines = mapper(Rotation::Deg0).grid_lines();
        // x: 0..=8, y: 0..=12
        assert_eq!(lines.len(), 9 + 13);
        let first = lines[0];
        assert_relative_eq!(first.start.0, 220.0, epsilon = 1e-9);
        assert_relative_eq!(first.start.0, first.end.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_region_rejected() {
        let bad = DisplayRegion {
            width: 0.0,
            ..region()
        };
        assert!(CoordinateMapper::new(&Bounds::default(), 1.0, bad, Rotation::Deg0).is_err());
        assert!(CoordinateMapper::new(&Bounds::default(), -1.0, region(), Rotation::Deg0).is_err());
    }
}
