use crate::Error;

/// Real-world rectangle in meters, as spanned by the anchors.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            x1: 7.8,
            y1: 11.6,
        }
    }
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }

    pub fn validate(&self, name: &str) -> Result<(), Error> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidBounds {
                name: name.to_string(),
                min_x: self.x0,
                max_x: self.x1,
                min_y: self.y0,
                max_y: self.y1,
            })
        }
    }
}

/// An axis-aligned rectangular region, e.g. the safespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    name: String,
    bounds: Bounds,
}

impl Zone {
    pub fn new(
        name: impl Into<String>,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    ) -> Result<Self, Error> {
        let name = name.into();
        let bounds = Bounds {
            x0: min_x,
            y0: min_y,
            x1: max_x,
            y1: max_y,
        };
        bounds.validate(&name)?;
        Ok(Self { name, bounds })
    }

    /// Builds a zone from `bounds` shrunk by `margin` on every side.
    pub fn inset(name: impl Into<String>, bounds: &Bounds, margin: f64) -> Result<Self, Error> {
        Self::new(
            name,
            bounds.x0 + margin,
            bounds.x1 - margin,
            bounds.y0 + margin,
            bounds.y1 - margin,
        )
    }

    /// Inclusive on both axes: points on the border are inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bounds.x0 <= x && x <= self.bounds.x1 && self.bounds.y0 <= y && y <= self.bounds.y1
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn min_x(&self) -> f64 {
        self.bounds.x0
    }

    pub fn max_x(&self) -> f64 {
        self.bounds.x1
    }

    pub fn min_y(&self) -> f64 {
        self.bounds.y0
    }

    pub fn max_y(&self) -> f64 {
        self.bounds.y1
    }

    pub fn width(&self) -> f64 {
        self.bounds.width()
    }

    pub fn height(&self) -> f64 {
        self.bounds.height()
    }
}
