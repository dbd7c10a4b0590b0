//! Evasive "No" control.
//!
//! On fine pointers the control slides away from an approaching pointer
//! while staying inside its zone. On touch devices it stays put and only
//! jiggles when pressed.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn validate(&self, field: &str) -> Result<(), ValidationError> {
        for value in [self.width, self.height] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidDimension {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Tunables for the force field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvasionParams {
    /// Pointer distance at or below which the control moves.
    pub radius: f64,
    /// How far the center is pushed.
    pub push: f64,
    /// Inset kept between the control and the zone edge.
    pub padding: f64,
}

impl Default for EvasionParams {
    fn default() -> Self {
        Self {
            radius: 100.0,
            push: 140.0,
            padding: 6.0,
        }
    }
}

impl EvasionParams {
    /// Every tunable must be finite and non-negative, or the clamp can
    /// place the control outside its zone.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("evasion.radius", self.radius),
            ("evasion.push", self.push),
            ("evasion.padding", self.padding),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidDimension {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// The No control and its containment zone, in zone-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvasiveButton {
    zone: Size,
    control: Size,
    position: Point,
    params: EvasionParams,
}

impl EvasiveButton {
    /// Place the control at the center of the zone.
    pub fn centered(zone: Size, control: Size, params: EvasionParams) -> Result<Self, ValidationError> {
        zone.validate("zone")?;
        control.validate("control")?;
        params.validate()?;
        let mut button = Self {
            zone,
            control,
            position: Point::default(),
            params,
        };
        button.recenter();
        Ok(button)
    }

    pub fn recenter(&mut self) {
        self.position = Point::new(
            ((self.zone.width - self.control.width) / 2.0).max(0.0),
            ((self.zone.height - self.control.height) / 2.0).max(0.0),
        );
    }

    /// Top-left corner of the control.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.control.width / 2.0,
            self.position.y + self.control.height / 2.0,
        )
    }

    pub fn zone(&self) -> Size {
        self.zone
    }

    pub fn control(&self) -> Size {
        self.control
    }

    /// Largest top-left value per axis the clamp allows.
    pub fn max_position(&self) -> Point {
        let p = self.params.padding;
        Point::new(
            (self.zone.width - self.control.width - p * 2.0).max(0.0) + p,
            (self.zone.height - self.control.height - p * 2.0).max(0.0) + p,
        )
    }

    /// React to a pointer move/enter at `pointer`. Returns true when the
    /// control moved.
    pub fn on_pointer(&mut self, pointer: Point) -> bool {
        let center = self.center();
        let dx = center.x - pointer.x;
        let dy = center.y - pointer.y;
        let distance = dx.hypot(dy);
        if distance > self.params.radius {
            return false;
        }

        let (nx, ny) = if distance == 0.0 {
            (1.0, 0.0)
        } else {
            (dx / distance, dy / distance)
        };
        let p = self.params.padding;
        let max = self.max_position();
        let x = center.x + nx * self.params.push - self.control.width / 2.0;
        let y = center.y + ny * self.params.push - self.control.height / 2.0;

        let next = Point::new(x.max(p).min(max.x), y.max(p).min(max.y));
        let moved = next != self.position;
        self.position = next;
        moved
    }
}
