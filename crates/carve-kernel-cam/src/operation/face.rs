//! Facing operation: levels the top of the stock to a constant depth.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::zigzag;
use crate::{CamError, RasterSettings, Result, ScanAxis, Tool, Toolpath, ToolpathPoint};

/// Facing operation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Minimum X of the region to face.
    pub min_x: f64,
    /// Minimum Y of the region to face.
    pub min_y: f64,
    /// Maximum X of the region to face.
    pub max_x: f64,
    /// Maximum Y of the region to face.
    pub max_y: f64,
    /// Z of the stock top before facing.
    #[serde(default)]
    pub top_z: f64,
    /// Material to remove below `top_z` (mm).
    pub depth: f64,
}

impl Face {
    /// Create a facing operation over a rectangle.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, top_z: f64, depth: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            top_z,
            depth,
        }
    }

    /// Z of the faced surface.
    pub fn floor_z(&self) -> f64 {
        self.top_z - self.depth
    }

    /// Check extents and depth.
    pub fn validate(&self) -> Result<()> {
        let values = [self.min_x, self.min_y, self.max_x, self.max_y, self.top_z, self.depth];
        if !values.iter().all(|v| v.is_finite()) {
            return Err(CamError::InvalidSettings(
                "face bounds, top_z and depth must be finite".into(),
            ));
        }
        if self.max_x <= self.min_x || self.max_y <= self.min_y {
            return Err(CamError::InvalidSettings(format!(
                "face region is empty: x [{}, {}], y [{}, {}]",
                self.min_x, self.max_x, self.min_y, self.max_y
            )));
        }
        if self.depth < 0.0 {
            return Err(CamError::InvalidSettings(format!(
                "face depth must not be negative, got {}",
                self.depth
            )));
        }
        Ok(())
    }

    /// Generate the facing raster.
    ///
    /// Lines are one step-over apart with points every half step-over; the far
    /// edges of the region are always visited.
    pub fn generate(&self, tool: &Tool, settings: &RasterSettings) -> Result<Toolpath> {
        tool.validate()?;
        settings.validate()?;
        self.validate()?;

        let step_over = tool.cutter_diameter * settings.step_over_fraction;
        let (x_step, y_step) = match settings.axis {
            ScanAxis::AlongX => (step_over / 2.0, step_over),
            ScanAxis::AlongY => (step_over, step_over / 2.0),
        };
        let xs = linspace(self.min_x, self.max_x, x_step);
        let ys = linspace(self.min_y, self.max_y, y_step);
        let z = self.floor_z();

        let (lines, samples) = match settings.axis {
            ScanAxis::AlongX => (ys.len(), xs.len()),
            ScanAxis::AlongY => (xs.len(), ys.len()),
        };
        let lines: Vec<usize> = (0..lines).collect();
        let samples: Vec<usize> = (0..samples).collect();
        let toolpath = zigzag(&lines, &samples, settings.axis, |ix, iy| {
            ToolpathPoint::new(xs[ix], ys[iy], z)
        });

        debug!(
            passes = toolpath.pass_count(),
            points = toolpath.point_count(),
            z,
            "generated facing toolpath"
        );
        Ok(toolpath)
    }
}

/// Coordinates from `start` to `end` spaced by `step`, ending exactly at `end`.
fn linspace(start: f64, end: f64, step: f64) -> Vec<f64> {
    let count = ((end - start) / step + 1e-9).floor() as usize;
    let mut values: Vec<f64> = (0..=count).map(|i| start + i as f64 * step).collect();
    if let Some(last) = values.last_mut() {
        if end - *last > 1e-9 {
            values.push(end);
        } else {
            *last = end;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_basic() {
        let face = Face::new(0.0, 0.0, 10.0, 6.0, 5.0, 1.5);
        let tool = Tool::flat(4.0);
        let settings = RasterSettings::default().with_step_over_fraction(0.5);
        let path = face.generate(&tool, &settings).unwrap();

        // Step-over 2 mm: y = 0, 2, 4, 6; x every 1 mm.
        assert_eq!(path.pass_count(), 4);
        assert!(path.passes.iter().all(|p| p.len() == 11));
        assert!(path.points().all(|p| p.z == 3.5));
        assert_eq!(path.passes[0][0].x, 0.0);
        assert_eq!(path.passes[1][0].x, 10.0);
        assert_eq!(path.passes[3][0].y, 6.0);
    }

    #[test]
    fn test_face_covers_far_edge() {
        let face = Face::new(0.0, 0.0, 10.0, 5.0, 0.0, 1.0);
        let settings = RasterSettings::default().with_step_over_fraction(0.5);
        let path = face.generate(&Tool::flat(4.0), &settings).unwrap();
        // y = 0, 2, 4 and the edge at 5.
        assert_eq!(path.pass_count(), 4);
        assert_eq!(path.passes[3][0].y, 5.0);
    }

    #[test]
    fn test_face_along_y() {
        let face = Face::new(0.0, 0.0, 4.0, 8.0, 0.0, 1.0);
        let settings = RasterSettings::default()
            .with_step_over_fraction(0.5)
            .with_axis(ScanAxis::AlongY);
        let path = face.generate(&Tool::flat(4.0), &settings).unwrap();
        // Lines at x = 0, 2, 4 with points every 1 mm in Y.
        assert_eq!(path.pass_count(), 3);
        assert!(path.passes.iter().all(|p| p.len() == 9));
        assert!(path.passes.iter().all(|p| p.iter().all(|q| q.x == p[0].x)));
        assert_eq!(path.passes[1][0].y, 8.0);
    }

    #[test]
    fn test_face_validation() {
        let tool = Tool::flat(4.0);
        let settings = RasterSettings::default();
        assert!(Face::new(0.0, 0.0, 0.0, 5.0, 0.0, 1.0)
            .generate(&tool, &settings)
            .is_err());
        assert!(Face::new(0.0, 0.0, 5.0, 5.0, 0.0, -1.0)
            .generate(&tool, &settings)
            .is_err());
        assert!(Face::new(0.0, 0.0, 5.0, 5.0, f64::NAN, 1.0)
            .generate(&tool, &settings)
            .is_err());
    }

    #[test]
    fn test_face_defaults_top_to_zero() {
        let json = r#"{"min_x":0.0,"min_y":0.0,"max_x":50.0,"max_y":20.0,"depth":2.0}"#;
        let face: Face = serde_json::from_str(json).unwrap();
        assert_eq!(face.top_z, 0.0);
        assert_eq!(face.floor_z(), -2.0);
    }
}
