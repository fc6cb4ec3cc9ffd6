//! Tool definitions, radial cutting profiles and convolution stencils.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::raster::cell_index;
use crate::{CamError, Result};

/// Slack added to the cutter radius when deciding whether a point lies under the tool.
pub const RADIUS_TOLERANCE: f64 = 1e-6;

/// Smallest `tan(v_angle / 2)` accepted for a V-bit.
const MIN_TAN_HALF_ANGLE: f64 = 1e-8;

/// Largest number of stencil entries a single tool may expand to.
const MAX_STENCIL_ENTRIES: usize = 16_000_000;

/// Tip geometry of a cutter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolShape {
    /// Flat end mill, cuts a flat-bottomed cylinder.
    Flat,
    /// Ball end mill, cuts a hemisphere.
    Ball,
    /// V-bit, cuts a cone.
    #[serde(rename = "vbit")]
    VBit {
        /// Included angle in degrees (e.g. 60, 90).
        v_angle: f64,
    },
}

impl ToolShape {
    /// The kind tag of this shape.
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolShape::Flat => ToolKind::Flat,
            ToolShape::Ball => ToolKind::Ball,
            ToolShape::VBit { .. } => ToolKind::VBit,
        }
    }
}

/// Tool kind without shape parameters, parsed from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Flat end mill.
    Flat,
    /// Ball end mill.
    Ball,
    /// V-bit.
    VBit,
}

impl FromStr for ToolKind {
    type Err = CamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "flat" => Ok(ToolKind::Flat),
            "ball" => Ok(ToolKind::Ball),
            "vbit" => Ok(ToolKind::VBit),
            other => Err(CamError::UnsupportedTool(other.to_string())),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Flat => "flat",
            ToolKind::Ball => "ball",
            ToolKind::VBit => "vbit",
        };
        f.write_str(name)
    }
}

/// A cutting tool definition. All dimensions in mm.
///
/// A `Tool` is plain data and may be invalid; call [`Tool::validate`] or
/// [`Tool::profile`] before using it for simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tip geometry.
    #[serde(flatten)]
    pub shape: ToolShape,
    /// Diameter of the cutting part.
    pub cutter_diameter: f64,
    /// Shank diameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shank_diameter: Option<f64>,
    /// Length of the cutting part (LOC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_of_cut: Option<f64>,
    /// Overall tool length (OAL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_length: Option<f64>,
}

impl Tool {
    /// Create a tool with only the cutting geometry specified.
    pub fn new(shape: ToolShape, cutter_diameter: f64) -> Self {
        Self {
            shape,
            cutter_diameter,
            shank_diameter: None,
            length_of_cut: None,
            overall_length: None,
        }
    }

    /// Flat end mill with a shank matching the cutter.
    pub fn flat(diameter: f64) -> Self {
        Self::new(ToolShape::Flat, diameter).with_default_body()
    }

    /// Ball end mill with a shank matching the cutter.
    pub fn ball(diameter: f64) -> Self {
        Self::new(ToolShape::Ball, diameter).with_default_body()
    }

    /// V-bit with the given included angle in degrees.
    pub fn vbit(diameter: f64, v_angle: f64) -> Self {
        Self::new(ToolShape::VBit { v_angle }, diameter).with_default_body()
    }

    /// Build a tool from a kind string such as `"ball"`.
    ///
    /// `v_angle` is required for `"vbit"` and ignored otherwise.
    pub fn from_kind(kind: &str, cutter_diameter: f64, v_angle: Option<f64>) -> Result<Self> {
        let shape = match kind.parse::<ToolKind>()? {
            ToolKind::Flat => ToolShape::Flat,
            ToolKind::Ball => ToolShape::Ball,
            ToolKind::VBit => ToolShape::VBit {
                v_angle: v_angle.ok_or_else(|| {
                    CamError::InvalidTool("v_angle is required for vbit".into())
                })?,
            },
        };
        let tool = Self::new(shape, cutter_diameter);
        tool.validate()?;
        Ok(tool)
    }

    fn with_default_body(mut self) -> Self {
        self.shank_diameter = Some(self.cutter_diameter);
        self.length_of_cut = Some(self.cutter_diameter * 3.0);
        self.overall_length = Some(self.cutter_diameter * 4.0);
        self
    }

    /// Tool kind tag.
    pub fn kind(&self) -> ToolKind {
        self.shape.kind()
    }

    /// Cutter radius.
    pub fn radius(&self) -> f64 {
        self.cutter_diameter / 2.0
    }

    /// Check every dimension and shape parameter.
    pub fn validate(&self) -> Result<()> {
        check_positive("cutter_diameter", self.cutter_diameter)?;
        if let Some(shank) = self.shank_diameter {
            check_positive("shank_diameter", shank)?;
        }
        if let Some(loc) = self.length_of_cut {
            check_positive("length_of_cut", loc)?;
        }
        if let Some(oal) = self.overall_length {
            check_positive("overall_length", oal)?;
        }
        if let ToolShape::VBit { v_angle } = self.shape {
            if !v_angle.is_finite() || v_angle <= 0.0 || v_angle >= 180.0 {
                return Err(CamError::InvalidTool(format!(
                    "v_angle must be in (0, 180) degrees for vbit, got {v_angle}"
                )));
            }
            if (v_angle.to_radians() / 2.0).tan() <= MIN_TAN_HALF_ANGLE {
                return Err(CamError::InvalidTool(format!(
                    "v_angle {v_angle} is too small to define a cone"
                )));
            }
        }
        Ok(())
    }

    /// Validate the tool and derive its radial profile.
    pub fn profile(&self) -> Result<ToolProfile> {
        ToolProfile::new(self)
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CamError::InvalidTool(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

/// Validated radial profile of a tool.
///
/// Maps the distance from the tool axis to the height of the cutting surface
/// above the tip. Only obtainable from a [`Tool`] that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolProfile {
    shape: ToolShape,
    radius: f64,
    tan_half_angle: f64,
}

impl ToolProfile {
    /// Validate `tool` and precompute its profile.
    pub fn new(tool: &Tool) -> Result<Self> {
        tool.validate()?;
        let tan_half_angle = match tool.shape {
            ToolShape::VBit { v_angle } => (v_angle.to_radians() / 2.0).tan(),
            _ => 0.0,
        };
        Ok(Self {
            shape: tool.shape,
            radius: tool.radius(),
            tan_half_angle,
        })
    }

    /// Tip geometry.
    pub fn shape(&self) -> ToolShape {
        self.shape
    }

    /// Cutter radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Cutter diameter.
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }

    /// Height of the cutting surface above the tip at `distance` from the axis.
    ///
    /// Returns `None` outside the cutter radius.
    pub fn elevation(&self, distance: f64) -> Option<f64> {
        let d = distance.abs();
        if !(d <= self.radius + RADIUS_TOLERANCE) {
            return None;
        }
        let r = self.radius;
        match self.shape {
            ToolShape::Flat => Some(0.0),
            ToolShape::Ball => Some(r - (r * r - d * d).max(0.0).sqrt()),
            ToolShape::VBit { .. } => Some(d / self.tan_half_angle),
        }
    }
}

/// A tool profile sampled on a grid around the tool axis.
///
/// Entries are stored in the canonical `dx * ny + dy` layout, `None` where the
/// offset lies outside the cutter.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolStencil {
    half_x: usize,
    half_y: usize,
    entries: Vec<Option<f64>>,
}

impl ToolStencil {
    /// Sample `profile` at the grid spacing `step_x` × `step_y`.
    ///
    /// A flat tool no wider than one grid cell collapses to the single center cell.
    pub fn new(profile: &ToolProfile, step_x: f64, step_y: f64) -> Result<Self> {
        for (name, step) in [("step_x", step_x), ("step_y", step_y)] {
            if !(step.is_finite() && step > 0.0) {
                return Err(CamError::InvalidGrid(format!(
                    "{name} must be a positive number, got {step}"
                )));
            }
        }

        if profile.shape == ToolShape::Flat
            && profile.diameter() <= step_x.min(step_y) + RADIUS_TOLERANCE
        {
            return Ok(Self::single_cell());
        }

        let r = profile.radius;
        let half_x = (r / step_x).ceil();
        let half_y = (r / step_y).ceil();
        let (size_x, size_y) = (2.0 * half_x + 1.0, 2.0 * half_y + 1.0);
        // Sized in f64 so extreme radius/step ratios cannot overflow usize.
        if size_x * size_y > MAX_STENCIL_ENTRIES as f64 {
            return Err(CamError::InvalidGrid(format!(
                "tool of radius {r} mm expands to a {size_x}x{size_y} stencil at this grid spacing"
            )));
        }
        let (half_x, half_y) = (half_x as usize, half_y as usize);
        let (size_x, size_y) = (2 * half_x + 1, 2 * half_y + 1);

        let mut entries = vec![None; size_x * size_y];
        for sx in 0..size_x {
            let x = (sx as f64 - half_x as f64) * step_x;
            for sy in 0..size_y {
                let y = (sy as f64 - half_y as f64) * step_y;
                entries[cell_index(sx, sy, size_y)] = profile.elevation((x * x + y * y).sqrt());
            }
        }

        Ok(Self {
            half_x,
            half_y,
            entries,
        })
    }

    /// Stencil that touches only the cell under the tool axis.
    pub fn single_cell() -> Self {
        Self {
            half_x: 0,
            half_y: 0,
            entries: vec![Some(0.0)],
        }
    }

    /// Half extents `(half_x, half_y)` in cells.
    pub fn half_extent(&self) -> (usize, usize) {
        (self.half_x, self.half_y)
    }

    /// Depth offset at cell offset `(dx, dy)` from the axis.
    pub fn get(&self, dx: isize, dy: isize) -> Option<f64> {
        let sx = dx + self.half_x as isize;
        let sy = dy + self.half_y as isize;
        let size_y = 2 * self.half_y + 1;
        if sx < 0 || sy < 0 || sx as usize > 2 * self.half_x || sy as usize >= size_y {
            return None;
        }
        self.entries[cell_index(sx as usize, sy as usize, size_y)]
    }

    /// Entries for the column at X offset `dx`, indexed by `dy + half_y`.
    pub fn column(&self, dx: isize) -> Option<&[Option<f64>]> {
        let sx = dx + self.half_x as isize;
        if sx < 0 || sx as usize > 2 * self.half_x {
            return None;
        }
        let size_y = 2 * self.half_y + 1;
        let start = cell_index(sx as usize, 0, size_y);
        Some(&self.entries[start..start + size_y])
    }

    /// Iterate defined entries as `(dx, dy, dz)`.
    pub fn iter(&self) -> impl Iterator<Item = (isize, isize, f64)> + '_ {
        let size_y = 2 * self.half_y + 1;
        let (hx, hy) = (self.half_x as isize, self.half_y as isize);
        self.entries.iter().enumerate().filter_map(move |(i, e)| {
            e.map(|dz| ((i / size_y) as isize - hx, (i % size_y) as isize - hy, dz))
        })
    }

    /// Number of cells the tool cuts.
    pub fn defined_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_profile() {
        let profile = Tool::flat(2.0).profile().unwrap();
        assert_eq!(profile.elevation(0.0), Some(0.0));
        assert_eq!(profile.elevation(1.0), Some(0.0));
        assert_eq!(profile.elevation(1.1), None);
    }

    #[test]
    fn test_ball_profile() {
        let profile = Tool::ball(4.0).profile().unwrap();
        assert_relative_eq!(profile.elevation(0.0).unwrap(), 0.0);
        assert_relative_eq!(
            profile.elevation(1.0).unwrap(),
            2.0 - 3.0_f64.sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(profile.elevation(2.0).unwrap(), 2.0);
        assert!(profile.elevation(3.0).is_none());
    }

    #[test]
    fn test_vbit_profile() {
        let profile = Tool::vbit(2.0, 60.0).profile().unwrap();
        assert_relative_eq!(
            profile.elevation(1.0).unwrap(),
            1.0 / 30.0_f64.to_radians().tan(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_invalid_tools_rejected() {
        assert!(matches!(
            Tool::flat(0.0).validate(),
            Err(CamError::InvalidTool(_))
        ));
        assert!(Tool::ball(-3.0).profile().is_err());
        assert!(Tool::flat(f64::NAN).validate().is_err());
        assert!(Tool::vbit(2.0, 0.0).validate().is_err());
        assert!(Tool::vbit(2.0, 180.0).validate().is_err());
        assert!(Tool::vbit(2.0, 1e-12).validate().is_err());

        let mut tool = Tool::flat(3.0);
        tool.shank_diameter = Some(0.0);
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_tool_kind_parse() {
        assert_eq!("flat".parse::<ToolKind>().unwrap(), ToolKind::Flat);
        assert_eq!("vbit".parse::<ToolKind>().unwrap(), ToolKind::VBit);
        assert_eq!(
            "drill".parse::<ToolKind>(),
            Err(CamError::UnsupportedTool("drill".into()))
        );
        assert_eq!(ToolKind::Ball.to_string(), "ball");
    }

    #[test]
    fn test_from_kind() {
        let tool = Tool::from_kind("vbit", 6.0, Some(90.0)).unwrap();
        assert_eq!(tool.shape, ToolShape::VBit { v_angle: 90.0 });
        assert!(Tool::from_kind("vbit", 6.0, None).is_err());
        assert!(Tool::from_kind("bull", 6.0, None).is_err());
    }

    #[test]
    fn test_tool_serialization() {
        let tool = Tool::vbit(6.0, 90.0);
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("\"type\":\"vbit\""));
        let parsed: Tool = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tool);

        let unknown = r#"{"type":"drill","cutter_diameter":3.0}"#;
        assert!(serde_json::from_str::<Tool>(unknown).is_err());
    }

    #[test]
    fn test_flat_stencil_excludes_diagonals() {
        let profile = Tool::flat(2.0).profile().unwrap();
        let stencil = ToolStencil::new(&profile, 1.0, 1.0).unwrap();
        assert_eq!(stencil.half_extent(), (1, 1));
        assert_eq!(stencil.get(0, 0), Some(0.0));
        assert_eq!(stencil.get(1, 0), Some(0.0));
        assert_eq!(stencil.get(0, -1), Some(0.0));
        assert_eq!(stencil.get(1, 1), None);
        assert_eq!(stencil.get(2, 0), None);
        assert_eq!(stencil.defined_count(), 5);
    }

    #[test]
    fn test_small_flat_collapses_to_single_cell() {
        let profile = Tool::flat(0.5).profile().unwrap();
        let stencil = ToolStencil::new(&profile, 1.0, 1.0).unwrap();
        assert_eq!(stencil, ToolStencil::single_cell());
        assert_eq!(stencil.iter().collect::<Vec<_>>(), vec![(0, 0, 0.0)]);
    }

    #[test]
    fn test_anisotropic_stencil() {
        let profile = Tool::ball(4.0).profile().unwrap();
        let stencil = ToolStencil::new(&profile, 1.0, 0.5).unwrap();
        assert_eq!(stencil.half_extent(), (2, 4));
        assert_relative_eq!(stencil.get(0, 4).unwrap(), 2.0);
        let column = stencil.column(-2).unwrap();
        assert_eq!(column.len(), 9);
        assert_eq!(column[4], Some(2.0));
        assert!(stencil.column(3).is_none());
    }

    #[test]
    fn test_stencil_rejects_bad_spacing() {
        let profile = Tool::ball(4.0).profile().unwrap();
        assert!(ToolStencil::new(&profile, 0.0, 1.0).is_err());
        assert!(ToolStencil::new(&profile, 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_oversized_stencil_rejected() {
        let huge = Tool::ball(1e20).profile().unwrap();
        assert!(matches!(
            ToolStencil::new(&huge, 1.0, 1.0),
            Err(CamError::InvalidGrid(_))
        ));
        let wide = Tool::flat(100.0).profile().unwrap();
        assert!(matches!(
            ToolStencil::new(&wide, 1e-300, 1.0),
            Err(CamError::InvalidGrid(_))
        ));
        // 4001 x 4001 cells sits just above the cap.
        let edge = Tool::ball(4.0).profile().unwrap();
        assert!(ToolStencil::new(&edge, 0.001, 0.001).is_err());
        assert!(ToolStencil::new(&edge, 0.01, 0.01).is_ok());
    }
}
