//! Physical drawing size, units and the standard size table.

use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Grid spacing used when the configured grid is not positive.
pub const DEFAULT_GRID: f64 = 12.0;

/// Length units for drawing sizes and grid spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Units {
    #[default]
    Px,
    Pt,
    Mm,
    Cm,
    In,
    Pc,
}

impl Units {
    /// CSS pixels (1/96 in) per unit.
    pub fn px_per_unit(self) -> f64 {
        match self {
            Units::Px => 1.0,
            Units::Pt => 96.0 / 72.0,
            Units::Mm => 96.0 / 25.4,
            Units::Cm => 96.0 / 2.54,
            Units::In => 96.0,
            Units::Pc => 16.0,
        }
    }

    pub fn to_px(self, value: f64) -> f64 {
        value * self.px_per_unit()
    }
}

/// Standard physical drawing sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StdSize {
    /// Nonstandard size.
    Custom,
    /// 720p.
    #[default]
    Img1280x720,
    /// 1080p HD.
    Img1920x1080,
    /// 4K.
    Img3840x2160,
    /// 8K.
    Img7680x4320,
    /// XGA.
    Img1024x768,
    /// DVD.
    Img720x480,
    /// VGA.
    Img640x480,
    Img320x240,
    A4,
    /// 8.5 x 11 in.
    USLetter,
    /// 8.5 x 14 in.
    USLegal,
    A0,
    A1,
    A2,
    A3,
    A5,
    A6,
    A7,
    A8,
    A9,
    A10,
}

impl StdSize {
    pub const ALL: [StdSize; 21] = [
        StdSize::Img1280x720,
        StdSize::Img1920x1080,
        StdSize::Img3840x2160,
        StdSize::Img7680x4320,
        StdSize::Img1024x768,
        StdSize::Img720x480,
        StdSize::Img640x480,
        StdSize::Img320x240,
        StdSize::A4,
        StdSize::USLetter,
        StdSize::USLegal,
        StdSize::A0,
        StdSize::A1,
        StdSize::A2,
        StdSize::A3,
        StdSize::A5,
        StdSize::A6,
        StdSize::A7,
        StdSize::A8,
        StdSize::A9,
        StdSize::A10,
    ];

    /// Units and width/height of a standard size; `None` for [`StdSize::Custom`].
    pub fn dimensions(self) -> Option<(Units, Size)> {
        let (units, w, h) = match self {
            StdSize::Custom => return None,
            StdSize::Img1280x720 => (Units::Px, 1280.0, 720.0),
            StdSize::Img1920x1080 => (Units::Px, 1920.0, 1080.0),
            StdSize::Img3840x2160 => (Units::Px, 3840.0, 2160.0),
            StdSize::Img7680x4320 => (Units::Px, 7680.0, 4320.0),
            StdSize::Img1024x768 => (Units::Px, 1024.0, 768.0),
            StdSize::Img720x480 => (Units::Px, 720.0, 480.0),
            StdSize::Img640x480 => (Units::Px, 640.0, 480.0),
            StdSize::Img320x240 => (Units::Px, 320.0, 240.0),
            StdSize::A4 => (Units::Mm, 210.0, 297.0),
            StdSize::USLetter => (Units::Pt, 612.0, 792.0),
            StdSize::USLegal => (Units::Pt, 612.0, 1008.0),
            StdSize::A0 => (Units::Mm, 841.0, 1189.0),
            StdSize::A1 => (Units::Mm, 594.0, 841.0),
            StdSize::A2 => (Units::Mm, 420.0, 594.0),
            StdSize::A3 => (Units::Mm, 297.0, 420.0),
            StdSize::A5 => (Units::Mm, 148.0, 210.0),
            StdSize::A6 => (Units::Mm, 105.0, 148.0),
            StdSize::A7 => (Units::Mm, 74.0, 105.0),
            StdSize::A8 => (Units::Mm, 52.0, 74.0),
            StdSize::A9 => (Units::Mm, 37.0, 52.0),
            StdSize::A10 => (Units::Mm, 26.0, 37.0),
        };
        Some((units, Size::new(w, h)))
    }

    /// Find the standard size with these dimensions in either orientation.
    /// Unknown sizes are [`StdSize::Custom`].
    pub fn matching(width: f64, height: f64, units: Units) -> StdSize {
        StdSize::ALL
            .iter()
            .copied()
            .find(|std| {
                std.dimensions().is_some_and(|(u, s)| {
                    u == units
                        && ((s.width == width && s.height == height)
                            || (s.width == height && s.height == width))
                })
            })
            .unwrap_or(StdSize::Custom)
    }
}

/// Physical size of a drawing and its grid spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysSize {
    pub std_size: StdSize,
    pub units: Units,
    /// Drawing size in `units`.
    pub size: Size,
    /// Grid spacing in `units`.
    pub grid: f64,
}

impl Default for PhysSize {
    fn default() -> Self {
        Self {
            std_size: StdSize::Img1280x720,
            units: Units::Px,
            size: Size::new(1280.0, 720.0),
            grid: DEFAULT_GRID,
        }
    }
}

impl PhysSize {
    /// Switch to a standard size, taking its units and dimensions.
    pub fn set_std_size(&mut self, std: StdSize) {
        self.std_size = std;
        self.update();
    }

    /// Reapply the standard size, if any, to units and size.
    pub fn update(&mut self) {
        if let Some((units, size)) = self.std_size.dimensions() {
            self.units = units;
            self.size = size;
        }
    }

    /// Set an explicit size and pick up the matching standard size.
    pub fn set_size(&mut self, size: Size, units: Units) {
        self.size = size;
        self.units = units;
        self.std_size = StdSize::matching(size.width, size.height, units);
    }

    /// Drawing size in CSS pixels.
    pub fn size_px(&self) -> Size {
        Size::new(self.units.to_px(self.size.width), self.units.to_px(self.size.height))
    }

    /// Grid spacing in CSS pixels. A non-positive grid falls back to
    /// [`DEFAULT_GRID`] units.
    pub fn grid_px(&self) -> f64 {
        let grid = if self.grid > 0.0 {
            self.grid
        } else {
            log::trace!("Non-positive grid spacing {}, using {}", self.grid, DEFAULT_GRID);
            DEFAULT_GRID
        };
        self.units.to_px(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_to_px() {
        assert_eq!(Units::Px.to_px(10.0), 10.0);
        assert_eq!(Units::In.to_px(1.0), 96.0);
        assert_eq!(Units::Pc.to_px(1.0), 16.0);
        assert!((Units::Pt.to_px(72.0) - 96.0).abs() < 1e-9);
        assert!((Units::Mm.to_px(25.4) - 96.0).abs() < 1e-9);
        assert!((Units::Cm.to_px(2.54) - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_std_size_both_orientations() {
        assert_eq!(StdSize::matching(210.0, 297.0, Units::Mm), StdSize::A4);
        assert_eq!(StdSize::matching(297.0, 210.0, Units::Mm), StdSize::A4);
        assert_eq!(StdSize::matching(1080.0, 1920.0, Units::Px), StdSize::Img1920x1080);
        assert_eq!(StdSize::matching(612.0, 792.0, Units::Pt), StdSize::USLetter);
    }

    #[test]
    fn test_match_std_size_fallback() {
        assert_eq!(StdSize::matching(210.0, 297.0, Units::Px), StdSize::Custom);
        assert_eq!(StdSize::matching(333.0, 444.0, Units::Mm), StdSize::Custom);
    }

    #[test]
    fn test_set_std_size() {
        let mut ps = PhysSize::default();
        ps.set_std_size(StdSize::USLegal);
        assert_eq!(ps.units, Units::Pt);
        assert_eq!(ps.size, Size::new(612.0, 1008.0));

        ps.set_std_size(StdSize::Custom);
        assert_eq!(ps.size, Size::new(612.0, 1008.0));
    }

    #[test]
    fn test_set_size_matches() {
        let mut ps = PhysSize::default();
        ps.set_size(Size::new(148.0, 105.0), Units::Mm);
        assert_eq!(ps.std_size, StdSize::A6);
        ps.set_size(Size::new(100.0, 100.0), Units::Mm);
        assert_eq!(ps.std_size, StdSize::Custom);
    }

    #[test]
    fn test_grid_px() {
        let mut ps = PhysSize::default();
        assert_eq!(ps.grid_px(), 12.0);
        ps.grid = 0.0;
        assert_eq!(ps.grid_px(), 12.0);
        ps.grid = -3.0;
        assert_eq!(ps.grid_px(), 12.0);
        ps.units = Units::In;
        ps.grid = 0.5;
        assert_eq!(ps.grid_px(), 48.0);
    }

    #[test]
    fn test_size_px() {
        let mut ps = PhysSize::default();
        ps.set_std_size(StdSize::A4);
        let px = ps.size_px();
        assert!((px.width - 793.7007874).abs() < 1e-6);
    }
}
