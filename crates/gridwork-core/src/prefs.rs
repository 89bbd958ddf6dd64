//! Editor preferences that drive snapping and the grid.
//!
//! Preferences are plain values handed to the canvas; nothing reads them from
//! global state. Loading and saving them is up to the embedder, which can use
//! the JSON helpers here.

use crate::error::{EditError, EditResult};
use crate::physize::{DEFAULT_GRID, PhysSize};
use serde::{Deserialize, Serialize};

/// Snap and grid preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Physical size and grid spacing for new drawings.
    pub size: PhysSize,
    /// Show the grid.
    pub grid_disp: bool,
    /// Snap positions and sizes to the grid.
    pub snap_grid: bool,
    /// Snap positions and sizes to line up with other elements.
    pub snap_guide: bool,
    /// Snap node movements to other nodes and the grid.
    pub snap_nodes: bool,
    /// Snap tolerance in screen pixels, at least 1.
    pub snap_tol: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            size: PhysSize::default(),
            grid_disp: true,
            snap_grid: true,
            snap_guide: true,
            snap_nodes: true,
            snap_tol: 3,
        }
    }
}

impl Preferences {
    pub fn validate(&self) -> EditResult<()> {
        if self.snap_tol < 1 {
            return Err(EditError::InvalidPreferences(
                "snap_tol must be at least 1".to_string(),
            ));
        }
        if self.size.grid <= 0.0 {
            log::warn!(
                "Non-positive grid spacing {}, using {}",
                self.size.grid,
                DEFAULT_GRID
            );
        }
        Ok(())
    }

    pub fn snap_tolerance(&self) -> f64 {
        f64::from(self.snap_tol)
    }

    /// Parse and validate preferences. Missing fields take their defaults.
    pub fn from_json(json: &str) -> EditResult<Self> {
        let prefs: Self = serde_json::from_str(json)
            .map_err(|e| EditError::InvalidPreferences(e.to_string()))?;
        prefs.validate()?;
        Ok(prefs)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physize::{StdSize, Units};

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.snap_tol, 3);
        assert!(prefs.snap_grid && prefs.snap_guide && prefs.snap_nodes && prefs.grid_disp);
        assert_eq!(prefs.size.std_size, StdSize::Img1280x720);
        assert_eq!(prefs.size.units, Units::Px);
        assert_eq!(prefs.size.grid, 12.0);
        assert!(prefs.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let mut prefs = Preferences::default();
        prefs.snap_guide = false;
        prefs.snap_tol = 5;
        prefs.size.set_std_size(StdSize::A4);
        let json = prefs.to_json().unwrap();
        assert_eq!(Preferences::from_json(&json).unwrap(), prefs);
    }

    #[test]
    fn test_missing_fields_default() {
        let prefs = Preferences::from_json(r#"{"snap_grid": false}"#).unwrap();
        assert!(!prefs.snap_grid);
        assert!(prefs.snap_guide);
        assert_eq!(prefs.snap_tol, 3);
        assert_eq!(prefs.size, PhysSize::default());
    }

    #[test]
    fn test_rejects_zero_tolerance() {
        let err = Preferences::from_json(r#"{"snap_tol": 0}"#).unwrap_err();
        assert!(matches!(err, EditError::InvalidPreferences(_)));
    }

    #[test]
    fn test_non_positive_grid_falls_back() {
        let prefs = Preferences::from_json(r#"{"size": {"grid": 0.0}}"#).unwrap();
        assert_eq!(prefs.size.grid, 0.0);
        assert_eq!(prefs.size.grid_px(), 12.0);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Preferences::from_json("{snap_tol"),
            Err(EditError::InvalidPreferences(_))
        ));
    }
}
