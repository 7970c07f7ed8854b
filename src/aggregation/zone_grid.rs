//! Plate-location geometry: the strike zone rectangle and the 3×3 heat-map
//! grid.

use crate::config::{StrikeZoneConfig, ZoneGridConfig};

/// Rows and columns in the heat-map grid
pub const GRID_SIZE: usize = 3;

/// Inclusive strike-zone rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeZone {
    left: f64,
    right: f64,
    bottom: f64,
    top: f64,
}

impl StrikeZone {
    pub fn new(config: &StrikeZoneConfig) -> Self {
        Self {
            left: config.left.min(config.right),
            right: config.left.max(config.right),
            bottom: config.bottom.min(config.top),
            top: config.bottom.max(config.top),
        }
    }

    pub fn contains(&self, side: f64, height: f64) -> bool {
        (self.left..=self.right).contains(&side) && (self.bottom..=self.top).contains(&height)
    }
}

impl Default for StrikeZone {
    fn default() -> Self {
        Self::new(&StrikeZoneConfig::default())
    }
}

/// Fixed 3×3 partition of the plate.
///
/// Cells are half-open, `[lo, lo + size)` on both axes. Row 0 is the lowest
/// band and column 0 the leftmost (catcher's view, negative side).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneGrid {
    left: f64,
    bottom: f64,
    cell_width: f64,
    cell_height: f64,
}

impl ZoneGrid {
    pub fn new(config: &ZoneGridConfig) -> Self {
        let defaults = ZoneGridConfig::default();
        let positive = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                log::warn!("[ZoneGrid] Invalid cell size {}, using {}", value, fallback);
                fallback
            }
        };
        Self {
            left: config.left,
            bottom: config.bottom,
            cell_width: positive(config.cell_width, defaults.cell_width),
            cell_height: positive(config.cell_height, defaults.cell_height),
        }
    }

    /// `(row, col)` of the cell containing the location, or `None` outside
    /// the grid.
    pub fn cell_for(&self, side: f64, height: f64) -> Option<(usize, usize)> {
        let col = band(side, self.left, self.cell_width)?;
        let row = band(height, self.bottom, self.cell_height)?;
        Some((row, col))
    }

    /// `(left, right, bottom, top)` edges of a cell
    pub fn cell_bounds(&self, row: usize, col: usize) -> (f64, f64, f64, f64) {
        let left = self.left + col as f64 * self.cell_width;
        let bottom = self.bottom + row as f64 * self.cell_height;
        (left, left + self.cell_width, bottom, bottom + self.cell_height)
    }
}

impl Default for ZoneGrid {
    fn default() -> Self {
        Self::new(&ZoneGridConfig::default())
    }
}

fn band(value: f64, origin: f64, size: f64) -> Option<usize> {
    let index = ((value - origin) / size).floor();
    if index >= 0.0 && index < GRID_SIZE as f64 {
        Some(index as usize)
    } else {
        None
    }
}
