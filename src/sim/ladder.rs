//! Size ladder
//!
//! The ordered progression of piece sizes. Two touching pieces of rung `i`
//! merge into one piece of rung `i + 1`; the last rung is terminal.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// RGB display color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

/// One rung of the ladder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderEntry {
    pub index: usize,
    pub radius: f32,
    pub color: Color,
}

/// Classic ladder: radii 20..=155 in steps of 15
const CLASSIC_COLORS: [Color; 10] = [
    Color::rgb(255, 0, 0),
    Color::rgb(255, 153, 0),
    Color::rgb(255, 255, 0),
    Color::rgb(51, 255, 0),
    Color::rgb(115, 255, 171),
    Color::rgb(0, 255, 255),
    Color::rgb(51, 133, 255),
    Color::rgb(51, 0, 255),
    Color::rgb(204, 0, 255),
    Color::rgb(255, 0, 153),
];

/// Immutable size table
#[derive(Debug, Clone)]
pub struct SizeLadder {
    entries: Vec<LadderEntry>,
}

impl SizeLadder {
    /// Build a ladder from `(radius, color)` rungs, smallest first.
    ///
    /// Radii must be positive and strictly increasing.
    pub fn new(rungs: Vec<(f32, Color)>) -> Result<Self, SimError> {
        if rungs.is_empty() {
            return Err(SimError::InvalidSettings(
                "size ladder must have at least one size".to_string(),
            ));
        }

        let mut prev = 0.0_f32;
        for &(radius, _) in &rungs {
            if !radius.is_finite() || radius <= prev {
                return Err(SimError::InvalidSettings(format!(
                    "ladder radii must be positive and strictly increasing (got {radius} after {prev})"
                )));
            }
            prev = radius;
        }

        let entries = rungs
            .into_iter()
            .enumerate()
            .map(|(index, (radius, color))| LadderEntry {
                index,
                radius,
                color,
            })
            .collect();

        Ok(Self { entries })
    }

    /// The ten-rung ladder the game ships with
    pub fn classic() -> Self {
        let entries = CLASSIC_COLORS
            .iter()
            .enumerate()
            .map(|(index, &color)| LadderEntry {
                index,
                radius: 20.0 + 15.0 * index as f32,
                color,
            })
            .collect();
        Self { entries }
    }

    /// Number of rungs (K)
    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Look up a rung, rejecting out-of-range indices
    pub fn entry(&self, index: usize) -> Result<&LadderEntry, SimError> {
        self.entries.get(index).ok_or(SimError::InvalidSizeIndex {
            index,
            count: self.entries.len(),
        })
    }

    pub fn radius_of(&self, index: usize) -> Result<f32, SimError> {
        self.entry(index).map(|e| e.radius)
    }

    pub fn color_of(&self, index: usize) -> Result<Color, SimError> {
        self.entry(index).map(|e| e.color)
    }

    /// True for the largest size, which vanishes instead of growing
    #[inline]
    pub fn is_terminal(&self, index: usize) -> bool {
        index + 1 == self.entries.len()
    }

    /// Number of sizes eligible for a new pending piece
    pub fn spawn_pool(&self, pool: usize) -> usize {
        pool.min(self.entries.len())
    }

    pub fn entries(&self) -> &[LadderEntry] {
        &self.entries
    }
}

impl Default for SizeLadder {
    fn default() -> Self {
        Self::classic()
    }
}
