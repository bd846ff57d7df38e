use serde::{Deserialize, Serialize};

/// Maps a pixel intensity (0..=255) onto a world-space elevation.
///
/// `elevation = intensity * scale + shift`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub scale: f32,
    pub shift: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            scale: 64.0 / 256.0,
            shift: -16.0,
        }
    }
}

impl TerrainParams {
    pub fn new(scale: f32, shift: f32) -> Self {
        Self { scale, shift }
    }

    /// Elevation for a single intensity sample.
    pub fn elevation(&self, intensity: f32) -> f32 {
        intensity * self.scale + self.shift
    }
}
