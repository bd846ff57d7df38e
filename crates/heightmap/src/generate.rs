//! Synthetic heightmaps for demos and tests.

use crate::{Heightmap, HeightmapError};
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Shape of a generated heightmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeightmapKind {
    /// Overlapping sine ridges with seeded phases and frequencies.
    #[default]
    Ridges,
    /// A bowl with a raised rim, centre jittered by the seed.
    Crater,
    /// A linear ramp rising along +X. Ignores the seed.
    Slope,
}

impl fmt::Display for HeightmapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeightmapKind::Ridges => "ridges",
            HeightmapKind::Crater => "crater",
            HeightmapKind::Slope => "slope",
        };
        f.write_str(name)
    }
}

impl FromStr for HeightmapKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ridges" => Ok(HeightmapKind::Ridges),
            "crater" => Ok(HeightmapKind::Crater),
            "slope" => Ok(HeightmapKind::Slope),
            other => Err(format!(
                "unknown heightmap kind '{other}' (expected ridges, crater or slope)"
            )),
        }
    }
}

impl Heightmap {
    /// Generate a synthetic heightmap. The same `seed` always yields the same samples.
    pub fn generate(
        width: u32,
        height: u32,
        seed: u64,
        kind: HeightmapKind,
    ) -> Result<Self, HeightmapError> {
        crate::check_dimensions(width, height)?;
        let mut rng = SplitMix64::new(seed);

        let raw: Vec<f32> = match kind {
            HeightmapKind::Ridges => {
                let waves: Vec<(f32, f32, f32, f32)> = (0..4)
                    .map(|octave| {
                        let freq = (1 << octave) as f32 * (1.0 + rng.next_f32());
                        let angle = rng.next_f32() * TAU;
                        let phase = rng.next_f32() * TAU;
                        let amp = 1.0 / (1 << octave) as f32;
                        (freq, angle, phase, amp)
                    })
                    .collect();
                grid(width, height, |u, v| {
                    waves
                        .iter()
                        .map(|&(freq, angle, phase, amp)| {
                            let t = u * angle.cos() + v * angle.sin();
                            amp * (t * freq * TAU + phase).sin()
                        })
                        .sum()
                })
            }
            HeightmapKind::Crater => {
                let cx = 0.4 + rng.next_f32() * 0.2;
                let cz = 0.4 + rng.next_f32() * 0.2;
                grid(width, height, |u, v| {
                    let r = ((u - cx).powi(2) + (v - cz).powi(2)).sqrt();
                    let rim = (-((r - 0.3) / 0.08).powi(2)).exp();
                    let bowl = if r < 0.3 { -(1.0 - r / 0.3) * 0.6 } else { 0.0 };
                    rim + bowl
                })
            }
            HeightmapKind::Slope => grid(width, height, |u, _| u),
        };

        tracing::debug!("generated {kind} heightmap {width}x{height} (seed {seed})");
        Self::from_samples(width, height, normalize(raw))
    }
}

/// Evaluate `f` at normalised grid coordinates in row-major order.
fn grid(width: u32, height: u32, f: impl Fn(f32, f32) -> f32) -> Vec<f32> {
    let du = 1.0 / (width - 1) as f32;
    let dv = 1.0 / (height - 1) as f32;
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height {
        for col in 0..width {
            out.push(f(col as f32 * du, row as f32 * dv));
        }
    }
    out
}

/// Stretch values onto 0..=255. A flat input maps to 0.
fn normalize(mut values: Vec<f32>) -> Vec<f32> {
    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    for v in &mut values {
        *v = if range > f32::EPSILON {
            ((*v - lo) / range * 255.0).round()
        } else {
            0.0
        };
    }
    values
}

/// SplitMix64 generator, enough for reproducible wave parameters.
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}
