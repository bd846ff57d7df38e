//! Terrain mesh construction from a heightmap.
//!
//! Every pixel becomes one vertex. Consecutive scanline pairs become one
//! triangle strip each, so a `w x h` heightmap yields `h - 1` strips of
//! `2 * w` indices.
//!
//! # Invariants
//! - Every index refers to an existing vertex.
//! - Strips are disjoint, consecutive ranges that cover the index buffer.

mod bounds;
mod terrain;

pub use bounds::Bounds;
pub use terrain::TerrainMesh;

pub fn crate_info() -> &'static str {
    "heightfield-mesh v0.1.0"
}
