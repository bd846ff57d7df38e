//! wgpu render backend for heightmap terrain.
//!
//! Draws a [`TerrainMesh`](heightfield_mesh::TerrainMesh) as one indexed
//! triangle strip per scanline pair, viewed through a fly camera driven by
//! WASD + mouse look.
//!
//! # Invariants
//! - The renderer never mutates the mesh; re-uploading is explicit.
//! - Camera motion is frame-rate independent (scaled by frame delta).

mod camera;
mod gpu;
mod shaders;

pub use camera::FlyCamera;
pub use gpu::{RenderError, TerrainRenderer};
