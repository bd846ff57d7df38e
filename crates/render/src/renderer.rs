use glam::Vec3;
use heightfield_mesh::{Bounds, TerrainMesh};

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 100.0, 100.0),
            target: Vec3::ZERO,
            fov_degrees: 45.0,
        }
    }
}

impl RenderView {
    /// A view that looks at the centre of `mesh` from above and behind.
    pub fn framing(mesh: &TerrainMesh) -> Self {
        Self::framing_bounds(&mesh.bounds())
    }

    /// A view that looks at the centre of `bounds` from above and behind.
    pub fn framing_bounds(bounds: &Bounds) -> Self {
        let size = bounds.size();
        let reach = size.x.max(size.z).max(1.0);
        let target = bounds.center();
        Self {
            eye: target + Vec3::new(0.0, reach * 0.5 + size.y, reach * 0.75),
            target,
            ..Self::default()
        }
    }
}

/// Renderer-agnostic interface. All renderers implement this trait.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of `mesh` from the given view.
    fn render(&self, mesh: &TerrainMesh, view: &RenderView) -> Self::Output;
}

/// Produces a human-readable summary of a terrain mesh.
///
/// Used by the CLI and in tests where no GPU is available.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, mesh: &TerrainMesh, view: &RenderView) -> String {
        let b = mesh.bounds();
        let mut out = String::new();
        out.push_str("=== Terrain Mesh ===\n");
        out.push_str(&format!("Vertices: {}\n", mesh.vertex_count()));
        out.push_str(&format!("Indices: {}\n", mesh.indices().len()));
        out.push_str(&format!(
            "Strips: {} x {} indices\n",
            mesh.strip_count(),
            mesh.vertices_per_strip()
        ));
        out.push_str(&format!("Triangles: {}\n", mesh.triangle_count()));
        out.push_str(&format!(
            "Bounds: min=({:.2}, {:.2}, {:.2}) max=({:.2}, {:.2}, {:.2})\n",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
        ));
        out.push_str(&format!(
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}\n",
            view.eye.x,
            view.eye.y,
            view.eye.z,
            view.target.x,
            view.target.y,
            view.target.z,
            view.fov_degrees
        ));
        out
    }
}
