use crate::bounds::Bounds;
use glam::Vec3;
use heightfield_common::TerrainParams;
use heightfield_heightmap::Heightmap;
use std::ops::Range;

/// CPU-side terrain mesh laid out as one triangle strip per scanline pair.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    strip_count: u32,
    vertices_per_strip: u32,
    bounds: Bounds,
}

impl TerrainMesh {
    /// Build the mesh for `heightmap`.
    ///
    /// Pixel `(i, j)` (row, column) becomes vertex `i * w + j` at
    /// `(j - w/2, sample * scale + shift, i - h/2)`, centring the grid on the origin.
    pub fn build(heightmap: &Heightmap, params: &TerrainParams) -> Self {
        let w = heightmap.width();
        let h = heightmap.height();
        let half_w = w as f32 / 2.0;
        let half_h = h as f32 / 2.0;

        let mut positions = Vec::with_capacity(w as usize * h as usize);
        for i in 0..h {
            for j in 0..w {
                positions.push(Vec3::new(
                    j as f32 - half_w,
                    params.elevation(heightmap.sample(i, j)),
                    i as f32 - half_h,
                ));
            }
        }

        let strip_count = h - 1;
        let vertices_per_strip = 2 * w;
        let mut indices = Vec::with_capacity(strip_count as usize * vertices_per_strip as usize);
        for i in 0..strip_count {
            for j in 0..w {
                for k in 0..2 {
                    indices.push(j + w * (i + k));
                }
            }
        }

        let normals = grid_normals(&positions, w as usize, h as usize);
        let bounds = Bounds::from_points(&positions).unwrap_or(Bounds {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        });

        tracing::debug!(
            "built terrain mesh: {} vertices, {} strips x {} indices",
            positions.len(),
            strip_count,
            vertices_per_strip
        );

        Self {
            positions,
            normals,
            indices,
            strip_count,
            vertices_per_strip,
            bounds,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Unit surface normals, one per vertex.
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn strip_count(&self) -> u32 {
        self.strip_count
    }

    pub fn vertices_per_strip(&self) -> u32 {
        self.vertices_per_strip
    }

    /// Triangles implied by the strips (each strip of `n` indices forms `n - 2`).
    pub fn triangle_count(&self) -> u32 {
        self.strip_count * (self.vertices_per_strip - 2)
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Lowest and highest elevation.
    pub fn height_range(&self) -> (f32, f32) {
        (self.bounds.min.y, self.bounds.max.y)
    }

    /// Index buffer range of one strip.
    ///
    /// Panics if `strip >= strip_count()`.
    pub fn strip_range(&self, strip: u32) -> Range<u32> {
        assert!(
            strip < self.strip_count,
            "strip {strip} out of range ({} strips)",
            self.strip_count
        );
        let start = strip * self.vertices_per_strip;
        start..start + self.vertices_per_strip
    }

    pub fn strip_ranges(&self) -> impl Iterator<Item = Range<u32>> + '_ {
        (0..self.strip_count).map(|s| self.strip_range(s))
    }
}

/// Per-vertex normals from height gradients: central differences inside the
/// grid, one-sided differences on the border.
fn grid_normals(positions: &[Vec3], w: usize, h: usize) -> Vec<Vec3> {
    let y = |row: usize, col: usize| positions[row * w + col].y;
    let gradient = |lo: f32, hi: f32, span: usize| (hi - lo) / span as f32;

    let mut normals = Vec::with_capacity(positions.len());
    for row in 0..h {
        for col in 0..w {
            let (left, right) = (col.saturating_sub(1), (col + 1).min(w - 1));
            let (up, down) = (row.saturating_sub(1), (row + 1).min(h - 1));
            let dx = gradient(y(row, left), y(row, right), right - left);
            let dz = gradient(y(up, col), y(down, col), down - up);
            normals.push(Vec3::new(-dx, 1.0, -dz).normalize());
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(w: u32, h: u32, value: f32) -> Heightmap {
        Heightmap::from_samples(w, h, vec![value; (w * h) as usize]).unwrap()
    }

    #[test]
    fn vertex_positions_follow_grid() {
        let hm = Heightmap::from_samples(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let mesh = TerrainMesh::build(&hm, &TerrainParams::new(2.0, 10.0));

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.positions()[0], Vec3::new(-1.5, 10.0, -1.0));
        assert_eq!(mesh.positions()[2], Vec3::new(0.5, 14.0, -1.0));
        assert_eq!(mesh.positions()[4], Vec3::new(-0.5, 18.0, 0.0));
    }

    #[test]
    fn strip_indices_interleave_scanlines() {
        let mesh = TerrainMesh::build(&flat(3, 3, 0.0), &TerrainParams::default());
        assert_eq!(mesh.strip_count(), 2);
        assert_eq!(mesh.vertices_per_strip(), 6);
        assert_eq!(mesh.indices(), &[0, 3, 1, 4, 2, 5, 3, 6, 4, 7, 5, 8]);
    }

    #[test]
    fn strip_ranges_cover_index_buffer() {
        let mesh = TerrainMesh::build(&flat(5, 4, 0.0), &TerrainParams::default());
        let ranges: Vec<_> = mesh.strip_ranges().collect();
        assert_eq!(ranges, vec![0..10, 10..20, 20..30]);
        assert_eq!(ranges.last().unwrap().end as usize, mesh.indices().len());
    }

    #[test]
    #[should_panic]
    fn strip_range_out_of_bounds() {
        let mesh = TerrainMesh::build(&flat(2, 2, 0.0), &TerrainParams::default());
        mesh.strip_range(1);
    }

    #[test]
    fn triangle_count() {
        let mesh = TerrainMesh::build(&flat(4, 3, 0.0), &TerrainParams::default());
        // 2 strips of 8 indices, 6 triangles each
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn flat_terrain_normals_point_up() {
        let mesh = TerrainMesh::build(&flat(4, 4, 100.0), &TerrainParams::default());
        assert!(mesh.normals().iter().all(|n| *n == Vec3::Y));
    }

    #[test]
    fn slope_normals_lean_downhill() {
        // height rises with the column, so normals lean toward -X
        let hm = Heightmap::from_samples(3, 2, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]).unwrap();
        let mesh = TerrainMesh::build(&hm, &TerrainParams::new(1.0, 0.0));
        for n in mesh.normals() {
            assert!(n.x < 0.0);
            assert!(n.z.abs() < 1e-6);
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn bounds_and_height_range() {
        let hm = Heightmap::from_samples(2, 2, vec![0.0, 255.0, 128.0, 64.0]).unwrap();
        let mesh = TerrainMesh::build(&hm, &TerrainParams::default());
        assert_eq!(mesh.height_range(), (-16.0, 47.75));
        assert_eq!(mesh.bounds().min.x, -1.0);
        assert_eq!(mesh.bounds().max.x, 0.0);
    }
}
