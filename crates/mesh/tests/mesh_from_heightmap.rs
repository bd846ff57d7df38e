use heightfield_common::TerrainParams;
use heightfield_heightmap::{Heightmap, HeightmapKind};
use heightfield_mesh::TerrainMesh;

#[test]
fn every_index_is_in_range() {
    let hm = Heightmap::generate(37, 23, 11, HeightmapKind::Ridges).unwrap();
    let mesh = TerrainMesh::build(&hm, &TerrainParams::default());

    assert_eq!(mesh.vertex_count(), 37 * 23);
    assert_eq!(mesh.indices().len(), 22 * 74);
    assert!(
        mesh.indices()
            .iter()
            .all(|&i| (i as usize) < mesh.vertex_count())
    );
}

#[test]
fn each_strip_pairs_adjacent_scanlines() {
    let hm = Heightmap::generate(8, 6, 0, HeightmapKind::Crater).unwrap();
    let mesh = TerrainMesh::build(&hm, &TerrainParams::default());
    let w = hm.width();

    for (strip, range) in mesh.strip_ranges().enumerate() {
        let strip = strip as u32;
        let indices = &mesh.indices()[range.start as usize..range.end as usize];
        for (col, pair) in indices.chunks_exact(2).enumerate() {
            let col = col as u32;
            assert_eq!(pair[0], strip * w + col);
            assert_eq!(pair[1], (strip + 1) * w + col);
        }
    }
}

#[test]
fn elevations_follow_params() {
    let hm = Heightmap::generate(16, 16, 5, HeightmapKind::Slope).unwrap();
    let params = TerrainParams::new(0.5, 3.0);
    let mesh = TerrainMesh::build(&hm, &params);

    for (pos, sample) in mesh.positions().iter().zip(hm.samples()) {
        assert_eq!(pos.y, sample * 0.5 + 3.0);
    }
    assert_eq!(mesh.height_range(), (3.0, 255.0 * 0.5 + 3.0));
}

#[test]
fn png_round_trip_builds_identical_mesh() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("terrain.png");
    let hm = Heightmap::generate(20, 12, 99, HeightmapKind::Ridges).unwrap();
    hm.save_png(&path).unwrap();

    let loaded = Heightmap::load(&path).unwrap();
    let a = TerrainMesh::build(&hm, &TerrainParams::default());
    let b = TerrainMesh::build(&loaded, &TerrainParams::default());
    assert_eq!(a.positions(), b.positions());
    assert_eq!(a.indices(), b.indices());
}
