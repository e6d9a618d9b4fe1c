//! End-to-end pipeline tests over the dummy backend.
//!
//! Exercises the full flow the viewer runs per session: decode an STL
//! stream, negotiate a configuration from backend capability snapshots,
//! realize it, upload the mesh, draw, resize and recreate, then tear down.

use stlview_core::stl::decode_stl_bytes;
use stlview_graphics::backend::dummy::DummyBackend;
use stlview_graphics::{
    Extent2d, GpuBackend, GpuMesh, SwapchainManager, SwapchainState,
};

/// Build a binary STL stream with the given triangle count, each triangle a
/// unit step apart on the Z axis.
fn build_stl(triangles: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 80];
    bytes.extend_from_slice(&triangles.to_le_bytes());
    for i in 0..triangles {
        bytes.extend_from_slice(&[0u8; 12]);
        let z = i as f32;
        for position in [[0.0, 0.0, z], [1.0, 0.0, z], [0.0, 1.0, z]] {
            for component in position {
                bytes.extend_from_slice(&f32::to_le_bytes(component));
            }
        }
        bytes.extend_from_slice(&[0u8; 2]);
    }
    bytes
}

#[test]
fn full_session_over_dummy_backend() {
    let backend = DummyBackend::new();

    // Decode.
    let mesh_data = decode_stl_bytes(&build_stl(4)).unwrap();
    assert_eq!(mesh_data.vertex_count(), 12);

    // Negotiate and realize.
    let adapters = backend.adapter_caps().unwrap();
    let mut swapchain = SwapchainManager::new();
    let config = swapchain
        .configure(&adapters, Extent2d::new(800, 600))
        .unwrap()
        .clone();
    backend.realize_swapchain(&config).unwrap();
    assert_eq!(backend.realized_config(), Some(config.clone()));

    // Upload and draw.
    let mesh = GpuMesh::upload(&backend, &mesh_data).unwrap();
    mesh.draw(&backend, [0.0, 0.0, 0.0, 1.0]).unwrap();
    mesh.draw(&backend, [0.0, 0.0, 0.0, 1.0]).unwrap();
    assert_eq!(backend.counters().draws_submitted(), 2);
    assert_eq!(backend.counters().frames_presented(), 2);
    assert_eq!(backend.counters().buffers_live(), 2);

    // Resize: stale, recreate against fresh caps, realize again.
    swapchain.note_extent(1024, 768);
    assert!(swapchain.is_stale());
    let caps = backend.surface_caps(config.adapter_index).unwrap();
    let recreated = swapchain
        .recreate(&caps, Extent2d::new(1024, 768))
        .unwrap()
        .clone();
    assert_eq!(recreated.extent, Extent2d::new(1024, 768));
    assert_eq!(recreated.queue_family_index, config.queue_family_index);
    assert_eq!(recreated.format, config.format);
    backend.realize_swapchain(&recreated).unwrap();

    mesh.draw(&backend, [0.0, 0.0, 0.0, 1.0]).unwrap();
    assert_eq!(backend.counters().draws_submitted(), 3);

    // Teardown.
    swapchain.destroy();
    backend.release_swapchain();
    assert_eq!(swapchain.state(), SwapchainState::Destroyed);
    assert_eq!(backend.realized_config(), None);

    drop(mesh);
    assert_eq!(backend.counters().buffers_live(), 0);
}

#[test]
fn truncated_stream_still_renders_complete_triangles() {
    let backend = DummyBackend::new();

    let mut bytes = build_stl(3);
    bytes.truncate(84 + 2 * 50 + 17);
    let mesh_data = decode_stl_bytes(&bytes).unwrap();
    assert_eq!(mesh_data.triangle_count(), 2);

    let mesh = GpuMesh::upload(&backend, &mesh_data).unwrap();
    assert_eq!(mesh.index_count(), 6);
    mesh.draw(&backend, [0.0, 0.0, 0.0, 1.0]).unwrap();
    assert_eq!(backend.counters().draws_submitted(), 1);
}
