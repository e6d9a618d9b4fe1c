//! Viewer application and event loop.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use stlview_core::mesh::{generators, MeshData};
use stlview_core::stl;
use stlview_graphics::{
    create_backend, Extent2d, GpuBackend, GpuMesh, GraphicsError, SwapchainManager,
};

use crate::args::ViewerArgs;

/// Background color of the viewport.
const CLEAR_COLOR: [f32; 4] = [0.06, 0.06, 0.09, 1.0];

/// Graphics state created once the window exists.
struct GfxContext {
    backend: Arc<dyn GpuBackend>,
    swapchain: SwapchainManager,
    mesh: GpuMesh,
    adapter_index: usize,
    requested: Extent2d,
}

/// The viewer application.
pub struct ViewerApp {
    args: ViewerArgs,
    window: Option<Window>,
    gfx: Option<GfxContext>,
    frame_number: u64,
}

/// Run the viewer until the window closes or the frame limit is reached.
pub fn run(args: ViewerArgs) {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut app = ViewerApp {
        args,
        window: None,
        gfx: None,
        frame_number: 0,
    };
    event_loop.run_app(&mut app).expect("Event loop error");
}

impl ViewerApp {
    /// Load the mesh named on the command line, or the built-in cube.
    fn load_mesh(&self) -> Option<MeshData> {
        match &self.args.model {
            Some(path) => match stl::load_stl(path) {
                Ok(mesh) => Some(mesh),
                Err(e) => {
                    log::error!("Failed to load {}: {}", path.display(), e);
                    None
                }
            },
            None => Some(generators::generate_cube(0.5)),
        }
    }

    /// Create the backend, negotiate a configuration and upload the mesh.
    fn init_graphics(&mut self) -> bool {
        let window = match &self.window {
            Some(w) => w,
            None => {
                log::error!("No window available for graphics init");
                return false;
            }
        };

        let params = self.args.instance_parameters();
        let backend = match create_backend(&params, Some(window)) {
            Ok(b) => b,
            Err(e) => {
                log::error!("Failed to create graphics backend: {}", e);
                return false;
            }
        };
        log::info!("Using GPU backend: {}", backend.name());

        let adapters = match backend.adapter_caps() {
            Ok(a) => a,
            Err(e) => {
                log::error!("Failed to query adapter capabilities: {}", e);
                return false;
            }
        };

        let size = window.inner_size();
        let requested = Extent2d::new(size.width.max(1), size.height.max(1));

        let mut swapchain = SwapchainManager::new();
        let config = match swapchain.configure(&adapters, requested) {
            Ok(config) => config.clone(),
            Err(e) => {
                log::error!("Device negotiation failed: {}", e);
                return false;
            }
        };
        if let Err(e) = backend.realize_swapchain(&config) {
            log::error!("Failed to realize swapchain: {}", e);
            return false;
        }

        let mesh_data = match self.load_mesh() {
            Some(data) => data,
            None => return false,
        };
        if let Some(bounds) = mesh_data.bounds() {
            let size = bounds.size();
            log::info!(
                "Model '{}': {} triangles, size {:.2} x {:.2} x {:.2}",
                mesh_data.label().unwrap_or("unnamed"),
                mesh_data.triangle_count(),
                size[0],
                size[1],
                size[2]
            );
        }

        let mesh = match GpuMesh::upload(backend.as_ref(), &mesh_data) {
            Ok(mesh) => mesh,
            Err(e) => {
                log::error!("Failed to upload mesh: {}", e);
                return false;
            }
        };

        self.gfx = Some(GfxContext {
            backend,
            swapchain,
            mesh,
            adapter_index: config.adapter_index,
            requested,
        });
        true
    }

    /// Recreate a stale swapchain, then draw one frame.
    fn render_frame(&mut self) -> Result<(), GraphicsError> {
        let gfx = match &mut self.gfx {
            Some(g) => g,
            None => return Ok(()),
        };

        if gfx.swapchain.is_stale() {
            let caps = gfx.backend.surface_caps(gfx.adapter_index)?;
            let config = gfx.swapchain.recreate(&caps, gfx.requested)?.clone();
            gfx.backend.realize_swapchain(&config)?;
        }

        gfx.mesh.draw(gfx.backend.as_ref(), CLEAR_COLOR)?;
        self.frame_number += 1;
        Ok(())
    }

    /// Release presentation resources in reverse order of creation.
    fn shutdown(&mut self) {
        if let Some(gfx) = &mut self.gfx {
            gfx.swapchain.destroy();
            gfx.backend.release_swapchain();
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("STL Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.args.width,
                self.args.height,
            ));

        match event_loop.create_window(attributes) {
            Ok(window) => {
                log::info!("Window created");
                self.window = Some(window);
                if !self.init_graphics() {
                    log::error!("Failed to initialize graphics");
                    event_loop.exit();
                }
            }
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.shutdown();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Some(gfx) = &mut self.gfx {
                    gfx.requested = Extent2d::new(size.width, size.height);
                    gfx.swapchain.note_extent(size.width, size.height);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render_frame() {
                    log::warn!("Frame failed: {}", e);
                }

                if let Some(max_frames) = self.args.max_frames {
                    if self.frame_number >= max_frames {
                        log::info!("Reached max frames limit ({}), exiting", max_frames);
                        self.shutdown();
                        event_loop.exit();
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
