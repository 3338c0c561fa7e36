//! Windowed host for the frame pipeline.
//!
//! The winit event loop is the per-frame timing primitive here: a
//! `Wake` from the ingestor requests a redraw, each `RedrawRequested`
//! runs exactly one scheduler tick, and the tick re-requests a redraw
//! while the queue stays active. Presentation uses Fifo (vsync), so
//! the loop is naturally capped at the display refresh rate and never
//! spins while idle, the closest native analogue of
//! `requestAnimationFrame`.

use std::sync::Arc;

use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use luma_core::{FrameQueue, FrameSurface, RenderScheduler, StreamEvent};

use crate::config::DisplayConfig;

/// Placeholder window size shown until geometry is announced.
const PENDING_SIZE: (u32, u32) = (640, 360);

/// winit application: owns the surface and drives the scheduler.
pub struct ViewerApp {
    display: DisplayConfig,
    scheduler: RenderScheduler,
    window: Option<Arc<Window>>,
    surface: Option<FrameSurface>,
}

impl ViewerApp {
    pub fn new(display: DisplayConfig, queue: Arc<FrameQueue>) -> Self {
        Self {
            display,
            scheduler: RenderScheduler::new(queue),
            window: None,
            surface: None,
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<StreamEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(&self.display.title)
            .with_inner_size(LogicalSize::new(PENDING_SIZE.0, PENDING_SIZE.1));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!(error = %e, "window creation failed");
                event_loop.exit();
                return;
            }
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = match instance.create_surface(Arc::clone(&window)) {
            Ok(surface) => surface,
            Err(e) => {
                error!(error = %e, "surface creation failed");
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        match pollster::block_on(FrameSurface::new(
            &instance,
            surface,
            size.width,
            size.height,
        )) {
            Ok(frame_surface) => {
                self.surface = Some(frame_surface);
                self.window = Some(window);
            }
            Err(e) => {
                // Structural failure: no degraded half-initialized
                // rendering, just stop.
                error!(error = %e, "renderer initialization failed");
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: StreamEvent) {
        match event {
            StreamEvent::Configure(geometry) => {
                let Some(surface) = self.surface.as_mut() else {
                    return;
                };
                surface.initialize(geometry);

                if let Some((width, height)) = surface.resize(self.display.max_width) {
                    if let Some(window) = &self.window {
                        let _ = window.request_inner_size(LogicalSize::new(width, height));
                    }
                }
            }
            StreamEvent::Wake => {
                // Idle -> Running: rearm the redraw loop.
                self.request_redraw();
            }
            StreamEvent::Closed(reason) => {
                match reason {
                    Some(reason) => warn!(reason, "stream closed"),
                    None => info!("stream ended"),
                }
                if let Some(surface) = self.surface.as_mut() {
                    surface.teardown();
                }
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.teardown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.set_viewport(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(surface) = self.surface.as_mut() else {
                    return;
                };
                // One frame per redraw; keep the loop running while
                // the queue is active, go quiet once it drains.
                if self.scheduler.tick(surface) {
                    self.request_redraw();
                }
            }
            _ => {}
        }
    }
}
