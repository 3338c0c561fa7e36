//! GPU frame surface: converts planar 4:2:0 frames to displayed
//! color.
//!
//! Owns a wgpu device/queue/surface and a single fixed pipeline: a
//! full-screen quad sampling three single-channel plane textures,
//! with the BT.601 limited-range YUV→RGB conversion in the fragment
//! stage (same constants as [`convert`](crate::convert), bit for
//! bit). Knows nothing about networking or timing.
//!
//! Plane textures exist iff geometry has been announced; rendering
//! before [`initialize`](FrameSurface::initialize) is a no-op, and a
//! geometry change tears the old textures down and rebuilds, never
//! an in-place resize.

use tracing::{debug, info, warn};

use crate::error::LumaError;
use crate::frame::YuvFrame;
use crate::geometry::Geometry;
use crate::scheduler::FrameSink;

// ── Quad geometry ────────────────────────────────────────────────

/// Full-screen quad as a four-vertex triangle strip.
const QUAD_POSITIONS: &[f32] = &[
    1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, //
    1.0, -1.0, 0.0, //
    -1.0, -1.0, 0.0,
];

/// UV mapping paired with `QUAD_POSITIONS` (v grows downward).
const QUAD_UVS: &[f32] = &[
    1.0, 0.0, //
    0.0, 0.0, //
    1.0, 1.0, //
    0.0, 1.0,
];

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const UV_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

// ── Shader ───────────────────────────────────────────────────────

/// The conversion constants are fixed for visual parity; keep them in
/// sync with `convert.rs`.
const YUV_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) tex_coord: vec2<f32>,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 1.0);
    out.tex_coord = tex_coord;
    return out;
}

@group(0) @binding(0) var plane_y: texture_2d<f32>;
@group(0) @binding(1) var plane_u: texture_2d<f32>;
@group(0) @binding(2) var plane_v: texture_2d<f32>;
@group(0) @binding(3) var plane_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let y = textureSample(plane_y, plane_sampler, in.tex_coord).r;
    let u = textureSample(plane_u, plane_sampler, in.tex_coord).r;
    let v = textureSample(plane_v, plane_sampler, in.tex_coord).r;
    let fymul = y * 1.1643828125;
    let r = fymul + 1.59602734375 * v - 0.870787598;
    let g = fymul - 0.39176171875 * u - 0.81296875 * v + 0.52959375;
    let b = fymul + 2.01723046875 * u - 1.081389160375;
    return vec4<f32>(r, g, b, 1.0);
}
"#;

// ── Sizing ───────────────────────────────────────────────────────

/// Displayed size for a stream: width capped at `max_width`, height
/// preserving the native aspect ratio.
pub fn fitted_size(geometry: Geometry, max_width: u32) -> (u32, u32) {
    let width = max_width.min(geometry.width());
    let height =
        (width as u64 * geometry.height() as u64 / geometry.width() as u64).max(1) as u32;
    (width, height)
}

// ── FrameSurface ─────────────────────────────────────────────────

fn plane_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Plane textures and their bind group, rebuilt per geometry.
struct PlaneSet {
    geometry: Geometry,
    y: wgpu::Texture,
    u: wgpu::Texture,
    v: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// GPU-resident renderer for one video stream.
pub struct FrameSurface {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    quad_positions: wgpu::Buffer,
    quad_uvs: wgpu::Buffer,
    planes: Option<PlaneSet>,
}

impl FrameSurface {
    /// Build the renderer against an already-created window surface.
    ///
    /// Adapter/device acquisition or pipeline creation failure is
    /// fatal here: there is no degraded mode, and no half-initialized
    /// surface escapes this constructor.
    pub async fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, LumaError> {
        use wgpu::util::DeviceExt;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| LumaError::GpuUnavailable(format!("no suitable adapter: {e}")))?;

        info!(adapter = %adapter.get_info().name, "using GPU adapter");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| LumaError::GpuUnavailable(format!("device request failed: {e}")))?;

        // The shader emits gamma-encoded values already (BT.601 full
        // conversion); an sRGB target would encode them twice.
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .unwrap_or(capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            // Fifo blocks presentation at the display refresh rate:
            // the render loop is capped at vsync, never faster.
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Plane Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        // Shader compile / link problems must fail construction, not
        // surface later as a broken draw.
        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("YUV Shader"),
            source: wgpu::ShaderSource::Wgsl(YUV_SHADER.into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Plane Bind Group Layout"),
                entries: &[
                    plane_texture_entry(0),
                    plane_texture_entry(1),
                    plane_texture_entry(2),
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("YUV Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("YUV Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: 3 * 4,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &POSITION_ATTRS,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: 2 * 4,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &UV_ATTRS,
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let quad_positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Positions"),
            contents: bytemuck::cast_slice(QUAD_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_uvs = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad UVs"),
            contents: bytemuck::cast_slice(QUAD_UVS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        if let Some(e) = error_scope.pop().await {
            return Err(LumaError::SurfaceInit(e.to_string()));
        }

        Ok(Self {
            device,
            queue,
            surface,
            config,
            pipeline,
            bind_group_layout,
            sampler,
            quad_positions,
            quad_uvs,
            planes: None,
        })
    }

    /// The geometry the plane textures are currently sized for.
    pub fn geometry(&self) -> Option<Geometry> {
        self.planes.as_ref().map(|p| p.geometry)
    }

    /// (Re)build the plane textures for a stream geometry.
    ///
    /// Safe to call again on geometry change: prior resources are
    /// released first. The surface itself is resized separately via
    /// [`resize`](Self::resize) / [`set_viewport`](Self::set_viewport).
    pub fn initialize(&mut self, geometry: Geometry) {
        // Release old planes before allocating new ones.
        self.planes = None;

        let y = self.plane_texture("Plane Y", geometry.width(), geometry.height());
        let u = self.plane_texture("Plane U", geometry.chroma_width(), geometry.chroma_height());
        let v = self.plane_texture("Plane V", geometry.chroma_width(), geometry.chroma_height());

        let y_view = y.create_view(&wgpu::TextureViewDescriptor::default());
        let u_view = u.create_view(&wgpu::TextureViewDescriptor::default());
        let v_view = v.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Plane Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&y_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&u_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&v_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        info!(%geometry, "frame surface initialized");
        self.planes = Some(PlaneSet {
            geometry,
            y,
            u,
            v,
            bind_group,
        });
    }

    /// Upload one frame's planes and draw the quad.
    ///
    /// A call before [`initialize`](Self::initialize) is a no-op, not
    /// an error. Transient surface losses (resize races, occlusion)
    /// skip the frame; the next good frame simply renders.
    pub fn render(&mut self, frame: &YuvFrame) -> Result<(), LumaError> {
        let Some(planes) = &self.planes else {
            debug!("render before initialize ignored");
            return Ok(());
        };

        // The queue is reset on geometry change, so this only fires
        // if a stale frame slipped past a reconfigure.
        if frame.geometry() != planes.geometry {
            debug!(
                frame = %frame.geometry(),
                surface = %planes.geometry,
                "stale-geometry frame skipped"
            );
            return Ok(());
        }

        let geometry = planes.geometry;
        self.upload_plane(&planes.y, frame.y(), geometry.width(), geometry.height());
        self.upload_plane(
            &planes.u,
            frame.u(),
            geometry.chroma_width(),
            geometry.chroma_height(),
        );
        self.upload_plane(
            &planes.v,
            frame.v(),
            geometry.chroma_width(),
            geometry.chroma_height(),
        );

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(e) => return Err(LumaError::GpuUnavailable(e.to_string())),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &planes.bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_positions.slice(..));
            pass.set_vertex_buffer(1, self.quad_uvs.slice(..));
            pass.draw(0..4, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Recompute the displayed size as `min(max_width, native)` wide
    /// with aspect-preserving height, and reconfigure the swapchain.
    /// Plane textures are untouched. Returns the new size so the host
    /// can match its window, or `None` before geometry is known.
    pub fn resize(&mut self, max_width: u32) -> Option<(u32, u32)> {
        let geometry = self.geometry()?;
        let (width, height) = fitted_size(geometry, max_width);
        self.set_viewport(width, height);
        Some((width, height))
    }

    /// Track a host window size change. Swapchain only.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        debug!(width, height, "surface viewport reconfigured");
    }

    /// Clear the output and release plane resources. Idempotent.
    pub fn teardown(&mut self) {
        self.planes = None;

        // Best-effort clear; a lost surface during shutdown is fine.
        if let Ok(output) = self.surface.get_current_texture() {
            let view = output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Teardown Encoder"),
                });
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Teardown Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.queue.submit(std::iter::once(encoder.finish()));
            output.present();
        }
    }

    fn plane_texture(&self, label: &str, width: u32, height: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn upload_plane(&self, texture: &wgpu::Texture, data: &[u8], width: u32, height: u32) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

impl FrameSink for FrameSurface {
    /// Per-frame draw failures are contained here: logged, never
    /// propagated past the sink boundary.
    fn render(&mut self, frame: &YuvFrame) {
        if let Err(e) = FrameSurface::render(self, frame) {
            warn!(error = %e, "frame render failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitted_size_caps_at_max_width() {
        let g = Geometry::new(640, 480).unwrap();
        assert_eq!(fitted_size(g, 320), (320, 240));
    }

    #[test]
    fn fitted_size_never_upscales() {
        let g = Geometry::new(320, 240).unwrap();
        assert_eq!(fitted_size(g, 1920), (320, 240));
    }

    #[test]
    fn fitted_size_preserves_aspect() {
        let g = Geometry::new(1920, 1080).unwrap();
        assert_eq!(fitted_size(g, 960), (960, 540));
    }

    #[test]
    fn fitted_size_height_floor_is_one() {
        let g = Geometry::new(1000, 2).unwrap();
        let (_, h) = fitted_size(g, 100);
        assert!(h >= 1);
    }

    #[test]
    fn quad_buffers_pair_up() {
        assert_eq!(QUAD_POSITIONS.len(), 4 * 3);
        assert_eq!(QUAD_UVS.len(), 4 * 2);
    }
}
