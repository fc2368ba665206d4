// renderer.rs — 核心渲染器 (内表面全景球 + 标注叠加层 + egui)

use image::{imageops::FilterType, GenericImage, Rgba, RgbaImage};
use panorama_annotator::i18n::tr_with;
use panorama_annotator::mesh::{build_sphere, Mesh};
use panorama_annotator::{OrbitCamera, OverlayItem, ViewerConfig};
use std::borrow::Cow;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const AMBIENT: f32 = 0.45;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    // xyz: light direction, w: ambient
    light_dir: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SphereVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

impl SphereVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct OverlayVertex {
    position: [f32; 3],
    normal: [f32; 3],
    color: [f32; 4],
}

impl OverlayVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn new<V: bytemuck::Pod>(device: &wgpu::Device, label: &str, vertices: &[V], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertices: vertex_buffer,
            indices: index_buffer,
            index_count: indices.len() as u32,
        }
    }

    fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn overlay_vertices(items: &[OverlayItem]) -> (Vec<OverlayVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for item in items {
        let [r, g, b, a] = item.color;
        let color = [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a as f32 / 255.0];
        let base = vertices.len() as u32;
        vertices.extend(
            item.mesh
                .positions
                .iter()
                .zip(&item.mesh.normals)
                .map(|(&position, &normal)| OverlayVertex {
                    position,
                    normal,
                    color,
                }),
        );
        indices.extend(item.mesh.indices.iter().map(|i| base + i));
    }
    (vertices, indices)
}

fn sphere_vertices(mesh: &Mesh) -> Vec<SphereVertex> {
    mesh.positions
        .iter()
        .zip(&mesh.uvs)
        .map(|(&position, &uv)| SphereVertex { position, uv })
        .collect()
}

/// Shrink to the GPU texture limit, then pad to 2:1 when the image is too
/// short. Short images (partial panoramas) sit on the bottom edge.
fn fit_texture_image(img: &RgbaImage, max_dim: u32) -> Cow<'_, RgbaImage> {
    let (src_w, src_h) = img.dimensions();
    let mut out = Cow::Borrowed(img);

    if src_w > max_dim || src_h > max_dim {
        let scale = (max_dim as f32 / src_w.max(src_h) as f32).min(1.0);
        let new_w = ((src_w as f32 * scale) as u32).max(1);
        let new_h = ((src_h as f32 * scale) as u32).max(1);
        log::warn!(
            "{}",
            tr_with(
                "gpu.image_too_large_scaled",
                &[
                    ("src_w", src_w.to_string()),
                    ("src_h", src_h.to_string()),
                    ("max", max_dim.to_string()),
                    ("new_w", new_w.to_string()),
                    ("new_h", new_h.to_string()),
                ]
            )
        );
        out = Cow::Owned(image::imageops::resize(img, new_w, new_h, FilterType::Lanczos3));
    }

    let (w, h) = out.dimensions();
    let target_h = w / 2;
    if target_h > 0 && h < target_h {
        let mut canvas = RgbaImage::from_pixel(w, target_h, Rgba([0, 0, 0, 255]));
        if canvas.copy_from(&*out, 0, target_h - h).is_ok() {
            out = Cow::Owned(canvas);
        }
    }
    out
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    depth_view: wgpu::TextureView,

    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,

    sphere_pipeline: wgpu::RenderPipeline,
    sphere: GpuMesh,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    texture_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,

    overlay_pipeline: wgpu::RenderPipeline,
    overlay: Option<GpuMesh>,

    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}


#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter")]
    NoAdapter,
    #[error("cannot open device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    img: &RgbaImage,
) -> wgpu::BindGroup {
    let (width, height) = img.dimensions();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some("panorama_texture"),
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        img,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("panorama_bind_group"),
    })
}

struct PipelineDesc<'a> {
    label: &'a str,
    shader: &'a wgpu::ShaderModule,
    layout: &'a wgpu::PipelineLayout,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    cull_mode: Option<wgpu::Face>,
    blend: wgpu::BlendState,
}

fn create_pipeline(device: &wgpu::Device, format: wgpu::TextureFormat, desc: PipelineDesc<'_>) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.shader,
            entry_point: "vs_main",
            buffers: desc.buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(desc.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

impl Renderer {
    pub async fn new(window: &Window, viewer: &ViewerConfig) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // the window outlives the renderer: both live in the event loop closure
        let surface = unsafe { instance.create_surface(window) }?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        // --- scene uniform (group 0) ---
        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_uniform"),
            contents: bytemuck::cast_slice(&[SceneUniform {
                view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
                light_dir: [0.0, 0.0, -1.0, AMBIENT],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let scene_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("scene_bind_group_layout"),
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
            label: Some("scene_bind_group"),
        });

        // --- panorama texture (group 1) ---
        let texture_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("texture_bind_group_layout"),
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        // grey until a panorama arrives
        let placeholder = RgbaImage::from_pixel(2, 1, Rgba([40, 40, 40, 255]));
        let texture_bind_group = upload_texture(&device, &queue, &texture_bind_group_layout, &sampler, &placeholder);

        let sphere_mesh = build_sphere(
            viewer.sphere.radius,
            viewer.sphere.width_segments,
            viewer.sphere.height_segments,
        );
        let sphere = GpuMesh::new(&device, "panorama_sphere", &sphere_vertices(&sphere_mesh), &sphere_mesh.indices);

        // --- pipelines ---
        let panorama_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/panorama.wgsl"));
        let overlay_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/overlay.wgsl"));

        let sphere_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sphere_pipeline_layout"),
            bind_group_layouts: &[&scene_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });
        let overlay_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay_pipeline_layout"),
            bind_group_layouts: &[&scene_bind_group_layout],
            push_constant_ranges: &[],
        });

        let sphere_pipeline = create_pipeline(
            &device,
            config.format,
            PipelineDesc {
                label: "sphere_pipeline",
                shader: &panorama_shader,
                layout: &sphere_layout,
                buffers: &[SphereVertex::layout()],
                // seen from inside; no culling keeps either winding visible
                cull_mode: None,
                blend: wgpu::BlendState::REPLACE,
            },
        );
        let overlay_pipeline = create_pipeline(
            &device,
            config.format,
            PipelineDesc {
                label: "overlay_pipeline",
                shader: &overlay_shader,
                layout: &overlay_layout,
                buffers: &[OverlayVertex::layout()],
                cull_mode: Some(wgpu::Face::Back),
                blend: wgpu::BlendState::ALPHA_BLENDING,
            },
        );

        // --- egui ---
        let egui_ctx = egui::Context::default();
        crate::fonts::install(&egui_ctx);
        let mut egui_state = egui_winit::State::new(window);
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth_view,
            scene_buffer,
            scene_bind_group,
            sphere_pipeline,
            sphere,
            texture_bind_group_layout,
            texture_bind_group,
            sampler,
            overlay_pipeline,
            overlay: None,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    pub fn update_camera(&mut self, camera: &OrbitCamera) {
        // light from just above the eye so tube tops catch it
        let light = (camera.forward() - glam::Vec3::Y * 0.3).normalize_or_zero();
        let uniform = SceneUniform {
            view_proj: camera.view_projection(self.aspect()).to_cols_array_2d(),
            light_dir: [light.x, light.y, light.z, AMBIENT],
        };
        self.queue.write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Replace the overlay geometry. An empty list clears it.
    pub fn upload_overlay(&mut self, items: &[OverlayItem]) {
        let (vertices, indices) = overlay_vertices(items);
        self.overlay = if indices.is_empty() {
            None
        } else {
            Some(GpuMesh::new(&self.device, "overlay", &vertices, &indices))
        };
        log::debug!("overlay: {} item(s), {} triangle(s)", items.len(), indices.len() / 3);
    }

    pub fn load_panorama(&mut self, img: &RgbaImage) {
        let max_dim = self.device.limits().max_texture_dimension_2d;
        let fitted = fit_texture_image(img, max_dim);
        self.texture_bind_group = upload_texture(
            &self.device,
            &self.queue,
            &self.texture_bind_group_layout,
            &self.sampler,
            &fitted,
        );
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // 1. panorama sphere, then annotations in front of it
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            pass.set_bind_group(0, &self.scene_bind_group, &[]);

            pass.set_pipeline(&self.sphere_pipeline);
            pass.set_bind_group(1, &self.texture_bind_group, &[]);
            self.sphere.draw(&mut pass);

            if let Some(overlay) = &self.overlay {
                pass.set_pipeline(&self.overlay_pipeline);
                overlay.draw(&mut pass);
            }
        }

        // 2. UI
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);

        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);

        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer.render(&mut pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_annotator::mesh::build_marker;

    #[test]
    fn short_images_are_padded_to_two_to_one() {
        let img = RgbaImage::from_pixel(8, 2, Rgba([255, 0, 0, 255]));
        let fitted = fit_texture_image(&img, 4096);
        assert_eq!(fitted.dimensions(), (8, 4));
        assert_eq!(fitted.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(fitted.get_pixel(0, 3), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn oversized_images_shrink_to_the_limit() {
        let img = RgbaImage::new(64, 32);
        let fitted = fit_texture_image(&img, 16);
        assert_eq!(fitted.dimensions(), (16, 8));
        assert!(matches!(fit_texture_image(&img, 64), Cow::Borrowed(_)));
    }

    #[test]
    fn overlay_items_share_one_buffer() {
        let a = build_marker(glam::Vec3::ZERO, 1.0);
        let b = build_marker(glam::Vec3::X, 1.0);
        let items = [
            OverlayItem {
                mesh: a.clone(),
                color: [255, 255, 255, 255],
            },
            OverlayItem {
                mesh: b.clone(),
                color: [0, 0, 0, 128],
            },
        ];
        let (vertices, indices) = overlay_vertices(&items);
        assert_eq!(vertices.len(), a.vertex_count() + b.vertex_count());
        assert_eq!(indices.len(), a.indices.len() + b.indices.len());
        let max = *indices.iter().max().unwrap() as usize;
        assert_eq!(max, vertices.len() - 1);
        assert_eq!(vertices[0].color, [1.0, 1.0, 1.0, 1.0]);
        assert!((vertices.last().unwrap().color[3] - 128.0 / 255.0).abs() < 1e-6);
    }
}
