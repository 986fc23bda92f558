use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::bytes_of;
use log::{info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::resources::{self, GpuMesh, GpuModel};
use super::shaders;
use super::targets::{DepthBuffer, HdrTarget, PingPong, HDR_FORMAT};
use super::uniforms::{
    aligned_stride, pack_lights, BlurUniform, CompositeUniform, FrameCamera, InstanceUniform,
    SceneUniform,
};
use super::RenderError;
use crate::app::AppState;
use crate::config::RenderConfig;
use crate::obj::{MeshData, VERTEX_STRIDE};
use crate::overlay::OverlayFrame;
use crate::postprocess::{BlurSchedule, BlurTarget};
use crate::scene::{grass_transforms, ModelId, Scene};

const FLOAT: u64 = std::mem::size_of::<f32>() as u64;

static MESH_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 3 * FLOAT,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 6 * FLOAT,
        shader_location: 2,
    },
];

fn mesh_layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE as u64 * FLOAT,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

/// Fixed-scene HDR renderer: scene, skybox and foliage into the HDR
/// target, ping-pong bloom blur, then tone-mapped composite and overlay.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    hdr: HdrTarget,
    ping_pong: PingPong,
    layouts: Layouts,
    pipelines: Pipelines,
    post_sampler: wgpu::Sampler,
    post: PostBindings,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_bind_group: wgpu::BindGroup,
    instance_stride: u64,
    instance_capacity: usize,
    blur_directions: [wgpu::BindGroup; 2],
    composite_buffer: wgpu::Buffer,
    models: HashMap<ModelId, GpuModel>,
    grass: GpuModel,
    grass_transforms: Vec<glam::Mat4>,
    sky_cube: GpuMesh,
    sky_bind_group: wgpu::BindGroup,
    egui: egui_wgpu::Renderer,
    warned_dropped_lights: bool,
}

struct Layouts {
    scene: wgpu::BindGroupLayout,
    instance: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
    sky: wgpu::BindGroupLayout,
    blur_source: wgpu::BindGroupLayout,
    blur_direction: wgpu::BindGroupLayout,
    composite: wgpu::BindGroupLayout,
}

struct Pipelines {
    scene: wgpu::RenderPipeline,
    skybox: wgpu::RenderPipeline,
    foliage: wgpu::RenderPipeline,
    blur: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
}

/// Bind groups that reference the size-dependent targets, indexed by
/// [`BlurTarget::slot`].
struct PostBindings {
    blur_sources: [wgpu::BindGroup; 3],
    composite: [wgpu::BindGroup; 3],
}

impl Renderer {
    pub async fn new(window: Arc<Window>, render: &RenderConfig, scene: &Scene) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(RenderError::ZeroSizedWindow.into());
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let adapter_info = adapter.get_info();
        info!(
            "using adapter {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no supported formats")?;
        info!("surface format {surface_format:?}");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let hdr = HdrTarget::create(&device, size.width, size.height)?;
        let ping_pong = PingPong::create(&device, size.width, size.height)?;
        info!("HDR targets {}x{}", size.width, size.height);

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, &layouts, surface_format);

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-uniform"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-bind-group"),
            layout: &layouts.scene,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let instance_stride = aligned_stride(
            std::mem::size_of::<InstanceUniform>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let grass_transforms = grass_transforms();
        let instance_capacity = scene.instances.len() + grass_transforms.len();
        let (instance_buffer, instance_bind_group) =
            instance_storage(&device, &layouts.instance, instance_stride, instance_capacity);

        let blur_directions = [false, true].map(|horizontal| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("blur-direction"),
                contents: bytes_of(&BlurUniform::new(horizontal)),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("blur-direction-bind-group"),
                layout: &layouts.blur_direction,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        });

        let composite_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("composite-uniform"),
            size: std::mem::size_of::<CompositeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let post_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let post = PostBindings::new(&device, &layouts, &hdr, &ping_pong, &post_sampler, &composite_buffer);

        let mut models = HashMap::new();
        for model in scene.models() {
            let gpu = resources::load_model(
                &device,
                &queue,
                &layouts.material,
                &material_sampler,
                render,
                model,
            );
            models.insert(model, gpu);
        }

        let grass_texture = resources::load_texture_or(
            &device,
            &queue,
            &render.texture_path("grass.png"),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            [0, 0, 0, 0],
        );
        let no_specular = resources::upload_rgba(
            &device,
            &queue,
            "grass-specular",
            &image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255])),
            wgpu::TextureFormat::Rgba8Unorm,
        );
        let grass = GpuModel {
            mesh: GpuMesh::from_mesh(&device, &MeshData::billboard(), "grass"),
            material: resources::material_bind_group(
                &device,
                &layouts.material,
                &post_sampler,
                &grass_texture,
                &no_specular,
                "grass-material",
            ),
        };

        let cubemap = resources::load_cubemap(&device, &queue, &resources::skybox_paths(render));
        let cube_view = cubemap.create_view(&wgpu::TextureViewDescriptor {
            label: Some("skybox-view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox-bind-group"),
            layout: &layouts.sky,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&cube_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&post_sampler),
                },
            ],
        });
        let sky_cube = GpuMesh::from_mesh(&device, &MeshData::cube(), "skybox-cube");

        let egui = egui_wgpu::Renderer::new(&device, surface_format, None, 1);

        info!(
            "loaded {} models for {} instances and {} grass quads",
            models.len(),
            scene.instances.len(),
            grass_transforms.len()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            hdr,
            ping_pong,
            layouts,
            pipelines,
            post_sampler,
            post,
            scene_buffer,
            scene_bind_group,
            instance_buffer,
            instance_bind_group,
            instance_stride,
            instance_capacity,
            blur_directions,
            composite_buffer,
            models,
            grass,
            grass_transforms,
            sky_cube,
            sky_bind_group,
            egui,
            warned_dropped_lights: false,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height.max(1) as f32
    }

    /// Reconfigures the swap chain and recreates every size-dependent
    /// target. Zero-sized requests (minimised windows) are ignored.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) -> Result<(), RenderError> {
        if new_size.width == 0 || new_size.height == 0 {
            return Ok(());
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.hdr = HdrTarget::create(&self.device, new_size.width, new_size.height)?;
        self.ping_pong = PingPong::create(&self.device, new_size.width, new_size.height)?;
        self.post = PostBindings::new(
            &self.device,
            &self.layouts,
            &self.hdr,
            &self.ping_pong,
            &self.post_sampler,
            &self.composite_buffer,
        );
        Ok(())
    }

    pub fn render(
        &mut self,
        app: &AppState,
        overlay: Option<OverlayFrame>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.write_uniforms(app);
        let schedule = BlurSchedule::new(app.bloom.iterations);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        self.encode_hdr_pass(&mut encoder, app);
        if app.bloom.enabled {
            self.encode_blur(&mut encoder, &schedule);
        }
        self.encode_composite(&mut encoder, &view, schedule.output());

        let mut commands = Vec::new();
        let mut freed = Vec::new();
        if let Some(frame) = overlay {
            let screen = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: frame.pixels_per_point,
            };
            for (id, delta) in &frame.textures_delta.set {
                self.egui.update_texture(&self.device, &self.queue, *id, delta);
            }
            commands = self.egui.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &frame.primitives,
                &screen,
            );
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("overlay-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.egui.render(&mut pass, &frame.primitives, &screen);
            }
            freed = frame.textures_delta.free;
        }

        commands.push(encoder.finish());
        self.queue.submit(commands);
        output.present();
        for id in &freed {
            self.egui.free_texture(id);
        }
        Ok(())
    }

    fn write_uniforms(&mut self, app: &AppState) {
        let camera = FrameCamera {
            view: app.camera.view_matrix(),
            sky_view: app.camera.rotation_only_view(),
            projection: app.camera.projection_matrix(self.aspect()),
            position: app.camera.position,
        };
        let lights = pack_lights(&app.lights());
        if lights.dropped > 0 && !self.warned_dropped_lights {
            warn!("{} lights exceed the shader limits and are ignored", lights.dropped);
            self.warned_dropped_lights = true;
        }
        let uniform = SceneUniform::new(&camera, app.shininess, app.bloom.threshold, &lights);
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytes_of(&uniform));

        let count = app.scene.instances.len() + self.grass_transforms.len();
        if count > self.instance_capacity {
            let (buffer, bind_group) = instance_storage(
                &self.device,
                &self.layouts.instance,
                self.instance_stride,
                count,
            );
            self.instance_buffer = buffer;
            self.instance_bind_group = bind_group;
            self.instance_capacity = count;
        }
        let stride = self.instance_stride as usize;
        let mut data = vec![0u8; stride * count];
        let models = app
            .scene
            .instances
            .iter()
            .map(|instance| instance.transform())
            .chain(self.grass_transforms.iter().copied());
        for (index, model) in models.enumerate() {
            let uniform = InstanceUniform::new(model);
            let bytes = bytes_of(&uniform);
            data[index * stride..index * stride + bytes.len()].copy_from_slice(bytes);
        }
        self.queue.write_buffer(&self.instance_buffer, 0, &data);

        let composite = CompositeUniform::new(app.bloom.exposure, app.bloom.enabled);
        self.queue
            .write_buffer(&self.composite_buffer, 0, bytes_of(&composite));
    }

    fn instance_offset(&self, index: usize) -> u32 {
        (index as u64 * self.instance_stride) as u32
    }

    fn encode_hdr_pass(&self, encoder: &mut wgpu::CommandEncoder, app: &AppState) {
        let clear = app.clear_color;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("hdr-pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.hdr.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.x as f64,
                            g: clear.y as f64,
                            b: clear.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.hdr.bright.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.hdr.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.scene);
        pass.set_bind_group(0, &self.scene_bind_group, &[]);
        for (index, instance) in app.scene.instances.iter().enumerate() {
            let Some(model) = self.models.get(&instance.model) else {
                continue;
            };
            pass.set_bind_group(1, &self.instance_bind_group, &[self.instance_offset(index)]);
            pass.set_bind_group(2, &model.material, &[]);
            pass.set_vertex_buffer(0, model.mesh.vertex.slice(..));
            pass.set_index_buffer(model.mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..model.mesh.index_count, 0, 0..1);
        }

        pass.set_pipeline(&self.pipelines.skybox);
        pass.set_bind_group(0, &self.scene_bind_group, &[]);
        pass.set_bind_group(1, &self.sky_bind_group, &[]);
        pass.set_vertex_buffer(0, self.sky_cube.vertex.slice(..));
        pass.set_index_buffer(self.sky_cube.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.sky_cube.index_count, 0, 0..1);

        let first_grass = app.scene.instances.len();
        pass.set_pipeline(&self.pipelines.foliage);
        pass.set_bind_group(0, &self.scene_bind_group, &[]);
        pass.set_bind_group(2, &self.grass.material, &[]);
        pass.set_vertex_buffer(0, self.grass.mesh.vertex.slice(..));
        pass.set_index_buffer(self.grass.mesh.index.slice(..), wgpu::IndexFormat::Uint32);
        for index in 0..self.grass_transforms.len() {
            let offset = self.instance_offset(first_grass + index);
            pass.set_bind_group(1, &self.instance_bind_group, &[offset]);
            pass.draw_indexed(0..self.grass.mesh.index_count, 0, 0..1);
        }
    }

    fn encode_blur(&self, encoder: &mut wgpu::CommandEncoder, schedule: &BlurSchedule) {
        for step in schedule.steps() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blur-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.ping_pong.targets[step.destination].view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines.blur);
            pass.set_bind_group(0, &self.post.blur_sources[step.source.slot()], &[]);
            pass.set_bind_group(1, &self.blur_directions[step.horizontal as usize], &[]);
            pass.draw(0..3, 0..1);
        }
    }

    fn encode_composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        bloom_source: BlurTarget,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.composite);
        pass.set_bind_group(0, &self.post.composite[bloom_source.slot()], &[]);
        pass.draw(0..3, 0..1);
    }
}

fn instance_storage(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("instance-uniforms"),
        size: stride * capacity.max(1) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("instance-bind-group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<InstanceUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn uniform_entry(binding: u32, size: u64, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: wgpu::BufferSize::new(size),
        },
        count: None,
    }
}

fn texture_entry(binding: u32, dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let layout = |label: &str, entries: &[wgpu::BindGroupLayoutEntry]| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            })
        };
        let d2 = wgpu::TextureViewDimension::D2;
        Self {
            scene: layout(
                "scene-bind-layout",
                &[uniform_entry(0, std::mem::size_of::<SceneUniform>() as u64, false)],
            ),
            instance: layout(
                "instance-bind-layout",
                &[uniform_entry(0, std::mem::size_of::<InstanceUniform>() as u64, true)],
            ),
            material: resources::material_layout(device),
            sky: layout(
                "skybox-bind-layout",
                &[
                    texture_entry(0, wgpu::TextureViewDimension::Cube),
                    sampler_entry(1),
                ],
            ),
            blur_source: layout(
                "blur-source-bind-layout",
                &[texture_entry(0, d2), sampler_entry(1)],
            ),
            blur_direction: layout(
                "blur-direction-bind-layout",
                &[uniform_entry(0, std::mem::size_of::<BlurUniform>() as u64, false)],
            ),
            composite: layout(
                "composite-bind-layout",
                &[
                    texture_entry(0, d2),
                    texture_entry(1, d2),
                    sampler_entry(2),
                    uniform_entry(3, std::mem::size_of::<CompositeUniform>() as u64, false),
                ],
            ),
        }
    }
}

struct PipelineSpec<'a> {
    label: &'a str,
    source: &'a str,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    layouts: &'a [&'a wgpu::BindGroupLayout],
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    targets: &'a [Option<wgpu::ColorTargetState>],
    depth: Option<wgpu::DepthStencilState>,
}

fn build_pipeline(device: &wgpu::Device, spec: PipelineSpec<'_>) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(spec.label),
        source: wgpu::ShaderSource::Wgsl(spec.source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.label),
        bind_group_layouts: spec.layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: spec.vertex_entry,
            compilation_options: Default::default(),
            buffers: spec.buffers,
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: spec.depth,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: spec.fragment_entry,
            compilation_options: Default::default(),
            targets: spec.targets,
        }),
        multiview: None,
    })
}

fn depth_state(write: bool, compare: wgpu::CompareFunction) -> Option<wgpu::DepthStencilState> {
    Some(wgpu::DepthStencilState {
        format: DepthBuffer::FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: Default::default(),
        bias: Default::default(),
    })
}

fn hdr_targets(blend: Option<wgpu::BlendState>) -> [Option<wgpu::ColorTargetState>; 2] {
    let target = Some(wgpu::ColorTargetState {
        format: HDR_FORMAT,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    });
    [target.clone(), target]
}

impl Pipelines {
    fn new(device: &wgpu::Device, layouts: &Layouts, surface_format: wgpu::TextureFormat) -> Self {
        let mesh = [mesh_layout(&MESH_ATTRIBUTES)];
        let position_only = [mesh_layout(&MESH_ATTRIBUTES[..1])];
        let opaque = hdr_targets(None);
        let blended = hdr_targets(Some(wgpu::BlendState::ALPHA_BLENDING));
        let scene_layouts = [&layouts.scene, &layouts.instance, &layouts.material];

        let scene = build_pipeline(
            device,
            PipelineSpec {
                label: "scene-pipeline",
                source: shaders::SCENE,
                vertex_entry: "vs_main",
                fragment_entry: "fs_main",
                layouts: &scene_layouts,
                buffers: &mesh,
                targets: &opaque,
                depth: depth_state(true, wgpu::CompareFunction::Less),
            },
        );
        // The cube sits at depth 1.0, so only untouched pixels pass.
        let skybox = build_pipeline(
            device,
            PipelineSpec {
                label: "skybox-pipeline",
                source: shaders::SKYBOX,
                vertex_entry: "vs_sky",
                fragment_entry: "fs_sky",
                layouts: &[&layouts.scene, &layouts.sky],
                buffers: &position_only,
                targets: &opaque,
                depth: depth_state(false, wgpu::CompareFunction::LessEqual),
            },
        );
        let foliage = build_pipeline(
            device,
            PipelineSpec {
                label: "foliage-pipeline",
                source: shaders::FOLIAGE,
                vertex_entry: "vs_main",
                fragment_entry: "fs_foliage",
                layouts: &scene_layouts,
                buffers: &mesh,
                targets: &blended,
                depth: depth_state(false, wgpu::CompareFunction::Less),
            },
        );
        let blur = build_pipeline(
            device,
            PipelineSpec {
                label: "blur-pipeline",
                source: shaders::BLUR,
                vertex_entry: "vs_fullscreen",
                fragment_entry: "fs_blur",
                layouts: &[&layouts.blur_source, &layouts.blur_direction],
                buffers: &[],
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth: None,
            },
        );
        let composite = build_pipeline(
            device,
            PipelineSpec {
                label: "composite-pipeline",
                source: shaders::COMPOSITE,
                vertex_entry: "vs_fullscreen",
                fragment_entry: "fs_composite",
                layouts: &[&layouts.composite],
                buffers: &[],
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth: None,
            },
        );
        Self {
            scene,
            skybox,
            foliage,
            blur,
            composite,
        }
    }
}

impl PostBindings {
    fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        hdr: &HdrTarget,
        ping_pong: &PingPong,
        sampler: &wgpu::Sampler,
        composite_buffer: &wgpu::Buffer,
    ) -> Self {
        let sources = [
            &hdr.bright.view,
            &ping_pong.targets[0].view,
            &ping_pong.targets[1].view,
        ];
        let blur_sources = sources.map(|source| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("blur-source-bind-group"),
                layout: &layouts.blur_source,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        });
        let composite = sources.map(|bloom| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("composite-bind-group"),
                layout: &layouts.composite,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&hdr.color.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(bloom),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: composite_buffer.as_entire_binding(),
                    },
                ],
            })
        });
        Self {
            blur_sources,
            composite,
        }
    }
}
