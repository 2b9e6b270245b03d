use crate::frame::FrameStats;
use crate::mesh::{self, Vertex};
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use giftbox_assets::{Model, Texture};
use giftbox_common::AssetId;
use giftbox_kernel::{Origin, PropKind, Scene, Visual};
use giftbox_render::OrbitCamera;
use glam::{Mat4, Vec3};
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
const MIRROR_STENCIL: u32 = 1;
const MIRROR_ALPHA: f32 = 0.35;
const INITIAL_INSTANCES: u32 = 256;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    sun_position: [f32; 4],
    sun_color: [f32; 4],
    key_light: [f32; 4],
    ambient: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
    params: [f32; 4],
}

impl InstanceData {
    fn new(model: Mat4, color: [f32; 4], emissive: bool) -> Self {
        let cols = model.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
            color,
            params: [if emissive { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }

    fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&[self.model_0, self.model_1, self.model_2, self.model_3])
    }

    fn transformed(&self, by: Mat4) -> Self {
        let cols = (by * self.matrix()).to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MeshKey {
    Cube,
    Sphere,
    Quad,
    Model(AssetId, usize),
}

/// Everything one draw call binds: a mesh and a colour map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DrawKey {
    mesh: MeshKey,
    texture: Option<AssetId>,
}

impl DrawKey {
    fn plain(mesh: MeshKey) -> Self {
        Self {
            mesh,
            texture: None,
        }
    }
}

/// A contiguous run of instances sharing one mesh and texture.
#[derive(Debug, Clone, Copy)]
struct Batch {
    key: DrawKey,
    start: u32,
    count: u32,
}

/// Group `items` by draw key, append their instances, and return the runs.
fn batch(mut items: Vec<(DrawKey, InstanceData)>, instances: &mut Vec<InstanceData>) -> Vec<Batch> {
    items.sort_by_key(|(key, _)| *key);
    let mut batches: Vec<Batch> = Vec::new();
    for (key, instance) in items {
        let index = instances.len() as u32;
        instances.push(instance);
        match batches.last_mut() {
            Some(last) if last.key == key => last.count += 1,
            _ => batches.push(Batch {
                key,
                start: index,
                count: 1,
            }),
        }
    }
    batches
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, label: &str, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_index_buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

struct ModelPart {
    mesh: GpuMesh,
    transform: Mat4,
    color: [f32; 4],
}

struct PipelineOptions {
    label: &'static str,
    front_face: wgpu::FrontFace,
    cull_mode: Option<wgpu::Face>,
    blend: wgpu::BlendState,
    write_color: bool,
    depth_write: bool,
    stencil: wgpu::StencilState,
}

impl PipelineOptions {
    fn lit(label: &'static str) -> Self {
        Self {
            label,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            blend: wgpu::BlendState::REPLACE,
            write_color: true,
            depth_write: true,
            stencil: wgpu::StencilState::default(),
        }
    }
}

fn stencil(compare: wgpu::CompareFunction, pass_op: wgpu::StencilOperation, write_mask: u32) -> wgpu::StencilState {
    let face = wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };
    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: 0xff,
        write_mask,
    }
}

/// wgpu-based scene renderer.
pub struct WgpuRenderer {
    lit_pipeline: wgpu::RenderPipeline,
    reflected_pipeline: wgpu::RenderPipeline,
    floor_pipeline: wgpu::RenderPipeline,
    mirror_mask_pipeline: wgpu::RenderPipeline,
    mirror_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white_texture: wgpu::BindGroup,
    textures: BTreeMap<AssetId, wgpu::BindGroup>,
    cube: GpuMesh,
    sphere: GpuMesh,
    quad: GpuMesh,
    models: BTreeMap<AssetId, Vec<ModelPart>>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u32,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("surface_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white_texture = Self::create_texture_bind_group(
            device,
            queue,
            &texture_layout,
            &sampler,
            "white_texture",
            1,
            1,
            &[255; 4],
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });

        let build = |options: PipelineOptions| {
            Self::create_pipeline(device, &pipeline_layout, &shader, surface_format, options)
        };

        let lit_pipeline = build(PipelineOptions::lit("lit_pipeline"));
        // Reflection flips handedness, so front faces wind clockwise.
        let reflected_pipeline = build(PipelineOptions {
            front_face: wgpu::FrontFace::Cw,
            stencil: stencil(
                wgpu::CompareFunction::Equal,
                wgpu::StencilOperation::Keep,
                0,
            ),
            ..PipelineOptions::lit("reflected_pipeline")
        });
        let floor_pipeline = build(PipelineOptions {
            cull_mode: None,
            depth_write: false,
            ..PipelineOptions::lit("floor_pipeline")
        });
        let mirror_mask_pipeline = build(PipelineOptions {
            cull_mode: None,
            write_color: false,
            depth_write: false,
            stencil: stencil(
                wgpu::CompareFunction::Always,
                wgpu::StencilOperation::Replace,
                0xff,
            ),
            ..PipelineOptions::lit("mirror_mask_pipeline")
        });
        let mirror_pipeline = build(PipelineOptions {
            cull_mode: None,
            blend: wgpu::BlendState::ALPHA_BLENDING,
            ..PipelineOptions::lit("mirror_pipeline")
        });

        let (vertices, indices) = mesh::cube_mesh();
        let cube = GpuMesh::new(device, "cube", &vertices, &indices);
        let (vertices, indices) = mesh::sphere_mesh(32, 16);
        let sphere = GpuMesh::new(device, "sphere", &vertices, &indices);
        let (vertices, indices) = mesh::quad_mesh();
        let quad = GpuMesh::new(device, "quad", &vertices, &indices);

        let instance_buffer = Self::create_instance_buffer(device, INITIAL_INSTANCES);
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            lit_pipeline,
            reflected_pipeline,
            floor_pipeline,
            mirror_mask_pipeline,
            mirror_pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            sampler,
            white_texture,
            textures: BTreeMap::new(),
            cube,
            sphere,
            quad,
            models: BTreeMap::new(),
            instance_buffer,
            instance_capacity: INITIAL_INSTANCES,
            depth_texture,
            surface_format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn has_model(&self, id: AssetId) -> bool {
        self.models.contains_key(&id)
    }

    pub fn has_texture(&self, id: AssetId) -> bool {
        self.textures.contains_key(&id)
    }

    /// Upload `texture` as an sRGB colour map under its asset id.
    pub fn upload_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: &Texture) {
        if self.textures.contains_key(&texture.id) {
            return;
        }
        let bind_group = Self::create_texture_bind_group(
            device,
            queue,
            &self.texture_layout,
            &self.sampler,
            &texture.name,
            texture.width,
            texture.height,
            &texture.rgba,
        );
        tracing::info!(
            texture = %texture.name,
            width = texture.width,
            height = texture.height,
            "texture uploaded"
        );
        self.textures.insert(texture.id, bind_group);
    }

    /// Upload every primitive of `model` to GPU buffers under its asset id.
    pub fn upload_model(&mut self, device: &wgpu::Device, model: &Model) {
        if self.models.contains_key(&model.id) {
            return;
        }
        let parts = model
            .meshes
            .iter()
            .filter(|m| !m.positions.is_empty())
            .map(|m| {
                let vertices = mesh::interleave(&m.positions, &m.normals);
                let indices = if m.indices.is_empty() {
                    (0..vertices.len() as u32).collect()
                } else {
                    m.indices.clone()
                };
                ModelPart {
                    mesh: GpuMesh::new(device, &m.name, &vertices, &indices),
                    transform: m.transform,
                    color: m.base_color,
                }
            })
            .collect::<Vec<_>>();
        tracing::info!(model = %model.name, parts = parts.len(), "model uploaded");
        self.models.insert(model.id, parts);
    }

    /// Render one frame: floor, mirror with reflections, meshes, sun.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &Scene,
        camera: &OrbitCamera,
    ) -> FrameStats {
        let light = &scene.light;
        let lighting = &scene.lighting;
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: camera.view_projection().to_cols_array_2d(),
                sun_position: light.position.extend(light.intensity).to_array(),
                sun_color: [light.color[0], light.color[1], light.color[2], 1.0],
                key_light: lighting
                    .directional_position
                    .extend(lighting.directional_intensity)
                    .to_array(),
                ambient: [lighting.ambient, 0.0, 0.0, 0.0],
            }),
        );

        let dynamic = self.dynamic_instances(scene);
        let mirror_height = scene
            .props
            .iter()
            .find(|p| matches!(p.kind, PropKind::Mirror { .. }))
            .map(|p| p.transform.position.y);
        let reflected: Vec<(DrawKey, InstanceData)> = match mirror_height {
            Some(height) => {
                let reflect = mesh::reflection_matrix(height);
                dynamic
                    .iter()
                    .map(|(key, instance)| (*key, instance.transformed(reflect)))
                    .collect()
            }
            None => Vec::new(),
        };
        let (floors, mirrors): (Vec<_>, Vec<_>) = scene
            .props
            .iter()
            .map(|prop| {
                let surface = prop.surface();
                let (size, color, mirror) = match prop.kind {
                    PropKind::Plane { size } => (size, surface.color, false),
                    PropKind::Mirror { size } => {
                        let [r, g, b, _] = surface.color;
                        (size, [r, g, b, MIRROR_ALPHA], true)
                    }
                };
                let model = prop.transform.matrix() * Mat4::from_scale(Vec3::new(size, size, 1.0));
                let key = DrawKey {
                    mesh: MeshKey::Quad,
                    texture: surface.texture,
                };
                (mirror, (key, InstanceData::new(model, color, false)))
            })
            .partition(|(mirror, _)| !*mirror);

        let mut instances = Vec::new();
        let reflected_count = reflected.len() as u32;
        let dynamic_batches = batch(dynamic, &mut instances);
        let reflected_batches = batch(reflected, &mut instances);
        let floor_batches = batch(floors.into_iter().map(|(_, i)| i).collect(), &mut instances);
        let mirror_batches = batch(mirrors.into_iter().map(|(_, i)| i).collect(), &mut instances);

        self.ensure_instance_capacity(device, instances.len() as u32);
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        let mut draw_calls = 0;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            pass.set_stencil_reference(MIRROR_STENCIL);

            pass.set_pipeline(&self.floor_pipeline);
            draw_calls += self.draw_batches(&mut pass, &floor_batches);

            pass.set_pipeline(&self.mirror_mask_pipeline);
            draw_calls += self.draw_batches(&mut pass, &mirror_batches);

            pass.set_pipeline(&self.reflected_pipeline);
            draw_calls += self.draw_batches(&mut pass, &reflected_batches);

            pass.set_pipeline(&self.mirror_pipeline);
            draw_calls += self.draw_batches(&mut pass, &mirror_batches);

            pass.set_pipeline(&self.lit_pipeline);
            draw_calls += self.draw_batches(&mut pass, &dynamic_batches);
        }

        queue.submit(std::iter::once(encoder.finish()));

        FrameStats {
            instances: instances.len() as u32,
            reflected: reflected_count,
            draw_calls,
        }
    }

    /// Instances for every entity mesh plus the sun.
    fn dynamic_instances(&self, scene: &Scene) -> Vec<(DrawKey, InstanceData)> {
        let mut items = Vec::with_capacity(scene.world.entity_count() + 1);
        for entity in scene.world.entities() {
            let model = entity.mesh().matrix();
            match entity.visual() {
                Visual::Box { half_extents } => {
                    let (color, texture) = if entity.origin() == Origin::Primary {
                        let surface = scene.primary_surface();
                        (surface.color, surface.texture)
                    } else {
                        (box_color(entity.id().0.as_u128()), None)
                    };
                    items.push((
                        DrawKey {
                            mesh: MeshKey::Cube,
                            texture,
                        },
                        InstanceData::new(model * Mat4::from_scale(half_extents * 2.0), color, false),
                    ));
                }
                Visual::Sphere { radius } => items.push((
                    DrawKey::plain(MeshKey::Sphere),
                    InstanceData::new(
                        model * Mat4::from_scale(Vec3::splat(radius)),
                        [0.8, 0.8, 0.8, 1.0],
                        false,
                    ),
                )),
                Visual::Model(id) => {
                    let Some(parts) = self.models.get(&id) else {
                        continue;
                    };
                    for (index, part) in parts.iter().enumerate() {
                        items.push((
                            DrawKey::plain(MeshKey::Model(id, index)),
                            InstanceData::new(model * part.transform, part.color, false),
                        ));
                    }
                }
                Visual::Hidden => {}
            }
        }

        let light = &scene.light;
        let [r, g, b] = light.color;
        items.push((
            DrawKey::plain(MeshKey::Sphere),
            InstanceData::new(
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(light.sun_radius),
                    glam::Quat::IDENTITY,
                    light.position,
                ),
                [r, g, b, 1.0],
                true,
            ),
        ));
        items
    }

    fn draw_batches(&self, pass: &mut wgpu::RenderPass<'_>, batches: &[Batch]) -> u32 {
        let mut calls = 0;
        for b in batches {
            let Some(mesh) = self.mesh(b.key.mesh) else {
                continue;
            };
            pass.set_bind_group(1, self.texture_bind_group(b.key.texture), &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, b.start..b.start + b.count);
            calls += 1;
        }
        calls
    }

    /// Bind group for a colour map. Textures that never arrived draw white,
    /// which leaves the instance colour as is.
    fn texture_bind_group(&self, texture: Option<AssetId>) -> &wgpu::BindGroup {
        texture
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.white_texture)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_texture_bind_group(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> wgpu::BindGroup {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        let view = texture.create_view(&Default::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
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
        })
    }

    fn mesh(&self, key: MeshKey) -> Option<&GpuMesh> {
        match key {
            MeshKey::Cube => Some(&self.cube),
            MeshKey::Sphere => Some(&self.sphere),
            MeshKey::Quad => Some(&self.quad),
            MeshKey::Model(id, index) => self.models.get(&id).and_then(|p| p.get(index)).map(|p| &p.mesh),
        }
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, needed: u32) {
        if needed <= self.instance_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        tracing::debug!(from = self.instance_capacity, to = capacity, "growing instance buffer");
        self.instance_buffer = Self::create_instance_buffer(device, capacity);
        self.instance_capacity = capacity;
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: capacity as u64 * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
        options: PipelineOptions,
    ) -> wgpu::RenderPipeline {
        let vertex_attrs = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
        let instance_attrs = wgpu::vertex_attr_array![
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4,
            8 => Float32x4,
        ];

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(options.label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &vertex_attrs,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &instance_attrs,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(options.blend),
                    write_mask: if options.write_color {
                        wgpu::ColorWrites::ALL
                    } else {
                        wgpu::ColorWrites::empty()
                    },
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: options.front_face,
                cull_mode: options.cull_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: options.depth_write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: options.stencil,
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_stencil_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

/// Stable per-entity tint so stacked boxes stay distinguishable.
fn box_color(seed: u128) -> [f32; 4] {
    const PALETTE: [[f32; 4]; 4] = [
        [0.85, 0.2, 0.25, 1.0],
        [0.2, 0.6, 1.0, 1.0],
        [0.95, 0.75, 0.2, 1.0],
        [0.3, 0.8, 0.45, 1.0],
    ];
    PALETTE[(seed % PALETTE.len() as u128) as usize]
}
