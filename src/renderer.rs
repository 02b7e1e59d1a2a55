//! GPU rendering for the photo city.
//!
//! Draws, inside the widget bounds: a background gradient, the city as a
//! wireframe line list, and one textured quad per photo. Photo textures are
//! uploaded once; billboards without a photo use a plain fallback texture.
//! The renderer only reads [`FrameSnapshot`]s and never calls back into the
//! interaction code.

use iced::widget::shader::wgpu::{self, CommandEncoder, Device, Queue, TextureFormat, TextureView};
use iced::{Rectangle, Size};
use wgpu::util::DeviceExt;

use crate::assets::PhotoLibrary;
use crate::camera::CameraUniform;
use crate::controller::FrameSnapshot;
use crate::scene::{CityMesh, QUAD_INDICES, QUAD_VERTICES};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const FALLBACK_PIXEL: [u8; 4] = [255, 255, 255, 255];

/// Per-photo instance data uploaded every frame
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct PhotoInstanceRaw {
    /// 4x4 model transformation matrix
    model: [[f32; 4]; 4],
    /// 1.0 for the hovered photo, 0.0 otherwise
    highlight: f32,
    _padding: [f32; 3],
}

pub(crate) struct Renderer {
    /// Physical pixel rectangle of the widget within the target
    viewport: Rectangle<f32>,
    background_pipeline: wgpu::RenderPipeline,
    city_pipeline: wgpu::RenderPipeline,
    photo_pipeline: wgpu::RenderPipeline,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    city_vertex_buffer: wgpu::Buffer,
    num_city_vertices: u32,
    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    /// Bind group per photo, indexed by texture handle
    photo_bind_groups: Vec<wgpu::BindGroup>,
    fallback_bind_group: wgpu::BindGroup,
    /// Texture choice per instance for the current frame
    draw_list: Vec<Option<usize>>,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl Renderer {
    /// Creates all GPU resources and uploads the city mesh and photos.
    pub(crate) async fn new(
        device: &Device,
        queue: &Queue,
        format: TextureFormat,
        bounds: Rectangle<f32>,
        scale_factor: f32,
        target_size: Size<u32>,
        photos: &PhotoLibrary,
        city: &CityMesh,
        instance_capacity: usize,
    ) -> Self {
        let camera_uniform = CameraUniform::new();

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Camera Bind Group Layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("Camera Bind Group"),
        });

        let photo_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("Photo Bind Group Layout"),
            });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let photo_bind_groups = photos
            .iter()
            .map(|photo| {
                upload_photo(
                    device,
                    queue,
                    &photo_bind_group_layout,
                    &sampler,
                    &photo.name,
                    &photo.rgba,
                    photo.width,
                    photo.height,
                )
            })
            .collect();
        let fallback_bind_group = upload_photo(
            device,
            queue,
            &photo_bind_group_layout,
            &sampler,
            "fallback",
            &FALLBACK_PIXEL,
            1,
            1,
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let camera_only_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Camera Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let photo_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Photo Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &photo_bind_group_layout],
            push_constant_ranges: &[],
        });

        let color_targets = [Some(wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let background_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Background Pipeline"),
            layout: Some(&camera_only_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_background",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_background",
                targets: &color_targets,
            }),
            primitive: primitive_state(wgpu::PrimitiveTopology::TriangleList),
            depth_stencil: Some(depth_state(false, wgpu::CompareFunction::Always)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let city_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("City Pipeline"),
            layout: Some(&camera_only_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_city",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_city",
                targets: &color_targets,
            }),
            primitive: primitive_state(wgpu::PrimitiveTopology::LineList),
            depth_stencil: Some(depth_state(true, wgpu::CompareFunction::Less)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let photo_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Photo Pipeline"),
            layout: Some(&photo_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_photo",
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<PhotoInstanceRaw>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_photo",
                targets: &color_targets,
            }),
            primitive: primitive_state(wgpu::PrimitiveTopology::TriangleList),
            depth_stencil: Some(depth_state(true, wgpu::CompareFunction::Less)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let city_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("City Vertex Buffer"),
            contents: bytemuck::cast_slice(&city.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_capacity = instance_capacity.max(1);
        let instance_buffer = create_instance_buffer(device, instance_capacity);
        let (depth_texture, depth_view) = create_depth_texture(device, target_size);

        Self {
            viewport: physical_rect(bounds, scale_factor),
            background_pipeline,
            city_pipeline,
            photo_pipeline,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            city_vertex_buffer,
            num_city_vertices: city.vertices.len() as u32,
            quad_vertex_buffer,
            quad_index_buffer,
            instance_buffer,
            instance_capacity,
            photo_bind_groups,
            fallback_bind_group,
            draw_list: Vec::new(),
            depth_texture,
            depth_view,
        }
    }

    /// Tracks widget bounds and recreates the depth buffer when the target
    /// size changes.
    pub(crate) fn resize(
        &mut self,
        device: &Device,
        bounds: Rectangle<f32>,
        scale_factor: f32,
        target_size: Size<u32>,
    ) {
        self.viewport = physical_rect(bounds, scale_factor);

        if target_size.width > 0
            && target_size.height > 0
            && (self.depth_texture.size().width != target_size.width
                || self.depth_texture.size().height != target_size.height)
        {
            let (texture, view) = create_depth_texture(device, target_size);
            self.depth_texture = texture;
            self.depth_view = view;
        }
    }

    /// Uploads the camera and photo instances of one frame.
    pub(crate) fn update_frame(&mut self, device: &Device, queue: &Queue, frame: &FrameSnapshot) {
        self.camera_uniform
            .update(&frame.view, &frame.projection, &frame.city_model);
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );

        if frame.photos.len() > self.instance_capacity {
            self.instance_capacity = frame.photos.len();
            self.instance_buffer = create_instance_buffer(device, self.instance_capacity);
        }

        let instances: Vec<PhotoInstanceRaw> = frame
            .photos
            .iter()
            .map(|photo| PhotoInstanceRaw {
                model: photo.model.into(),
                highlight: if photo.hovered { 1.0 } else { 0.0 },
                _padding: [0.0; 3],
            })
            .collect();
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        self.draw_list = frame
            .photos
            .iter()
            .map(|photo| photo.texture.map(|handle| handle.index()))
            .collect();
    }

    pub(crate) fn render(&self, encoder: &mut CommandEncoder, target: &TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    // Keep the rest of the UI; the background pass covers our bounds
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_viewport(
            self.viewport.x,
            self.viewport.y,
            self.viewport.width,
            self.viewport.height,
            0.0,
            1.0,
        );
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        render_pass.set_pipeline(&self.background_pipeline);
        render_pass.draw(0..3, 0..1);

        render_pass.set_pipeline(&self.city_pipeline);
        render_pass.set_vertex_buffer(0, self.city_vertex_buffer.slice(..));
        render_pass.draw(0..self.num_city_vertices, 0..1);

        render_pass.set_pipeline(&self.photo_pipeline);
        render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        for (instance, texture) in self.draw_list.iter().enumerate() {
            let bind_group = texture
                .and_then(|index| self.photo_bind_groups.get(index))
                .unwrap_or(&self.fallback_bind_group);
            let instance = instance as u32;
            render_pass.set_bind_group(1, bind_group, &[]);
            render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, instance..instance + 1);
        }
    }
}

fn physical_rect(bounds: Rectangle<f32>, scale_factor: f32) -> Rectangle<f32> {
    Rectangle {
        x: bounds.x * scale_factor,
        y: bounds.y * scale_factor,
        width: bounds.width * scale_factor,
        height: bounds.height * scale_factor,
    }
}

fn primitive_state(topology: wgpu::PrimitiveTopology) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        // Photos are visible from both sides
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

fn depth_state(write: bool, compare: wgpu::CompareFunction) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn create_instance_buffer(device: &Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Photo Instance Buffer"),
        size: (capacity * std::mem::size_of::<PhotoInstanceRaw>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_depth_texture(device: &Device, size: Size<u32>) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn upload_photo(
    device: &Device,
    queue: &Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    name: &str,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(name),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
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
        label: Some(name),
    })
}
