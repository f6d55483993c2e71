//! `wgpu` implementation of [`GlBackend`].
//!
//! One uber-shader pipeline per (topology, depth, blend, cull) combination,
//! cached for the lifetime of the backend. Vertex and index data stream
//! through reusable scratch buffers; every draw is encoded and submitted
//! individually, matching the call-at-a-time legacy semantics.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::shader;
use crate::state::NativeCapability;
use crate::uniforms::GLOBALS_SIZE;

use super::{
    BackendError, DrawSubmission, FilterMode, GlBackend, IndexSlice, InitError, NativePrimitive,
    SamplerDesc, TextureId, TextureUpload, WrapMode,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    topology: wgpu::PrimitiveTopology,
    depth_test: bool,
    blend: bool,
    cull: bool,
}

struct StoredTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: (u32, u32),
    format: wgpu::TextureFormat,
}

/// A buffer that grows to fit the largest upload seen so far.
struct ScratchBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl ScratchBuffer {
    fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages, size: u64) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        Self {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            }),
            capacity: size,
            usage,
            label,
        }
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) {
        // write_buffer requires sizes aligned to COPY_BUFFER_ALIGNMENT; odd
        // u16 index counts need padding.
        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        let padded;
        let data = if data.len() % align != 0 {
            let mut owned = data.to_vec();
            owned.resize(data.len().next_multiple_of(align), 0);
            padded = owned;
            &padded[..]
        } else {
            data
        };
        let needed = data.len() as u64;
        if needed > self.capacity {
            let capacity = needed.next_power_of_two();
            debug!(label = self.label, capacity, "growing scratch buffer");
            self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: capacity,
                usage: self.usage,
                mapped_at_creation: false,
            });
            self.capacity = capacity;
        }
        queue.write_buffer(&self.buffer, 0, data);
    }
}

struct RenderTarget {
    view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    target: Option<RenderTarget>,

    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    uniform_buffer: wgpu::Buffer,
    vertex_scratch: ScratchBuffer,
    index_scratch: ScratchBuffer,

    textures: HashMap<TextureId, StoredTexture>,
    next_texture: u32,
    white: StoredTexture,

    depth_test: bool,
    blend: bool,
    cull_face: bool,
}

impl WgpuBackend {
    /// Wraps an existing device/queue pair. `target_format` must match the
    /// views later passed to [`set_render_target`](Self::set_render_target).
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, target_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glbridge uber-shader"),
            source: wgpu::ShaderSource::Wgsl(shader::UBER_SHADER.into()),
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glbridge bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(GLOBALS_SIZE as u64),
                    },
                    count: None,
                },
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glbridge pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glbridge globals"),
            size: GLOBALS_SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vertex_scratch = ScratchBuffer::new(
            &device,
            "glbridge vertices",
            wgpu::BufferUsages::VERTEX,
            64 * 1024,
        );
        let index_scratch = ScratchBuffer::new(
            &device,
            "glbridge indices",
            wgpu::BufferUsages::INDEX,
            16 * 1024,
        );

        let white = Self::make_texture(
            &device,
            &queue,
            &TextureUpload {
                width: 1,
                height: 1,
                format: wgpu::TextureFormat::Rgba8Unorm,
                bytes_per_pixel: 4,
                data: &[255, 255, 255, 255],
            },
            SamplerDesc::default(),
            "glbridge white fallback",
        );

        info!(?target_format, "glbridge wgpu backend ready");
        Self {
            device,
            queue,
            target_format,
            target: None,
            shader,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            uniform_buffer,
            vertex_scratch,
            index_scratch,
            textures: HashMap::new(),
            next_texture: 0,
            white,
            depth_test: false,
            blend: false,
            cull_face: false,
        }
    }

    /// Creates a backend with its own adapter, device and offscreen target.
    ///
    /// Primarily intended for tests and offscreen rendering.
    pub async fn new_headless() -> Result<Self, InitError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(InitError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("glbridge wgpu backend"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await?;
        let mut backend = Self::new(device, queue, wgpu::TextureFormat::Rgba8Unorm);
        backend.set_offscreen_target(256, 256);
        Ok(backend)
    }

    /// Points subsequent draws at `view`, which must use the backend's target
    /// format. A matching depth buffer is (re)allocated.
    pub fn set_render_target(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        let depth = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glbridge depth"),
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
        self.target = Some(RenderTarget {
            view,
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        });
    }

    /// Allocates an offscreen color target and draws into it.
    pub fn set_offscreen_target(&mut self, width: u32, height: u32) {
        let color = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glbridge offscreen target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.target_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = color.create_view(&wgpu::TextureViewDescriptor::default());
        self.set_render_target(view, width, height);
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn make_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        upload: &TextureUpload<'_>,
        sampler: SamplerDesc,
        label: &str,
    ) -> StoredTexture {
        let size = wgpu::Extent3d {
            width: upload.width,
            height: upload.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: upload.format,
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
            upload.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.width * upload.bytes_per_pixel),
                rows_per_image: Some(upload.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Self::make_sampler(device, sampler);
        StoredTexture {
            texture,
            view,
            sampler,
            size: (upload.width, upload.height),
            format: upload.format,
        }
    }

    fn make_sampler(device: &wgpu::Device, desc: SamplerDesc) -> wgpu::Sampler {
        let filter = |mode| match mode {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let wrap = |mode| match mode {
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        };
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glbridge sampler"),
            address_mode_u: wrap(desc.wrap_s),
            address_mode_v: wrap(desc.wrap_t),
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: filter(desc.mag_filter),
            min_filter: filter(desc.min_filter),
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }

    fn pipeline(&mut self, key: PipelineKey) -> &wgpu::RenderPipeline {
        if !self.pipelines.contains_key(&key) {
            debug!(?key, "building uber-shader pipeline");
            let blend = key.blend.then_some(wgpu::BlendState::ALPHA_BLENDING);
            let pipeline = self
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("glbridge pipeline"),
                    layout: Some(&self.pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &self.shader,
                        entry_point: "vs_main",
                        buffers: &[shader::vertex_layout()],
                        compilation_options: Default::default(),
                    },
                    primitive: wgpu::PrimitiveState {
                        topology: key.topology,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: key.cull.then_some(wgpu::Face::Back),
                        unclipped_depth: false,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        conservative: false,
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: key.depth_test,
                        depth_compare: if key.depth_test {
                            wgpu::CompareFunction::LessEqual
                        } else {
                            wgpu::CompareFunction::Always
                        },
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    fragment: Some(wgpu::FragmentState {
                        module: &self.shader,
                        entry_point: "fs_main",
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: self.target_format,
                            blend,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    multiview: None,
                });
            self.pipelines.insert(key, pipeline);
        }
        &self.pipelines[&key]
    }
}

/// Index stream after fan/loop lowering.
enum LoweredIndices<'a> {
    None,
    BorrowedU16(&'a [u16]),
    BorrowedU32(&'a [u32]),
    Owned(Vec<u32>),
}

/// Rewrites topologies `wgpu` has no equivalent for. Triangle fans become
/// indexed triangle lists; line loops become line strips with a closing
/// index. All other topologies pass through.
fn lower_primitive<'a>(
    primitive: NativePrimitive,
    vertex_count: usize,
    indices: Option<IndexSlice<'a>>,
) -> (wgpu::PrimitiveTopology, LoweredIndices<'a>) {
    let source: Box<dyn Fn(usize) -> u32 + 'a> = match indices {
        Some(IndexSlice::U16(v)) => Box::new(move |i| u32::from(v[i])),
        Some(IndexSlice::U32(v)) => Box::new(move |i| v[i]),
        None => Box::new(|i| i as u32),
    };
    let count = indices.map_or(vertex_count, |ix| ix.len());
    match primitive {
        NativePrimitive::TriangleFan => {
            let mut out = Vec::with_capacity(count.saturating_sub(2) * 3);
            for i in 1..count.saturating_sub(1) {
                out.extend_from_slice(&[source(0), source(i), source(i + 1)]);
            }
            (wgpu::PrimitiveTopology::TriangleList, LoweredIndices::Owned(out))
        }
        NativePrimitive::LineLoop => {
            let mut out = Vec::with_capacity(count + 1);
            for i in 0..count {
                out.push(source(i));
            }
            if count > 2 {
                out.push(source(0));
            }
            (wgpu::PrimitiveTopology::LineStrip, LoweredIndices::Owned(out))
        }
        other => {
            let topology = match other {
                NativePrimitive::Points => wgpu::PrimitiveTopology::PointList,
                NativePrimitive::Lines => wgpu::PrimitiveTopology::LineList,
                NativePrimitive::LineStrip => wgpu::PrimitiveTopology::LineStrip,
                NativePrimitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
                NativePrimitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
                NativePrimitive::TriangleFan | NativePrimitive::LineLoop => unreachable!(),
            };
            let lowered = match indices {
                Some(IndexSlice::U16(v)) => LoweredIndices::BorrowedU16(v),
                Some(IndexSlice::U32(v)) => LoweredIndices::BorrowedU32(v),
                None => LoweredIndices::None,
            };
            (topology, lowered)
        }
    }
}

impl GlBackend for WgpuBackend {
    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureId, BackendError> {
        if upload.data.len() != upload.expected_len() {
            return Err(BackendError::UploadSizeMismatch {
                expected: upload.expected_len(),
                actual: upload.data.len(),
            });
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        let stored = Self::make_texture(
            &self.device,
            &self.queue,
            upload,
            SamplerDesc::default(),
            "glbridge texture",
        );
        self.textures.insert(id, stored);
        Ok(id)
    }

    fn update_texture(
        &mut self,
        id: TextureId,
        upload: &TextureUpload<'_>,
    ) -> Result<(), BackendError> {
        if upload.data.len() != upload.expected_len() {
            return Err(BackendError::UploadSizeMismatch {
                expected: upload.expected_len(),
                actual: upload.data.len(),
            });
        }
        let existing = self
            .textures
            .get_mut(&id)
            .ok_or(BackendError::UnknownTexture(id))?;
        if existing.size != (upload.width, upload.height) || existing.format != upload.format {
            // Size or format change needs a fresh allocation; keep the
            // caller's sampler settings.
            let sampler = std::mem::replace(
                &mut existing.sampler,
                Self::make_sampler(&self.device, SamplerDesc::default()),
            );
            let mut stored = Self::make_texture(
                &self.device,
                &self.queue,
                upload,
                SamplerDesc::default(),
                "glbridge texture",
            );
            stored.sampler = sampler;
            *existing = stored;
        } else {
            self.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &existing.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                upload.data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(upload.width * upload.bytes_per_pixel),
                    rows_per_image: Some(upload.height),
                },
                wgpu::Extent3d {
                    width: upload.width,
                    height: upload.height,
                    depth_or_array_layers: 1,
                },
            );
        }
        Ok(())
    }

    fn set_sampler(&mut self, id: TextureId, desc: SamplerDesc) -> Result<(), BackendError> {
        let texture = self
            .textures
            .get_mut(&id)
            .ok_or(BackendError::UnknownTexture(id))?;
        texture.sampler = Self::make_sampler(&self.device, desc);
        Ok(())
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn supports_wide_indices(&self) -> bool {
        true
    }

    fn set_native_capability(&mut self, cap: NativeCapability, enabled: bool) {
        match cap {
            NativeCapability::DepthTest => self.depth_test = enabled,
            NativeCapability::Blend => self.blend = enabled,
            NativeCapability::CullFace => self.cull_face = enabled,
            // Scissor/stencil/offset/dither carry no useful toggle-only
            // state for this render path.
            _ => {}
        }
    }

    fn draw(&mut self, submission: DrawSubmission<'_>) -> Result<(), BackendError> {
        if submission.vertices.is_empty() {
            return Ok(());
        }
        for texture in submission.textures.into_iter().flatten() {
            if !self.textures.contains_key(&texture) {
                return Err(BackendError::UnknownTexture(texture));
            }
        }
        if self.target.is_none() {
            return Err(BackendError::NoRenderTarget);
        }

        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(submission.globals),
        );
        self.vertex_scratch.write(
            &self.device,
            &self.queue,
            bytemuck::cast_slice(submission.vertices),
        );

        let (topology, lowered) =
            lower_primitive(submission.primitive, submission.vertices.len(), submission.indices);
        let index_draw = match &lowered {
            LoweredIndices::None => None,
            LoweredIndices::BorrowedU16(v) => {
                self.index_scratch
                    .write(&self.device, &self.queue, bytemuck::cast_slice(v));
                Some((wgpu::IndexFormat::Uint16, v.len() as u32))
            }
            LoweredIndices::BorrowedU32(v) => {
                self.index_scratch
                    .write(&self.device, &self.queue, bytemuck::cast_slice(v));
                Some((wgpu::IndexFormat::Uint32, v.len() as u32))
            }
            LoweredIndices::Owned(v) => {
                if v.is_empty() {
                    return Ok(());
                }
                self.index_scratch
                    .write(&self.device, &self.queue, bytemuck::cast_slice(v));
                Some((wgpu::IndexFormat::Uint32, v.len() as u32))
            }
        };

        let unit0 = submission.textures[0]
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.white);
        let unit1 = submission.textures[1]
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.white);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glbridge bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&unit0.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&unit0.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&unit1.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&unit1.sampler),
                },
            ],
        });

        let key = PipelineKey {
            topology,
            depth_test: self.depth_test,
            blend: self.blend,
            cull: self.cull_face,
        };
        self.pipeline(key);
        let pipeline = &self.pipelines[&key];
        let target = self.target.as_ref().ok_or(BackendError::NoRenderTarget)?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glbridge draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glbridge pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_scratch.buffer.slice(..));
            match index_draw {
                Some((format, count)) => {
                    pass.set_index_buffer(self.index_scratch.buffer.slice(..), format);
                    pass.draw_indexed(0..count, 0, 0..1);
                }
                None => {
                    pass.draw(0..submission.vertices.len() as u32, 0..1);
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}
