use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::device::Gpu;
use crate::render::mesh::{ColorVertex, IndexedDraw, Mesh};
use crate::render::shader::{capabilities_for, ProgramInterface, ProgramSource, ShaderProgram, UniformSlot};
use crate::render::transform::{Transform, TransformUniform};
use crate::render::{RenderCtx, RenderTarget};

/// Where the shader expects the transform matrix.
pub const TRANSFORM_SLOT: UniformSlot = UniformSlot {
    group: 0,
    binding: 0,
    size: TransformUniform::SIZE as u32,
};

/// What one `render` call submitted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub draw_calls: u32,
    pub indices: u32,
}

/// Draws one indexed mesh with a single transform uniform.
///
/// Buffers and the pipeline are created once at construction, for the
/// surface and depth formats of the [`Gpu`] it was built on.
pub struct QuadRenderer {
    draw: IndexedDraw,

    surface_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    pipeline: wgpu::RenderPipeline,

    bind_group: wgpu::BindGroup,
    transform_ubo: wgpu::Buffer,

    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
}

impl QuadRenderer {
    /// Checks the built-in program against [`ColorVertex`] and uploads `mesh`.
    pub fn new(gpu: &Gpu<'_>, mesh: Mesh<'_>) -> Result<Self> {
        Self::with_program(gpu, ProgramSource::quad(), mesh)
    }

    /// Checks `source` against [`ColorVertex`], uploads `mesh` and builds the
    /// pipeline for `gpu`'s surface and depth formats.
    ///
    /// Fails before touching the device if the mesh is malformed or the program
    /// does not compile or link, and fails afterwards if the device rejects
    /// the shader module or the pipeline.
    pub fn with_program(gpu: &Gpu<'_>, source: ProgramSource, mesh: Mesh<'_>) -> Result<Self> {
        Self::create(gpu.device(), gpu.surface_format(), gpu.depth_format(), source, mesh)
    }

    fn create(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        source: ProgramSource,
        mesh: Mesh<'_>,
    ) -> Result<Self> {
        let label = source.label;

        mesh.validate().context("invalid mesh")?;
        let draw = mesh.indexed_draw().context("invalid mesh")?;
        let program = ShaderProgram::check(
            source,
            &ProgramInterface {
                attributes: &ColorVertex::ATTRS,
                uniforms: &[TRANSFORM_SLOT],
                capabilities: capabilities_for(device.features()),
            },
        )
        .with_context(|| format!("shader program {label:?} failed to build"))?;

        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mogl quad vbo"),
            contents: bytemuck::cast_slice(mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mogl quad ibo"),
            contents: bytemuck::cast_slice(mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let transform_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mogl quad transform ubo"),
            contents: bytemuck::bytes_of(&Transform::IDENTITY.uniform()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mogl quad bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: TRANSFORM_SLOT.binding,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(TransformUniform::SIZE),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mogl quad bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: TRANSFORM_SLOT.binding,
                resource: transform_ubo.as_entire_binding(),
            }],
        });

        let pipeline = build_pipeline(device, &program, &bind_group_layout, surface_format, depth_format)
            .with_context(|| format!("shader program {label:?} failed to build"))?;

        log::info!(
            "quad renderer ready: {} vertices, {} indices",
            mesh.vertices.len(),
            draw.index_count()
        );

        Ok(Self {
            draw,
            surface_format,
            depth_format,
            pipeline,
            bind_group,
            transform_ubo,
            vbo,
            ibo,
        })
    }

    /// Uploads `transform` and draws the mesh once into `target`.
    ///
    /// Nothing is drawn into a zero-area viewport.
    pub fn render(
        &self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        transform: &Transform,
    ) -> DrawStats {
        if !ctx.viewport.is_drawable() {
            return DrawStats::default();
        }

        if (ctx.surface_format, ctx.depth_format) != (self.surface_format, self.depth_format) {
            log::warn!(
                "quad pipeline targets {:?} / depth {:?}, frame is {:?} / depth {:?}; skipping draw",
                self.surface_format,
                self.depth_format,
                ctx.surface_format,
                ctx.depth_format
            );
            return DrawStats::default();
        }

        ctx.queue
            .write_buffer(&self.transform_ubo, 0, bytemuck::bytes_of(&transform.uniform()));

        let depth_stencil_attachment =
            target
                .depth_view
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mogl quad pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        ctx.viewport.apply(&mut rpass);
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(TRANSFORM_SLOT.group, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vbo.slice(..));
        rpass.set_index_buffer(self.ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(
            self.draw.indices.clone(),
            self.draw.base_vertex,
            self.draw.instances.clone(),
        );

        DrawStats {
            draw_calls: 1,
            indices: self.draw.index_count(),
        }
    }
}

/// Creates the shader module and pipeline inside a validation error scope so
/// a rejection comes back as `Err` instead of reaching the uncaptured-error
/// handler.
fn build_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    bind_group_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
) -> Result<wgpu::RenderPipeline> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = program.create_module(device);

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("mogl quad pipeline layout"),
        bind_group_layouts: &[bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("mogl quad pipeline"),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(program.vertex_entry()),
            compilation_options: Default::default(),
            buffers: &[ColorVertex::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(program.fragment_entry()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(scope.pop()) {
        anyhow::bail!("device rejected the pipeline: {err}");
    }

    log::debug!(
        "built {:?} pipeline for {:?} / depth {:?}",
        program.label(),
        surface_format,
        depth_format
    );
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mesh::QUAD_VERTICES;

    /// A device without a surface, or `None` on machines with no usable adapter.
    fn headless_device() -> Option<wgpu::Device> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .ok()?;
            let (device, _queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()?;
            Some(device)
        })
    }

    const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    const DEPTH: Option<wgpu::TextureFormat> = Some(wgpu::TextureFormat::Depth24Plus);

    #[test]
    fn invalid_mesh_fails_before_the_device() {
        let Some(device) = headless_device() else { return };
        let mesh = Mesh::new(&QUAD_VERTICES, &[0, 1]);
        let err = QuadRenderer::create(&device, COLOR, DEPTH, ProgramSource::quad(), mesh)
            .err()
            .expect("two indices are not a triangle");
        assert!(format!("{err:#}").contains("invalid mesh"), "{err:#}");
    }

    #[test]
    fn pipeline_is_built_eagerly() {
        let Some(device) = headless_device() else { return };
        let renderer = QuadRenderer::create(&device, COLOR, DEPTH, ProgramSource::quad(), Mesh::quad()).unwrap();
        assert_eq!(renderer.draw.index_count(), 6);
        assert_eq!((renderer.surface_format, renderer.depth_format), (COLOR, DEPTH));
    }

    #[test]
    fn device_rejection_is_returned_as_an_error() {
        let Some(device) = headless_device() else { return };
        // A color format in the depth slot passes the shader check but not
        // pipeline validation.
        let err = QuadRenderer::create(&device, COLOR, Some(COLOR), ProgramSource::quad(), Mesh::quad())
            .err()
            .expect("pipeline with a color depth attachment");
        assert!(format!("{err:#}").contains("device rejected"), "{err:#}");
    }
}
