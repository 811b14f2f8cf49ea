//! Instanced shell pass.
//!
//! Draws a fur mesh once per shell with the host program plus the injected
//! fur blocks. Bind groups:
//!
//! - group 0: camera
//! - group 1: host material uniform
//! - group 2: fur uniform, density texture, sampler, colliders (binding 3,
//!   only when the program compiles them in)

use std::sync::Arc;

use glam::Mat4;
use wgpu::util::DeviceExt;

use super::pipeline_util;
use crate::{
    error::FurError,
    fur::{FurMaterial, FurMesh, FurParameters},
    geometry::{BaseGeometry, VertexAttribute},
    gpu::{
        dynamic_buffer::DynamicBuffer, extension::INSTANCE_OFFSET_LOCATION,
        render_context::RenderContext, shader_composer::ShaderComposer,
        texture::DensityTexture,
    },
};

/// Fur parameters as seen by the program.
/// Must match the WGSL FurUniform struct layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FurUniform {
    /// Inverse model matrix, for bringing world-space colliders into model
    /// space.
    pub inv_model: [[f32; 4]; 4],
    /// Directional bias (uploaded, not applied by the displacement).
    pub gravity: [f32; 3],
    /// Extrusion of the outermost shell.
    pub fur_length: f32,
    /// Density field tiling.
    pub uv_repeat: f32,
    /// Number of active colliders.
    pub collider_count: u32,
    pub(crate) _pad: [f32; 2],
}

impl FurUniform {
    /// Uniform for a mesh drawn with `model`.
    #[must_use]
    pub fn new(params: &FurParameters, model: &Mat4, collider_count: u32) -> Self {
        Self {
            inv_model: model.inverse().to_cols_array_2d(),
            gravity: params.gravity.to_array(),
            fur_length: params.fur_length,
            uv_repeat: params.uv_repeat,
            collider_count,
            _pad: [0.0; 2],
        }
    }
}

/// A host-required attribute resolved against the mesh, in shader location
/// order.
struct BoundAttribute<'a> {
    name: &'static str,
    attribute: &'a VertexAttribute,
    format: wgpu::VertexFormat,
}

/// Resolve the host's required attributes against `mesh`.
fn bind_attributes<'a>(
    material: &FurMaterial,
    mesh: &'a FurMesh,
) -> Result<Vec<BoundAttribute<'a>>, FurError> {
    material
        .host()
        .required_attributes()
        .iter()
        .map(|&name| -> Result<BoundAttribute<'a>, FurError> {
            let attribute = mesh
                .attribute(name)
                .ok_or_else(|| FurError::MissingAttribute(name.to_owned()))?;
            let format = pipeline_util::float_format(attribute.components())
                .ok_or_else(|| FurError::MissingAttribute(format!(
                    "{name} ({} components)",
                    attribute.components()
                )))?;
            Ok(BoundAttribute {
                name,
                attribute,
                format,
            })
        })
        .collect()
}

/// GPU copies of a fur mesh's geometry.
struct MeshBuffers {
    vertex: Vec<DynamicBuffer>,
    instance: DynamicBuffer,
    index: Option<DynamicBuffer>,
    vertex_count: u32,
    index_count: u32,
    instance_count: u32,
}

impl MeshBuffers {
    fn upload(device: &wgpu::Device, bound: &[BoundAttribute<'_>], mesh: &FurMesh) -> Self {
        let vertex = bound
            .iter()
            .map(|b| {
                DynamicBuffer::new_with_data(
                    device,
                    &format!("Fur {} Buffer", b.name),
                    b.attribute.data(),
                    wgpu::BufferUsages::VERTEX,
                )
            })
            .collect();
        let instance = DynamicBuffer::new_with_data(
            device,
            "Fur Shell Offset Buffer",
            mesh.instance_offsets().as_slice(),
            wgpu::BufferUsages::VERTEX,
        );
        let index = mesh.indices().map(|indices| {
            DynamicBuffer::new_with_data(
                device,
                "Fur Index Buffer",
                &indices[..],
                wgpu::BufferUsages::INDEX,
            )
        });
        Self {
            vertex,
            instance,
            index,
            vertex_count: mesh.vertex_count() as u32,
            index_count: mesh.indices().map_or(0, |i| i.len() as u32),
            instance_count: mesh.instance_count(),
        }
    }

    /// Re-upload in place. Returns `false` when the buffer set no longer
    /// matches and must be recreated.
    fn rewrite(
        &mut self,
        context: &RenderContext,
        bound: &[BoundAttribute<'_>],
        mesh: &FurMesh,
    ) -> bool {
        if self.vertex.len() != bound.len()
            || self.index.is_some() != mesh.indices().is_some()
        {
            return false;
        }
        let (device, queue) = (&context.device, &context.queue);
        // Growth results are ignored: these buffers are bound per draw, not
        // through a bind group, so a reallocation leaves nothing stale.
        for (buffer, b) in self.vertex.iter_mut().zip(bound) {
            let _ = buffer.write(device, queue, b.attribute.data());
        }
        let _ = self
            .instance
            .write(device, queue, mesh.instance_offsets().as_slice());
        if let (Some(buffer), Some(indices)) = (self.index.as_mut(), mesh.indices()) {
            let _ = buffer.write(device, queue, &indices[..]);
        }
        self.vertex_count = mesh.vertex_count() as u32;
        self.index_count = mesh.indices().map_or(0, |i| i.len() as u32);
        self.instance_count = mesh.instance_count();
        true
    }
}

/// Draws one fur mesh with its material.
pub struct FurRenderer {
    material: Arc<FurMaterial>,
    pipeline: wgpu::RenderPipeline,
    buffers: MeshBuffers,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    fur_buffer: wgpu::Buffer,
    fur_bind_group: wgpu::BindGroup,
    collider_count: u32,
    // Referenced by `fur_bind_group`.
    _density: DensityTexture,
    _colliders: Option<wgpu::Buffer>,
}

impl FurRenderer {
    /// Build the pipeline and upload `mesh` for drawing.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::MissingMaterial`] when the mesh has no material,
    /// [`FurError::MissingAttribute`] when the host program reads an
    /// attribute the mesh lacks, or a composition error from the program.
    pub fn new(
        context: &RenderContext,
        camera_layout: &wgpu::BindGroupLayout,
        mesh: &FurMesh,
        shader_composer: &mut ShaderComposer,
    ) -> Result<Self, FurError> {
        let material = Arc::clone(mesh.material().ok_or(FurError::MissingMaterial)?);
        let bound = bind_attributes(&material, mesh)?;
        let device = &context.device;
        let label = material.host().label().to_owned();

        let material_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Fur Host Material Layout"),
                entries: &[pipeline_util::uniform_buffer(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                )],
            });
        let material_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Material Buffer")),
                contents: &material.host().uniform_data(&Mat4::IDENTITY),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Material Bind Group")),
            layout: &material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            }],
        });

        let collider_data = material.collider_data();
        let collider_count = collider_data.len() as u32;
        let fur_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fur Uniform Buffer"),
            contents: bytemuck::bytes_of(&FurUniform::new(
                material.params(),
                &Mat4::IDENTITY,
                collider_count,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let colliders = (!collider_data.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fur Collider Buffer"),
                contents: bytemuck::cast_slice(&collider_data),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });
        let density = DensityTexture::upload(device, &context.queue, material.density().as_ref());

        let mut fur_entries = vec![
            pipeline_util::uniform_buffer(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
            pipeline_util::texture_2d(1),
            pipeline_util::filtering_sampler(2),
        ];
        if colliders.is_some() {
            fur_entries.push(pipeline_util::uniform_buffer(3, wgpu::ShaderStages::VERTEX));
        }
        let fur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fur Layout"),
            entries: &fur_entries,
        });

        let mut fur_bindings = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: fur_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&density.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&density.sampler),
            },
        ];
        if let Some(buffer) = &colliders {
            fur_bindings.push(wgpu::BindGroupEntry {
                binding: 3,
                resource: buffer.as_entire_binding(),
            });
        }
        let fur_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fur Bind Group"),
            layout: &fur_layout,
            entries: &fur_bindings,
        });

        let pipeline = Self::create_pipeline(
            context,
            &material,
            &bound,
            &[camera_layout, &material_layout, &fur_layout],
            shader_composer,
        )?;
        let buffers = MeshBuffers::upload(device, &bound, mesh);

        log::info!(
            "fur pipeline '{label}': {} attributes, {} shells, {} colliders",
            bound.len(),
            buffers.instance_count,
            collider_count
        );

        Ok(Self {
            material,
            pipeline,
            buffers,
            material_buffer,
            material_bind_group,
            fur_buffer,
            fur_bind_group,
            collider_count,
            _density: density,
            _colliders: colliders,
        })
    }

    fn create_pipeline(
        context: &RenderContext,
        material: &FurMaterial,
        bound: &[BoundAttribute<'_>],
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        shader_composer: &mut ShaderComposer,
    ) -> Result<wgpu::RenderPipeline, FurError> {
        let label = format!("Fur {}", material.host().label());
        let source = material.shader_source()?;
        let shader =
            shader_composer.compose(&context.device, &label, &source, &material.defines())?;

        let pipeline_layout =
            context
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(&format!("{label} Pipeline Layout")),
                    bind_group_layouts,
                    push_constant_ranges: &[],
                });

        let vertex_attributes: Vec<[wgpu::VertexAttribute; 1]> = bound
            .iter()
            .enumerate()
            .map(|(location, b)| {
                [wgpu::VertexAttribute {
                    format: b.format,
                    offset: 0,
                    shader_location: location as u32,
                }]
            })
            .collect();
        let instance_attributes = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32,
            offset: 0,
            shader_location: INSTANCE_OFFSET_LOCATION,
        }];

        let mut buffers: Vec<wgpu::VertexBufferLayout<'_>> = vertex_attributes
            .iter()
            .map(|attributes| wgpu::VertexBufferLayout {
                array_stride: attributes[0].format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();
        buffers.push(wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<f32>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &instance_attributes,
        });

        Ok(context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{label} Render Pipeline")),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &pipeline_util::hdr_fragment_targets(),
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(pipeline_util::depth_stencil_state()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            }))
    }

    /// Material this renderer draws with.
    #[must_use]
    pub fn material(&self) -> &Arc<FurMaterial> {
        &self.material
    }

    /// Shells drawn per call.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.buffers.instance_count
    }

    /// Colliders bound to the program.
    #[must_use]
    pub fn collider_count(&self) -> u32 {
        self.collider_count
    }

    /// Replace the drawn geometry, keeping the pipeline and material.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::MissingAttribute`] when `base` lacks an attribute
    /// the host program reads.
    pub fn set_geometry(
        &mut self,
        context: &RenderContext,
        base: &BaseGeometry,
    ) -> Result<(), FurError> {
        let mesh = self.material.create_mesh(base)?;
        let bound = bind_attributes(&self.material, &mesh)?;
        if !self.buffers.rewrite(context, &bound, &mesh) {
            self.buffers = MeshBuffers::upload(&context.device, &bound, &mesh);
        }
        Ok(())
    }

    /// Upload per-draw uniforms for a mesh placed with `model`.
    pub fn update(&self, queue: &wgpu::Queue, model: &Mat4) {
        queue.write_buffer(
            &self.material_buffer,
            0,
            &self.material.host().uniform_data(model),
        );
        let uniform = FurUniform::new(self.material.params(), model, self.collider_count);
        queue.write_buffer(&self.fur_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Record the instanced draw into `render_pass`.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        let buffers = &self.buffers;
        if buffers.vertex_count == 0 || buffers.instance_count == 0 {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.material_bind_group, &[]);
        render_pass.set_bind_group(2, &self.fur_bind_group, &[]);
        for (slot, buffer) in buffers.vertex.iter().enumerate() {
            render_pass.set_vertex_buffer(slot as u32, buffer.slice());
        }
        render_pass.set_vertex_buffer(buffers.vertex.len() as u32, buffers.instance.slice());

        let instances = 0..buffers.instance_count;
        match &buffers.index {
            Some(index) if buffers.index_count > 0 => {
                render_pass.set_index_buffer(index.slice(), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..buffers.index_count, 0, instances);
            }
            Some(_) => {}
            None => render_pass.draw(0..buffers.vertex_count, instances),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{
        camera::{binding::CameraBinding, core::Camera},
        fur::{Collider, HostMaterial},
        geometry::{icosphere, POSITION},
        renderer::lambert::LambertMaterial,
    };

    fn material(colliders: &[Collider]) -> Arc<FurMaterial> {
        let host: Arc<dyn HostMaterial> = Arc::new(LambertMaterial::default());
        Arc::new(FurMaterial::new(host, FurParameters::default(), colliders).unwrap())
    }

    #[test]
    fn uniform_matches_wgsl_size() {
        assert_eq!(std::mem::size_of::<FurUniform>(), 96);
    }

    #[test]
    fn host_attributes_bind_in_location_order() {
        let material = material(&[]);
        let mesh = material.create_mesh(&icosphere(1)).unwrap();
        let bound = bind_attributes(&material, &mesh).unwrap();
        let names: Vec<_> = bound.iter().map(|b| b.name).collect();
        assert_eq!(names, ["position", "normal", "uv"]);
        assert_eq!(bound[2].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn attribute_the_host_reads_must_exist() {
        let material = material(&[]);
        let positions = icosphere(0).attribute(POSITION).unwrap().clone();
        let base = BaseGeometry::new().with_attribute(POSITION, positions);
        let mesh = material.create_mesh(&base).unwrap();
        assert!(matches!(
            bind_attributes(&material, &mesh),
            Err(FurError::MissingAttribute(name)) if name == "normal"
        ));
    }

    fn attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
        Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })
    }

    fn render(context: &RenderContext, material: &Arc<FurMaterial>) -> Option<wgpu::Error> {
        let device = &context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let camera = Camera::looking_at_origin(Vec3::new(0.0, 0.5, 3.0), context.aspect());
        let camera_binding = CameraBinding::new(device, &camera);
        let mut composer = ShaderComposer::new().unwrap();
        let mesh = material.create_mesh(&icosphere(2)).unwrap();
        let renderer =
            FurRenderer::new(context, &camera_binding.layout, &mesh, &mut composer).unwrap();
        assert_eq!(renderer.instance_count(), 16);
        renderer.update(&context.queue, &Mat4::from_rotation_y(0.3));

        let size = wgpu::Extent3d {
            width: context.width,
            height: context.height,
            depth_or_array_layers: 1,
        };
        let target = |format, label| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };
        let color = target(pipeline_util::HDR_FORMAT, "Test Color");
        let normal = target(pipeline_util::HDR_FORMAT, "Test Normal");
        let depth = target(pipeline_util::DEPTH_FORMAT, "Test Depth");

        let mut encoder = context.create_encoder();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Fur Test Pass"),
                color_attachments: &[attachment(&color), attachment(&normal)],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            renderer.draw(&mut pass, &camera_binding.bind_group);
        }
        context.submit(encoder);
        let _ = device.poll(wgpu::PollType::Wait);
        pollster::block_on(device.pop_error_scope())
    }

    #[test]
    fn draws_shells_with_and_without_colliders() {
        let Ok(context) = pollster::block_on(RenderContext::headless(64, 64)) else {
            // No adapter on this machine.
            return;
        };
        assert!(render(&context, &material(&[])).is_none());
        let colliders = [
            Collider::new(Vec3::new(0.0, 1.0, 0.0), 0.4),
            Collider::new(Vec3::new(0.9, 0.2, 0.0), 0.25),
        ];
        assert!(render(&context, &material(&colliders)).is_none());
    }

    #[test]
    fn set_geometry_reuploads_and_checks_attributes() {
        let Ok(context) = pollster::block_on(RenderContext::headless(32, 32)) else {
            return;
        };
        let material = material(&[]);
        let camera = Camera::looking_at_origin(Vec3::Z * 3.0, 1.0);
        let camera_binding = CameraBinding::new(&context.device, &camera);
        let mut composer = ShaderComposer::new().unwrap();
        let mesh = material.create_mesh(&icosphere(0)).unwrap();
        let mut renderer =
            FurRenderer::new(&context, &camera_binding.layout, &mesh, &mut composer).unwrap();

        renderer.set_geometry(&context, &icosphere(3)).unwrap();
        assert_eq!(renderer.buffers.vertex_count, 642);
        assert_eq!(renderer.buffers.index_count, 1280 * 3);
        assert_eq!(renderer.instance_count(), 16);

        let positions = icosphere(0).attribute(POSITION).unwrap().clone();
        let bare = BaseGeometry::new().with_attribute(POSITION, positions);
        assert!(matches!(
            renderer.set_geometry(&context, &bare),
            Err(FurError::MissingAttribute(_))
        ));
        assert_eq!(renderer.buffers.vertex_count, 642);
    }
}
