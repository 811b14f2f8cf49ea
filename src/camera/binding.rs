use wgpu::util::DeviceExt;

use super::core::{Camera, CameraUniform};

/// Camera uniform buffer with the group 0 layout and bind group every fur
/// pipeline expects.
pub struct CameraBinding {
    /// Uniform buffer holding a [`CameraUniform`].
    pub buffer: wgpu::Buffer,
    /// Layout for bind group 0.
    pub layout: wgpu::BindGroupLayout,
    /// Bind group over `buffer`.
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    /// Create the buffer and bind group, initialized from `camera`.
    #[must_use]
    pub fn new(device: &wgpu::Device, camera: &Camera) -> Self {
        let uniform = CameraUniform::from(camera);
        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });

        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Camera Bind Group"),
        });

        Self {
            buffer,
            layout,
            bind_group,
        }
    }

    /// Upload the current state of `camera`.
    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera) {
        let uniform = CameraUniform::from(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}
