//! Growable GPU buffers.
//!
//! Fur meshes are rebuilt when the base geometry changes; the buffers keep
//! their allocation when the new data fits and double when it does not.

use wgpu::util::DeviceExt;

/// A GPU buffer that can grow dynamically.
///
/// Never shrinks (GPU buffers cannot be resized in place).
pub struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: usize, // bytes
    len: usize,      // bytes
    usage: wgpu::BufferUsages,
    label: String,
}

impl DynamicBuffer {
    /// Buffer initialized from existing data.
    pub fn new_with_data<T: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        data: &[T],
        usage: wgpu::BufferUsages,
    ) -> Self {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = if bytes.is_empty() {
            // wgpu rejects zero-sized bindings; keep a small placeholder
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: 64,
                usage: usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            })
        };

        Self {
            buffer,
            capacity: bytes.len().max(64),
            len: bytes.len(),
            usage,
            label: label.to_owned(),
        }
    }

    /// Write data to the buffer, growing if necessary.
    ///
    /// Returns `true` if the buffer was reallocated (bind groups holding it
    /// need recreation).
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let needed = bytes.len();

        let reallocated = if needed > self.capacity {
            let new_capacity = (needed * 2).max(self.capacity + 1024);
            log::debug!(
                "growing '{}' from {} to {} bytes",
                self.label,
                self.capacity,
                new_capacity
            );
            self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&self.label),
                size: new_capacity as u64,
                usage: self.usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.capacity = new_capacity;
            true
        } else {
            false
        };

        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
        self.len = needed;
        reallocated
    }

    /// The underlying wgpu buffer.
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Slice covering only the written bytes.
    #[must_use]
    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..self.len as u64)
    }

    /// Bytes currently written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no data has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated size in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
