//! Buffer objects.

use super::driver::{BufferHandle, BufferTarget, BufferUsage, Driver};
use crate::error::GlError;

/// A buffer object with a fixed binding target and usage hint.
#[derive(Debug)]
pub struct ArrayBuffer {
    handle: BufferHandle,
    target: BufferTarget,
    usage: BufferUsage,
}

impl ArrayBuffer {
    /// Create a buffer object. No storage is allocated until the first
    /// store.
    ///
    /// # Errors
    ///
    /// [`GlError::ResourceCreation`] if the driver cannot create the object.
    pub fn new(
        gl: &dyn Driver,
        target: BufferTarget,
        usage: BufferUsage,
    ) -> Result<Self, GlError> {
        let handle = gl.create_buffer().map_err(GlError::ResourceCreation)?;
        Ok(Self {
            handle,
            target,
            usage,
        })
    }

    /// Static-draw vertex buffer, the common case.
    ///
    /// # Errors
    ///
    /// See [`ArrayBuffer::new`].
    pub fn vertex(gl: &dyn Driver) -> Result<Self, GlError> {
        Self::new(gl, BufferTarget::Array, BufferUsage::StaticDraw)
    }

    /// Bind to this buffer's target.
    pub fn bind(&self, gl: &dyn Driver) {
        gl.bind_buffer(self.target, Some(self.handle));
    }

    /// Replace the contents with `data`. The allocation is exactly the byte
    /// size of the slice.
    pub fn store<T: bytemuck::Pod>(&self, gl: &dyn Driver, data: &[T]) {
        self.store_bytes(gl, bytemuck::cast_slice(data));
    }

    /// Replace the contents with raw bytes.
    pub fn store_bytes(&self, gl: &dyn Driver, data: &[u8]) {
        self.bind(gl);
        gl.buffer_data(self.target, data, self.usage);
    }

    /// Allocate `size` uninitialized bytes, dropping the old contents.
    pub fn allocate(&self, gl: &dyn Driver, size: usize) {
        self.bind(gl);
        gl.buffer_data_size(self.target, size, self.usage);
    }

    /// Overwrite a byte range starting at `offset` without reallocating.
    pub fn update<T: bytemuck::Pod>(&self, gl: &dyn Driver, offset: usize, data: &[T]) {
        self.bind(gl);
        gl.buffer_sub_data(self.target, offset, bytemuck::cast_slice(data));
    }

    /// Driver handle.
    #[must_use]
    pub const fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Binding target.
    #[must_use]
    pub const fn target(&self) -> BufferTarget {
        self.target
    }

    /// Delete the buffer object.
    pub fn destroy(self, gl: &dyn Driver) {
        gl.delete_buffer(self.handle);
    }
}
