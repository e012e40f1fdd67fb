//! Texture objects, including buffer textures.

use super::buffer::ArrayBuffer;
use super::driver::{
    BufferTarget, BufferUsage, Driver, TexImage, TextureHandle, TextureTarget,
};
use crate::error::GlError;

#[allow(clippy::cast_possible_wrap)]
const NEAREST: i32 = glow::NEAREST as i32;

/// Size of a texture upload. Unused dimensions are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureExtent {
    /// Width in texels.
    pub width: i32,
    /// Height in texels.
    pub height: i32,
    /// Depth in texels.
    pub depth: i32,
}

impl TextureExtent {
    /// Extent of a 2D image.
    #[must_use]
    pub const fn d2(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            depth: 0,
        }
    }

    /// Extent of a 3D image.
    #[must_use]
    pub const fn d3(width: i32, height: i32, depth: i32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// A texture with nearest filtering, or a buffer texture backed by its own
/// dynamic buffer object.
#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    target: TextureTarget,
    format: u32,
    upload_format: u32,
    buffer: Option<ArrayBuffer>,
}

impl Texture {
    /// Create a texture. `format` is the internal format; `upload_format`
    /// is the pixel format of 3D uploads and defaults to `format`.
    ///
    /// # Errors
    ///
    /// [`GlError::ResourceCreation`] if a driver object cannot be created
    /// or the buffer cannot be attached to a buffer texture.
    pub fn new(
        gl: &dyn Driver,
        target: TextureTarget,
        format: u32,
        upload_format: Option<u32>,
    ) -> Result<Self, GlError> {
        let handle = gl.create_texture().map_err(GlError::ResourceCreation)?;

        let buffer = if target == TextureTarget::Buffer {
            match ArrayBuffer::new(gl, BufferTarget::Texture, BufferUsage::DynamicDraw)
            {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    gl.delete_texture(handle);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let texture = Self {
            handle,
            target,
            format,
            upload_format: upload_format.unwrap_or(format),
            buffer,
        };
        texture.bind(gl);

        let attached = texture
            .buffer
            .as_ref()
            .map(|buffer| gl.tex_buffer(format, buffer.handle()));
        match attached {
            Some(Err(e)) => {
                texture.destroy(gl);
                return Err(GlError::ResourceCreation(e));
            }
            Some(Ok(())) => {}
            None => {
                gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, NEAREST);
                gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, NEAREST);
            }
        }

        Ok(texture)
    }

    /// Bind the texture (and, for buffer textures, its buffer).
    pub fn bind(&self, gl: &dyn Driver) {
        gl.bind_texture(self.target, Some(self.handle));
        if let Some(buffer) = &self.buffer {
            buffer.bind(gl);
        }
    }

    /// Upload `data`. 1D textures take their width from the element count
    /// of `data`; buffer textures are reallocated to the byte size of
    /// `data` and then filled.
    pub fn store<T: bytemuck::Pod>(
        &self,
        gl: &dyn Driver,
        data: &[T],
        pixel_type: u32,
        extent: TextureExtent,
    ) {
        self.bind(gl);
        let bytes: &[u8] = bytemuck::cast_slice(data);

        if let Some(buffer) = &self.buffer {
            buffer.allocate(gl, bytes.len());
            buffer.update(gl, 0, bytes);
            return;
        }

        let (width, format) = match self.target {
            TextureTarget::D1 => {
                (i32::try_from(data.len()).unwrap_or(i32::MAX), self.format)
            }
            TextureTarget::D3 => (extent.width, self.upload_format),
            TextureTarget::D2 | TextureTarget::Buffer => (extent.width, self.format),
        };
        gl.tex_image(&TexImage {
            target: self.target,
            internal_format: self.format,
            width,
            height: extent.height,
            depth: extent.depth,
            format,
            pixel_type,
            data: bytes,
        });
    }

    /// Driver handle.
    #[must_use]
    pub const fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Texture target.
    #[must_use]
    pub const fn target(&self) -> TextureTarget {
        self.target
    }

    /// Backing buffer of a buffer texture.
    #[must_use]
    pub const fn buffer(&self) -> Option<&ArrayBuffer> {
        self.buffer.as_ref()
    }

    /// Delete the texture and its backing buffer.
    pub fn destroy(self, gl: &dyn Driver) {
        gl.delete_texture(self.handle);
        if let Some(buffer) = self.buffer {
            buffer.destroy(gl);
        }
    }
}
