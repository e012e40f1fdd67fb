//! Vertex array objects.

use super::driver::{Driver, VertexArrayHandle};
use crate::error::GlError;

/// A vertex array object. Creating one leaves it bound.
#[derive(Debug)]
pub struct VertexArray {
    handle: VertexArrayHandle,
}

impl VertexArray {
    /// Create and bind a vertex array.
    ///
    /// # Errors
    ///
    /// [`GlError::ResourceCreation`] if the driver cannot create the object.
    pub fn new(gl: &dyn Driver) -> Result<Self, GlError> {
        let handle = gl.create_vertex_array().map_err(GlError::ResourceCreation)?;
        let vao = Self { handle };
        vao.bind(gl);
        Ok(vao)
    }

    /// Bind this vertex array.
    pub fn bind(&self, gl: &dyn Driver) {
        gl.bind_vertex_array(Some(self.handle));
    }

    /// Unbind whatever vertex array is bound.
    pub fn unbind(gl: &dyn Driver) {
        gl.bind_vertex_array(None);
    }

    /// Run `f` with this vertex array bound, unbinding afterwards.
    pub fn with_bound<R>(&self, gl: &dyn Driver, f: impl FnOnce() -> R) -> R {
        self.bind(gl);
        let result = f();
        Self::unbind(gl);
        result
    }

    /// Driver handle.
    #[must_use]
    pub const fn handle(&self) -> VertexArrayHandle {
        self.handle
    }

    /// Delete the vertex array.
    pub fn destroy(self, gl: &dyn Driver) {
        gl.delete_vertex_array(self.handle);
    }
}
