//! Graphics resources and the driver they talk to.
//!
//! Every wrapper takes the driver as `&dyn Driver` on each call, the same
//! way device handles are threaded through rendering code, and releases its
//! object with an explicit `destroy`.

/// Buffer objects.
pub mod buffer;
/// The driver trait and raw handle types.
pub mod driver;
/// [`Driver`] implementation over a `glow` context.
pub mod glow_driver;
/// Timer, occlusion and primitive queries.
pub mod query;
/// Textures and buffer textures.
pub mod texture;
/// Vertex array objects.
pub mod vertex_array;

#[cfg(test)]
pub(crate) mod recording;

pub use buffer::ArrayBuffer;
pub use driver::{
    ActiveVariable, BufferHandle, BufferTarget, BufferUsage, Driver,
    DriverInfo, IntegerComponent, ProgramBinary, ProgramHandle, QueryHandle,
    QueryTarget, ShaderHandle, TexImage, TextureHandle, TextureTarget,
    UniformLocation, VertexArrayHandle,
};
pub use glow_driver::GlowDriver;
pub use query::{gpu_time, Query};
pub use texture::{Texture, TextureExtent};
pub use vertex_array::VertexArray;
