//! Vertex attribute discovery and buffer binding.

use rustc_hash::FxHashMap;

use crate::error::GlError;
use crate::gpu::{ArrayBuffer, Driver, IntegerComponent, ProgramHandle};

/// Byte layout of one attribute inside its buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttribLayout {
    /// Distance between consecutive elements, 0 for tightly packed.
    pub stride: i32,
    /// Byte offset of the first element.
    pub offset: i32,
}

impl AttribLayout {
    /// Interleaved layout.
    #[must_use]
    pub const fn new(stride: i32, offset: i32) -> Self {
        Self { stride, offset }
    }
}

/// One active vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Attribute location.
    pub location: u32,
    /// Raw driver type enumeration.
    pub gl_type: u32,
    /// Array length, 1 for scalars.
    pub size: i32,
}

/// Pointer call for an attribute type: integer or float, and component
/// count. Other types (matrices, doubles) get no pointer call.
fn pointer_kind(gl_type: u32) -> Option<(Option<IntegerComponent>, i32)> {
    let int = Some(IntegerComponent::Int);
    let uint = Some(IntegerComponent::UnsignedInt);
    Some(match gl_type {
        glow::INT => (int, 1),
        glow::INT_VEC2 => (int, 2),
        glow::INT_VEC3 => (int, 3),
        glow::INT_VEC4 => (int, 4),
        glow::UNSIGNED_INT => (uint, 1),
        glow::UNSIGNED_INT_VEC2 => (uint, 2),
        glow::UNSIGNED_INT_VEC3 => (uint, 3),
        glow::UNSIGNED_INT_VEC4 => (uint, 4),
        glow::FLOAT => (None, 1),
        glow::FLOAT_VEC2 => (None, 2),
        glow::FLOAT_VEC3 => (None, 3),
        glow::FLOAT_VEC4 => (None, 4),
        _ => return None,
    })
}

/// Active vertex attributes of a linked program.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: FxHashMap<String, AttributeInfo>,
    permissive: bool,
}

impl Attributes {
    pub(crate) fn discover(
        gl: &dyn Driver,
        program: ProgramHandle,
        permissive: bool,
    ) -> Self {
        let entries = gl
            .active_attributes(program)
            .into_iter()
            .filter_map(|var| {
                let location = gl.attrib_location(program, &var.name)?;
                let info = AttributeInfo {
                    location,
                    gl_type: var.gl_type,
                    size: var.size,
                };
                Some((var.name, info))
            })
            .collect();
        Self {
            entries,
            permissive,
        }
    }

    /// Whether `name` is an active attribute.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Descriptor of an active attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeInfo> {
        self.entries.get(name)
    }

    /// Location of an active attribute.
    #[must_use]
    pub fn location(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(|a| a.location)
    }

    /// Sorted names of all active attributes.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Source attribute `name` from `buffer` on the bound vertex array.
    ///
    /// In permissive mode an unknown name is ignored.
    ///
    /// # Errors
    ///
    /// [`GlError::UnknownAttribute`] for an unknown name in strict mode.
    pub fn bind(
        &self,
        gl: &dyn Driver,
        name: &str,
        buffer: &ArrayBuffer,
        layout: AttribLayout,
    ) -> Result<(), GlError> {
        let Some(info) = self.entries.get(name) else {
            if self.permissive {
                log::debug!("ignoring inactive attribute {name}");
                return Ok(());
            }
            return Err(GlError::UnknownAttribute {
                name: name.to_owned(),
                valid: self.names(),
            });
        };

        buffer.bind(gl);
        gl.enable_vertex_attrib_array(info.location);
        match pointer_kind(info.gl_type) {
            Some((Some(component), size)) => gl.vertex_attrib_pointer_i32(
                info.location,
                size,
                component,
                layout.stride,
                layout.offset,
            ),
            Some((None, size)) => gl.vertex_attrib_pointer_f32(
                info.location,
                size,
                layout.stride,
                layout.offset,
            ),
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Call, RecordingDriver};
    use crate::gpu::{BufferTarget, VertexArray};
    use crate::program::Program;
    use crate::shader::{Shader, ShaderStage};

    fn program(gl: &RecordingDriver, permissive: bool) -> Program {
        let vert = "in vec3 position;\nin int index;\nin uvec2 ids;\n\
                    in mat4 transform;\nvoid main() {}";
        let shaders = vec![
            Shader::compile(gl, "a.vert", ShaderStage::Vertex, vert).unwrap(),
            Shader::compile(gl, "a.frag", ShaderStage::Fragment, "void main() {}")
                .unwrap(),
        ];
        Program::link(gl, shaders, &[], permissive).unwrap()
    }

    #[test]
    fn float_and_integer_pointers() {
        let gl = RecordingDriver::new();
        let program = program(&gl, false);
        let attrs = program.attributes();
        let buffer = ArrayBuffer::vertex(&gl).unwrap();
        let vao = VertexArray::new(&gl).unwrap();
        gl.clear_calls();

        attrs
            .bind(&gl, "position", &buffer, AttribLayout::new(16, 4))
            .unwrap();
        attrs.bind(&gl, "ids", &buffer, AttribLayout::default()).unwrap();

        let pos = attrs.location("position").unwrap();
        let ids = attrs.location("ids").unwrap();
        assert_eq!(
            gl.calls(),
            vec![
                Call::BindBuffer(BufferTarget::Array, Some(buffer.handle())),
                Call::EnableAttrib(pos),
                Call::AttribPointerF32 {
                    index: pos,
                    size: 3,
                    stride: 16,
                    offset: 4
                },
                Call::BindBuffer(BufferTarget::Array, Some(buffer.handle())),
                Call::EnableAttrib(ids),
                Call::AttribPointerI32 {
                    index: ids,
                    size: 2,
                    component: IntegerComponent::UnsignedInt,
                    stride: 0,
                    offset: 0
                },
            ]
        );
        vao.destroy(&gl);
    }

    #[test]
    fn matrix_attribute_is_enabled_without_pointer() {
        let gl = RecordingDriver::new();
        let program = program(&gl, false);
        let buffer = ArrayBuffer::vertex(&gl).unwrap();
        gl.clear_calls();
        program
            .attributes()
            .bind(&gl, "transform", &buffer, AttribLayout::default())
            .unwrap();
        let calls = gl.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[1], Call::EnableAttrib(_)));
    }

    #[test]
    fn unknown_attribute_strict_and_permissive() {
        let gl = RecordingDriver::new();
        let buffer = ArrayBuffer::vertex(&gl).unwrap();

        let strict = program(&gl, false);
        let err = strict
            .attributes()
            .bind(&gl, "normal", &buffer, AttribLayout::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GlError::UnknownAttribute { ref name, ref valid }
                if name == "normal" && valid.len() == 4
        ));

        let lenient = program(&gl, true);
        gl.clear_calls();
        lenient
            .attributes()
            .bind(&gl, "normal", &buffer, AttribLayout::default())
            .unwrap();
        assert!(gl.calls().is_empty());
    }
}
