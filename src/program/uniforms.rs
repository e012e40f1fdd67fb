//! Uniform discovery and typed setters.

use rustc_hash::FxHashMap;

use crate::error::GlError;
use crate::gpu::{Driver, ProgramHandle, UniformLocation};

/// Uniform types with a setter, keyed by driver type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `sampler1D`
    Sampler1D,
    /// `sampler2D`
    Sampler2D,
    /// `sampler3D`
    Sampler3D,
    /// `isampler3D`
    IntSampler3D,
    /// `usampler3D`
    UnsignedIntSampler3D,
    /// `samplerBuffer`
    SamplerBuffer,
    /// `isamplerBuffer`
    IntSamplerBuffer,
    /// `bool`
    Bool,
    /// `bvec2`
    BoolVec2,
    /// `bvec3`
    BoolVec3,
    /// `bvec4`
    BoolVec4,
    /// `int`
    Int,
    /// `ivec2`
    IntVec2,
    /// `ivec3`
    IntVec3,
    /// `ivec4`
    IntVec4,
    /// `uint`
    UnsignedInt,
    /// `uvec2`
    UnsignedIntVec2,
    /// `uvec3`
    UnsignedIntVec3,
    /// `uvec4`
    UnsignedIntVec4,
    /// `double`
    Double,
    /// `float`
    Float,
    /// `vec2`
    FloatVec2,
    /// `vec3`
    FloatVec3,
    /// `vec4`
    FloatVec4,
    /// `mat2`
    FloatMat2,
    /// `mat3`
    FloatMat3,
    /// `mat4`
    FloatMat4,
}

/// Which driver entry point a type is set through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setter {
    Int(usize),
    UnsignedInt(usize),
    Float(usize),
    Double,
    Matrix(u8),
}

impl UniformType {
    /// Type for a driver enumeration, `None` when no setter exists.
    #[must_use]
    pub const fn from_gl(gl_type: u32) -> Option<Self> {
        Some(match gl_type {
            glow::SAMPLER_1D => Self::Sampler1D,
            glow::SAMPLER_2D => Self::Sampler2D,
            glow::SAMPLER_3D => Self::Sampler3D,
            glow::INT_SAMPLER_3D => Self::IntSampler3D,
            glow::UNSIGNED_INT_SAMPLER_3D => Self::UnsignedIntSampler3D,
            glow::SAMPLER_BUFFER => Self::SamplerBuffer,
            glow::INT_SAMPLER_BUFFER => Self::IntSamplerBuffer,
            glow::BOOL => Self::Bool,
            glow::BOOL_VEC2 => Self::BoolVec2,
            glow::BOOL_VEC3 => Self::BoolVec3,
            glow::BOOL_VEC4 => Self::BoolVec4,
            glow::INT => Self::Int,
            glow::INT_VEC2 => Self::IntVec2,
            glow::INT_VEC3 => Self::IntVec3,
            glow::INT_VEC4 => Self::IntVec4,
            glow::UNSIGNED_INT => Self::UnsignedInt,
            glow::UNSIGNED_INT_VEC2 => Self::UnsignedIntVec2,
            glow::UNSIGNED_INT_VEC3 => Self::UnsignedIntVec3,
            glow::UNSIGNED_INT_VEC4 => Self::UnsignedIntVec4,
            glow::DOUBLE => Self::Double,
            glow::FLOAT => Self::Float,
            glow::FLOAT_VEC2 => Self::FloatVec2,
            glow::FLOAT_VEC3 => Self::FloatVec3,
            glow::FLOAT_VEC4 => Self::FloatVec4,
            glow::FLOAT_MAT2 => Self::FloatMat2,
            glow::FLOAT_MAT3 => Self::FloatMat3,
            glow::FLOAT_MAT4 => Self::FloatMat4,
            _ => return None,
        })
    }

    const fn setter(self) -> Setter {
        match self {
            Self::Sampler1D
            | Self::Sampler2D
            | Self::Sampler3D
            | Self::IntSampler3D
            | Self::UnsignedIntSampler3D
            | Self::SamplerBuffer
            | Self::IntSamplerBuffer
            | Self::Bool
            | Self::Int => Setter::Int(1),
            Self::BoolVec2 | Self::IntVec2 => Setter::Int(2),
            Self::BoolVec3 | Self::IntVec3 => Setter::Int(3),
            Self::BoolVec4 | Self::IntVec4 => Setter::Int(4),
            Self::UnsignedInt => Setter::UnsignedInt(1),
            Self::UnsignedIntVec2 => Setter::UnsignedInt(2),
            Self::UnsignedIntVec3 => Setter::UnsignedInt(3),
            Self::UnsignedIntVec4 => Setter::UnsignedInt(4),
            Self::Double => Setter::Double,
            Self::Float => Setter::Float(1),
            Self::FloatVec2 => Setter::Float(2),
            Self::FloatVec3 => Setter::Float(3),
            Self::FloatVec4 => Setter::Float(4),
            Self::FloatMat2 => Setter::Matrix(2),
            Self::FloatMat3 => Setter::Matrix(3),
            Self::FloatMat4 => Setter::Matrix(4),
        }
    }
}

/// A value that can be assigned to a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Boolean scalar.
    Bool(bool),
    /// Boolean vector.
    BoolVec([bool; 4], u8),
    /// Signed integer scalar (also texture units for samplers).
    Int(i32),
    /// Signed integer vector.
    IntVec([i32; 4], u8),
    /// Unsigned integer scalar.
    UnsignedInt(u32),
    /// Unsigned integer vector.
    UnsignedIntVec([u32; 4], u8),
    /// Single-precision scalar.
    Float(f32),
    /// Single-precision vector.
    FloatVec([f32; 4], u8),
    /// Double-precision scalar.
    Double(f64),
    /// Square column-major matrix of dimension 2, 3 or 4.
    Matrix([f32; 16], u8),
}

impl UniformValue {
    fn ints(self) -> Option<([i32; 4], usize)> {
        let mut out = [0; 4];
        let len = match self {
            Self::Int(v) => {
                out[0] = v;
                1
            }
            Self::IntVec(v, n) => {
                out = v;
                usize::from(n)
            }
            Self::Bool(b) => {
                out[0] = i32::from(b);
                1
            }
            Self::BoolVec(v, n) => {
                for (o, b) in out.iter_mut().zip(v) {
                    *o = i32::from(b);
                }
                usize::from(n)
            }
            _ => return None,
        };
        Some((out, len))
    }

    fn unsigned_ints(self) -> Option<([u32; 4], usize)> {
        let mut out = [0; 4];
        let len = match self {
            Self::UnsignedInt(v) => {
                out[0] = v;
                1
            }
            Self::UnsignedIntVec(v, n) => {
                out = v;
                usize::from(n)
            }
            // Plain integer literals are accepted when non-negative.
            Self::Int(_) | Self::IntVec(..) => {
                let (ints, len) = self.ints()?;
                for (o, i) in out.iter_mut().zip(&ints[..len]) {
                    *o = u32::try_from(*i).ok()?;
                }
                len
            }
            _ => return None,
        };
        Some((out, len))
    }

    fn floats(self) -> Option<([f32; 4], usize)> {
        let mut out = [0.0; 4];
        let len = match self {
            Self::Float(v) => {
                out[0] = v;
                1
            }
            Self::Double(v) => {
                #[allow(clippy::cast_possible_truncation)]
                let narrowed = v as f32;
                out[0] = narrowed;
                1
            }
            Self::FloatVec(v, n) => {
                out = v;
                usize::from(n)
            }
            _ => return None,
        };
        Some((out, len))
    }

    /// Issue the setter for `ty`. Returns `false` when the value's shape
    /// does not fit.
    fn apply(self, gl: &dyn Driver, location: UniformLocation, ty: UniformType) -> bool {
        match ty.setter() {
            Setter::Int(n) => match self.ints() {
                Some((v, len)) if len == n => gl.uniform_i32(location, &v[..n]),
                _ => return false,
            },
            Setter::UnsignedInt(n) => match self.unsigned_ints() {
                Some((v, len)) if len == n => gl.uniform_u32(location, &v[..n]),
                _ => return false,
            },
            Setter::Float(n) => match self.floats() {
                Some((v, len)) if len == n => gl.uniform_f32(location, &v[..n]),
                _ => return false,
            },
            Setter::Double => match self {
                Self::Double(v) => gl.uniform_f64(location, v),
                Self::Float(v) => gl.uniform_f64(location, f64::from(v)),
                _ => return false,
            },
            Setter::Matrix(dim) => match self {
                Self::Matrix(m, d) if d == dim => {
                    let n = usize::from(dim) * usize::from(dim);
                    gl.uniform_matrix_f32(location, dim, &m[..n]);
                }
                _ => return false,
            },
        }
        true
    }
}

macro_rules! impl_vec_from {
    ($variant:ident, $elem:ty, $($n:literal),+) => {$(
        impl From<[$elem; $n]> for UniformValue {
            fn from(v: [$elem; $n]) -> Self {
                let mut out = [<$elem>::default(); 4];
                out[..$n].copy_from_slice(&v);
                Self::$variant(out, $n)
            }
        }
    )+};
}

impl_vec_from!(BoolVec, bool, 2, 3, 4);
impl_vec_from!(IntVec, i32, 2, 3, 4);
impl_vec_from!(UnsignedIntVec, u32, 2, 3, 4);
impl_vec_from!(FloatVec, f32, 2, 3, 4);

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::UnsignedInt(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for UniformValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        v.to_array().into()
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(v: glam::Vec3) -> Self {
        v.to_array().into()
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(v: glam::Vec4) -> Self {
        v.to_array().into()
    }
}

impl From<glam::IVec3> for UniformValue {
    fn from(v: glam::IVec3) -> Self {
        v.to_array().into()
    }
}

impl From<glam::UVec3> for UniformValue {
    fn from(v: glam::UVec3) -> Self {
        v.to_array().into()
    }
}

impl From<glam::Mat2> for UniformValue {
    fn from(m: glam::Mat2) -> Self {
        let mut out = [0.0; 16];
        out[..4].copy_from_slice(&m.to_cols_array());
        Self::Matrix(out, 2)
    }
}

impl From<glam::Mat3> for UniformValue {
    fn from(m: glam::Mat3) -> Self {
        let mut out = [0.0; 16];
        out[..9].copy_from_slice(&m.to_cols_array());
        Self::Matrix(out, 3)
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(m: glam::Mat4) -> Self {
        Self::Matrix(m.to_cols_array(), 4)
    }
}

/// One active uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformInfo {
    /// Resolved location.
    pub location: UniformLocation,
    /// Raw driver type enumeration.
    pub gl_type: u32,
    /// Array length, 1 for scalars.
    pub size: i32,
}

/// Active uniforms of a linked program.
#[derive(Debug, Clone, Default)]
pub struct Uniforms {
    entries: FxHashMap<String, UniformInfo>,
    permissive: bool,
}

impl Uniforms {
    /// Query the active uniforms of `program`. Array uniforms are keyed by
    /// their base name; block-resident uniforms have no location and are
    /// skipped.
    pub(crate) fn discover(gl: &dyn Driver, program: ProgramHandle, permissive: bool) -> Self {
        let mut entries = FxHashMap::default();
        for var in gl.active_uniforms(program) {
            let name = var.name.strip_suffix("[0]").unwrap_or(&var.name);
            let Some(location) = gl.uniform_location(program, name) else {
                continue;
            };
            let _ = entries.insert(
                name.to_owned(),
                UniformInfo {
                    location,
                    gl_type: var.gl_type,
                    size: var.size,
                },
            );
        }
        Self {
            entries,
            permissive,
        }
    }

    /// Whether `name` is an active uniform.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Descriptor of an active uniform.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformInfo> {
        self.entries.get(name)
    }

    /// Location of an active uniform.
    #[must_use]
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.entries.get(name).map(|u| u.location)
    }

    /// Sorted names of all active uniforms.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of active uniforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the program has no active uniforms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set a uniform of the currently active program.
    ///
    /// In permissive mode an unknown name is ignored.
    ///
    /// # Errors
    ///
    /// [`GlError::UnknownUniform`] for an unknown name in strict mode,
    /// [`GlError::UnknownUniformType`] if the uniform's type has no setter,
    /// [`GlError::UniformValueMismatch`] if `value` does not fit the type.
    pub fn set(
        &self,
        gl: &dyn Driver,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), GlError> {
        let Some(info) = self.entries.get(name) else {
            if self.permissive {
                log::debug!("ignoring inactive uniform {name}");
                return Ok(());
            }
            return Err(GlError::UnknownUniform {
                name: name.to_owned(),
                valid: self.names(),
            });
        };

        let ty = UniformType::from_gl(info.gl_type).ok_or_else(|| {
            GlError::UnknownUniformType {
                name: name.to_owned(),
                gl_type: info.gl_type,
            }
        })?;

        if value.into().apply(gl, info.location, ty) {
            Ok(())
        } else {
            Err(GlError::UniformValueMismatch {
                name: name.to_owned(),
                expected: ty,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Call, RecordingDriver};
    use crate::program::Program;
    use crate::shader::{Shader, ShaderStage};

    const VERT: &str = "\
uniform mat4 mvp;
uniform vec3 light;
uniform uint count;
uniform double scale;
uniform bvec2 flags;
uniform float weights[4];
uniform image2D img;
in vec3 position;
void main() {}
";

    fn program(gl: &RecordingDriver, permissive: bool) -> Program {
        let frag = "uniform sampler2D colormap;\nvoid main() {}";
        let shaders = vec![
            Shader::compile(gl, "t.vert", ShaderStage::Vertex, VERT).unwrap(),
            Shader::compile(gl, "t.frag", ShaderStage::Fragment, frag).unwrap(),
        ];
        Program::link(gl, shaders, &[], permissive).unwrap()
    }

    #[test]
    fn type_table_covers_gl_enums() {
        assert_eq!(UniformType::from_gl(glow::FLOAT_MAT4), Some(UniformType::FloatMat4));
        assert_eq!(
            UniformType::from_gl(glow::INT_SAMPLER_BUFFER),
            Some(UniformType::IntSamplerBuffer)
        );
        assert_eq!(UniformType::from_gl(glow::IMAGE_2D), None);
    }

    #[test]
    fn discovery_strips_array_suffix() {
        let gl = RecordingDriver::new();
        let program = program(&gl, false);
        let uniforms = program.uniforms();
        assert!(uniforms.contains("weights"));
        assert_eq!(uniforms.get("weights").unwrap().size, 4);
        assert!(uniforms.contains("colormap"));
        assert_eq!(uniforms.len(), 8);
    }

    #[test]
    fn setters_dispatch_by_declared_type() {
        let gl = RecordingDriver::new();
        let program = program(&gl, false);
        let u = program.uniforms();
        gl.clear_calls();

        u.set(&gl, "mvp", glam::Mat4::IDENTITY).unwrap();
        u.set(&gl, "light", glam::Vec3::new(1.0, 2.0, 3.0)).unwrap();
        u.set(&gl, "count", 3).unwrap();
        u.set(&gl, "scale", 0.5_f32).unwrap();
        u.set(&gl, "flags", [true, false]).unwrap();
        u.set(&gl, "colormap", 2).unwrap();
        u.set(&gl, "weights", 1.5_f32).unwrap();

        let loc = |n| u.location(n).unwrap();
        assert_eq!(
            gl.calls(),
            vec![
                Call::UniformMatrix(
                    loc("mvp"),
                    4,
                    glam::Mat4::IDENTITY.to_cols_array().to_vec()
                ),
                Call::UniformF32(loc("light"), vec![1.0, 2.0, 3.0]),
                Call::UniformU32(loc("count"), vec![3]),
                Call::UniformF64(loc("scale"), 0.5),
                Call::UniformI32(loc("flags"), vec![1, 0]),
                Call::UniformI32(loc("colormap"), vec![2]),
                Call::UniformF32(loc("weights"), vec![1.5]),
            ]
        );
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let gl = RecordingDriver::new();
        let program = program(&gl, false);
        let err = program
            .uniforms()
            .set(&gl, "light", glam::Vec2::ONE)
            .unwrap_err();
        assert!(matches!(
            err,
            GlError::UniformValueMismatch { expected: UniformType::FloatVec3, .. }
        ));
        let err = program.uniforms().set(&gl, "count", -1).unwrap_err();
        assert!(matches!(err, GlError::UniformValueMismatch { .. }));
    }

    #[test]
    fn unknown_type_is_always_fatal() {
        let gl = RecordingDriver::new();
        let program = program(&gl, true);
        let err = program.uniforms().set(&gl, "img", 0).unwrap_err();
        assert!(matches!(
            err,
            GlError::UnknownUniformType { gl_type: glow::IMAGE_2D, .. }
        ));
    }

    #[test]
    fn unknown_name_depends_on_mode() {
        let gl = RecordingDriver::new();
        let lenient = program(&gl, true);
        gl.clear_calls();
        lenient.uniforms().set(&gl, "optimized_out", 1.0_f32).unwrap();
        assert!(gl.calls().is_empty());

        let strict = program(&gl, false);
        match strict.uniforms().set(&gl, "optimized_out", 1.0_f32) {
            Err(GlError::UnknownUniform { name, valid }) => {
                assert_eq!(name, "optimized_out");
                assert!(valid.contains(&"mvp".to_owned()));
                assert!(valid.windows(2).all(|w| w[0] <= w[1]));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
