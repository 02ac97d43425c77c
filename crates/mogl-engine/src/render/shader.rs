//! Shader program checking.
//!
//! WGSL is compiled and validated with naga before any GPU object exists, and
//! the vertex/fragment interface is matched against the vertex buffer layout
//! and the expected uniforms. A program that fails here never reaches
//! `create_render_pipeline`.

use std::borrow::Cow;

use naga::valid::Capabilities;
use naga::{
    AddressSpace, Binding, Handle, Interpolation, Module, ResourceBinding, Sampling, ScalarKind, ShaderStage, Type,
    TypeInner,
};
use thiserror::Error;

/// Embedded WGSL text plus the names of its two entry points.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub label: &'static str,
    pub wgsl: Cow<'static, str>,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
}

impl ProgramSource {
    /// Source with the conventional `vs_main` / `fs_main` entry points.
    pub fn new(label: &'static str, wgsl: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label,
            wgsl: wgsl.into(),
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
        }
    }

    pub fn with_entry_points(mut self, vertex: &'static str, fragment: &'static str) -> Self {
        self.vertex_entry = vertex;
        self.fragment_entry = fragment;
        self
    }

    /// The built-in colored quad program.
    pub fn quad() -> Self {
        Self::new("mogl quad shader", include_str!("shaders/quad.wgsl"))
    }
}

/// A uniform buffer the program must declare.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
    pub size: u32,
}

/// What the host side feeds the program, and what the device can run.
#[derive(Debug, Copy, Clone)]
pub struct ProgramInterface<'a> {
    pub attributes: &'a [wgpu::VertexAttribute],
    pub uniforms: &'a [UniformSlot],
    /// Shader capabilities the device enables; see [`capabilities_for`].
    pub capabilities: Capabilities,
}

/// Device features that unlock shader-language capabilities.
const FEATURE_CAPABILITIES: &[(wgpu::Features, Capabilities)] = &[
    (wgpu::Features::SHADER_F64, Capabilities::FLOAT64),
    (wgpu::Features::SHADER_F16, Capabilities::SHADER_FLOAT16),
    (wgpu::Features::SHADER_INT64, Capabilities::SHADER_INT64),
    (wgpu::Features::SHADER_PRIMITIVE_INDEX, Capabilities::PRIMITIVE_INDEX),
    (wgpu::Features::SHADER_EARLY_DEPTH_TEST, Capabilities::EARLY_DEPTH_TEST),
    (wgpu::Features::DUAL_SOURCE_BLENDING, Capabilities::DUAL_SOURCE_BLENDING),
    (wgpu::Features::CLIP_DISTANCES, Capabilities::CLIP_DISTANCE),
    (wgpu::Features::MULTIVIEW, Capabilities::MULTIVIEW),
];

/// The naga capabilities a device with `features` accepts.
///
/// Anything not unlocked by a feature is rejected, so a program that needs
/// e.g. `f64` fails the check instead of failing later on the device.
pub fn capabilities_for(features: wgpu::Features) -> Capabilities {
    FEATURE_CAPABILITIES
        .iter()
        .filter(|(feature, _)| features.contains(*feature))
        .fold(Capabilities::empty(), |caps, (_, cap)| caps | *cap)
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("WGSL compilation failed:\n{0}")]
    Compile(String),

    #[error("shader module validation failed:\n{0}")]
    Validate(String),

    #[error("no {stage:?} entry point named `{name}`")]
    MissingEntryPoint { stage: ShaderStage, name: String },

    #[error("vertex attribute location {0} is bound more than once")]
    DuplicateAttribute(u32),

    #[error("vertex input @location({0}) has no matching buffer attribute")]
    MissingAttribute(u32),

    #[error("vertex input @location({location}) is {shader_type} but the buffer supplies {format:?}")]
    AttributeMismatch {
        location: u32,
        shader_type: String,
        format: wgpu::VertexFormat,
    },

    #[error("fragment input @location({0}) is not written by the vertex stage")]
    UnlinkedVarying(u32),

    #[error("@location({0}) has different types in the vertex and fragment stages")]
    VaryingMismatch(u32),

    #[error(
        "@location({location}) is interpolated as {vertex:?} by the vertex stage but {fragment:?} by the fragment stage"
    )]
    InterpolationMismatch {
        location: u32,
        vertex: (Option<Interpolation>, Option<Sampling>),
        fragment: (Option<Interpolation>, Option<Sampling>),
    },

    #[error("no uniform declared at @group({group}) @binding({binding})")]
    MissingUniform { group: u32, binding: u32 },

    #[error("uniform at @group({group}) @binding({binding}) is {found} bytes, expected {expected}")]
    UniformSize {
        group: u32,
        binding: u32,
        expected: u32,
        found: u32,
    },
}

/// A program whose compile and link checks succeeded.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    source: ProgramSource,
}

impl ShaderProgram {
    /// Compiles, validates and links `source` against `interface`.
    pub fn check(source: ProgramSource, interface: &ProgramInterface<'_>) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(&source.wgsl)
            .map_err(|e| ShaderError::Compile(e.emit_to_string(&source.wgsl)))?;

        let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), interface.capabilities);
        validator
            .validate(&module)
            .map_err(|e| ShaderError::Validate(e.emit_to_string(&source.wgsl)))?;

        let vertex = find_entry(&module, ShaderStage::Vertex, source.vertex_entry)?;
        let fragment = find_entry(&module, ShaderStage::Fragment, source.fragment_entry)?;

        check_attributes(&module, vertex, interface.attributes)?;
        check_varyings(&module, vertex, fragment)?;
        for slot in interface.uniforms {
            check_uniform(&module, slot)?;
        }

        log::debug!("shader program {:?} passed compile and link checks", source.label);
        Ok(Self { source })
    }

    pub fn label(&self) -> &'static str {
        self.source.label
    }

    pub fn vertex_entry(&self) -> &'static str {
        self.source.vertex_entry
    }

    pub fn fragment_entry(&self) -> &'static str {
        self.source.fragment_entry
    }

    /// Hands the checked source to the device.
    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.source.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(self.source.wgsl.as_ref())),
        })
    }
}

fn find_entry<'m>(module: &'m Module, stage: ShaderStage, name: &str) -> Result<&'m naga::Function, ShaderError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == name)
        .map(|ep| &ep.function)
        .ok_or_else(|| ShaderError::MissingEntryPoint {
            stage,
            name: name.to_string(),
        })
}

fn check_attributes(
    module: &Module,
    vertex: &naga::Function,
    attributes: &[wgpu::VertexAttribute],
) -> Result<(), ShaderError> {
    for (i, attr) in attributes.iter().enumerate() {
        if attributes[..i].iter().any(|a| a.shader_location == attr.shader_location) {
            return Err(ShaderError::DuplicateAttribute(attr.shader_location));
        }
    }

    for input in input_locations(module, vertex) {
        let location = input.location;
        let attr = attributes
            .iter()
            .find(|a| a.shader_location == location)
            .ok_or(ShaderError::MissingAttribute(location))?;

        let inner = &module.types[input.ty].inner;
        if numeric_shape(inner).is_none() || numeric_shape(inner) != format_shape(attr.format) {
            return Err(ShaderError::AttributeMismatch {
                location,
                shader_type: describe(inner),
                format: attr.format,
            });
        }
    }

    Ok(())
}

fn check_varyings(module: &Module, vertex: &naga::Function, fragment: &naga::Function) -> Result<(), ShaderError> {
    let outputs = output_locations(module, vertex);

    for input in input_locations(module, fragment) {
        let location = input.location;
        let output = outputs
            .iter()
            .find(|o| o.location == location)
            .ok_or(ShaderError::UnlinkedVarying(location))?;

        // Types live in a unique arena, so equal types share a handle.
        if output.ty != input.ty {
            return Err(ShaderError::VaryingMismatch(location));
        }

        // The WGSL front end fills in the defaults, so unqualified varyings
        // already read as perspective/center here.
        if output.qualifiers() != input.qualifiers() {
            return Err(ShaderError::InterpolationMismatch {
                location,
                vertex: output.qualifiers(),
                fragment: input.qualifiers(),
            });
        }
    }

    Ok(())
}

fn check_uniform(module: &Module, slot: &UniformSlot) -> Result<(), ShaderError> {
    let wanted = ResourceBinding {
        group: slot.group,
        binding: slot.binding,
    };

    let (_, var) = module
        .global_variables
        .iter()
        .find(|(_, var)| var.space == AddressSpace::Uniform && var.binding.as_ref() == Some(&wanted))
        .ok_or(ShaderError::MissingUniform {
            group: slot.group,
            binding: slot.binding,
        })?;

    let found = module.types[var.ty].inner.size(module.to_ctx());
    if found != slot.size {
        return Err(ShaderError::UniformSize {
            group: slot.group,
            binding: slot.binding,
            expected: slot.size,
            found,
        });
    }

    Ok(())
}

// ── interface collection ──────────────────────────────────────────────────

/// One user-defined `@location` value of an entry point.
#[derive(Debug, Copy, Clone)]
struct LocationIo {
    location: u32,
    ty: Handle<Type>,
    interpolation: Option<Interpolation>,
    sampling: Option<Sampling>,
}

impl LocationIo {
    fn from_binding(binding: &Binding, ty: Handle<Type>) -> Option<Self> {
        match *binding {
            Binding::Location {
                location,
                interpolation,
                sampling,
                ..
            } => Some(Self {
                location,
                ty,
                interpolation,
                sampling,
            }),
            Binding::BuiltIn(_) => None,
        }
    }

    fn qualifiers(&self) -> (Option<Interpolation>, Option<Sampling>) {
        (self.interpolation, self.sampling)
    }
}

fn input_locations(module: &Module, function: &naga::Function) -> Vec<LocationIo> {
    let mut out = Vec::new();
    for arg in &function.arguments {
        push_locations(module, arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

fn output_locations(module: &Module, function: &naga::Function) -> Vec<LocationIo> {
    let mut out = Vec::new();
    if let Some(result) = &function.result {
        push_locations(module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

/// Flattens a bound value or a struct of bound members. Builtins are skipped.
fn push_locations(module: &Module, ty: Handle<Type>, binding: Option<&Binding>, out: &mut Vec<LocationIo>) {
    match binding {
        Some(binding) => out.extend(LocationIo::from_binding(binding, ty)),
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                out.extend(
                    members
                        .iter()
                        .filter_map(|m| m.binding.as_ref().and_then(|b| LocationIo::from_binding(b, m.ty))),
                );
            }
        }
    }
}

// ── type shapes ───────────────────────────────────────────────────────────

/// `(kind, components)` of a 32-bit scalar or vector.
fn numeric_shape(inner: &TypeInner) -> Option<(ScalarKind, u32)> {
    match *inner {
        TypeInner::Scalar(s) if s.width == 4 => Some((s.kind, 1)),
        TypeInner::Vector { size, scalar } if scalar.width == 4 => Some((scalar.kind, size as u32)),
        _ => None,
    }
}

fn format_shape(format: wgpu::VertexFormat) -> Option<(ScalarKind, u32)> {
    use wgpu::VertexFormat as F;
    let shape = match format {
        F::Float32 => (ScalarKind::Float, 1),
        F::Float32x2 => (ScalarKind::Float, 2),
        F::Float32x3 => (ScalarKind::Float, 3),
        F::Float32x4 => (ScalarKind::Float, 4),
        F::Uint32 => (ScalarKind::Uint, 1),
        F::Uint32x2 => (ScalarKind::Uint, 2),
        F::Uint32x3 => (ScalarKind::Uint, 3),
        F::Uint32x4 => (ScalarKind::Uint, 4),
        F::Sint32 => (ScalarKind::Sint, 1),
        F::Sint32x2 => (ScalarKind::Sint, 2),
        F::Sint32x3 => (ScalarKind::Sint, 3),
        F::Sint32x4 => (ScalarKind::Sint, 4),
        _ => return None,
    };
    Some(shape)
}

fn describe(inner: &TypeInner) -> String {
    let scalar_name = |kind: ScalarKind| match kind {
        ScalarKind::Float => "f32",
        ScalarKind::Uint => "u32",
        ScalarKind::Sint => "i32",
        _ => "?",
    };
    match numeric_shape(inner) {
        Some((kind, 1)) => scalar_name(kind).to_string(),
        Some((kind, n)) => format!("vec{n}<{}>", scalar_name(kind)),
        None => "a non-numeric type".to_string(),
    }
}
