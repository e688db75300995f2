//! Binding resolver
//!
//! Maps reflected parameters to bind group layout entries. Uniform-bound
//! parameters share one physical block, so they are folded into a single
//! synthetic `uniformInput` buffer at slot 0.

use std::collections::BTreeMap;

use eframe::wgpu::{
    BindGroupLayoutEntry, BindingType, BufferBindingType, ShaderStages, StorageTextureAccess,
    TextureFormat, TextureSampleType, TextureViewDimension,
};

use super::reflection::{
    scalar_bit_width, BaseShape, ReflectionBinding, ReflectionJson, ReflectionParameter,
    ReflectionType, ResourceAccess,
};
use crate::utils::playground_constants::UNIFORM_INPUT;
use crate::utils::ShaderError;

/// Concrete binding kind of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer { read_only: bool },
    Texture { sample_type: TextureSampleType },
    StorageTexture {
        access: StorageTextureAccess,
        format: TextureFormat,
    },
}

/// Binding descriptor keyed by parameter name. `kind` is `None` for
/// parameters the resolver does not recognise; they stay in the map so the
/// bind group check can report them as unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingDescriptor {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub kind: Option<BindingKind>,
}

impl BindingDescriptor {
    pub fn is_buffer(&self) -> bool {
        matches!(
            self.kind,
            Some(BindingKind::UniformBuffer) | Some(BindingKind::StorageBuffer { .. })
        )
    }

    pub fn is_storage_texture(&self) -> bool {
        matches!(self.kind, Some(BindingKind::StorageTexture { .. }))
    }

    pub fn is_texture(&self) -> bool {
        matches!(self.kind, Some(BindingKind::Texture { .. }))
    }

    pub fn storage_format(&self) -> Option<TextureFormat> {
        match self.kind {
            Some(BindingKind::StorageTexture { format, .. }) => Some(format),
            _ => None,
        }
    }

    pub fn layout_entry(&self) -> Option<BindGroupLayoutEntry> {
        let ty = match self.kind? {
            BindingKind::UniformBuffer => BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingKind::StorageBuffer { read_only } => BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingKind::Texture { sample_type } => BindingType::Texture {
                sample_type,
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            BindingKind::StorageTexture { access, format } => BindingType::StorageTexture {
                access,
                format,
                view_dimension: TextureViewDimension::D2,
            },
        };
        Some(BindGroupLayoutEntry {
            binding: self.binding,
            visibility: self.visibility,
            ty,
            count: None,
        })
    }
}

pub type Bindings = BTreeMap<String, BindingDescriptor>;

/// Resolve the binding kind of a single parameter.
pub fn resolve(parameter: &ReflectionParameter) -> Result<Option<BindingKind>, ShaderError> {
    match &parameter.ty {
        ReflectionType::Resource {
            base_shape: BaseShape::Texture2D,
            access,
            result_type,
        } => {
            let Some(access) = access else {
                return Ok(Some(BindingKind::Texture {
                    sample_type: sample_type_of(result_type.as_deref()),
                }));
            };
            let format = match parameter.format.as_deref() {
                Some(name) => texture_format_from_name(name).ok_or_else(|| {
                    ShaderError::binding(format!(
                        "Unsupported texture format '{}' on {}",
                        name, parameter.name
                    ))
                })?,
                None => derive_storage_format(&parameter.name, result_type.as_deref(), *access)?,
            };
            Ok(Some(BindingKind::StorageTexture {
                access: storage_access(*access),
                format,
            }))
        }
        ReflectionType::Resource {
            base_shape: BaseShape::StructuredBuffer,
            access,
            ..
        } => Ok(Some(BindingKind::StorageBuffer {
            read_only: !matches!(access, Some(ResourceAccess::ReadWrite) | Some(ResourceAccess::Write)),
        })),
        _ if matches!(parameter.binding, ReflectionBinding::Uniform { .. }) => {
            Ok(Some(BindingKind::UniformBuffer))
        }
        _ => {
            log::warn!(
                "[Bindings] Unrecognized binding for parameter {}, leaving it unbound",
                parameter.name
            );
            Ok(None)
        }
    }
}

/// Resolve every global parameter and fold uniform parameters into `uniformInput`.
pub fn build_bindings(reflection: &ReflectionJson) -> Result<Bindings, ShaderError> {
    let mut bindings = Bindings::new();
    let mut has_uniforms = false;

    for parameter in &reflection.parameters {
        let slot = match parameter.binding {
            ReflectionBinding::Uniform { .. } => {
                has_uniforms = true;
                continue;
            }
            ReflectionBinding::DescriptorTableSlot { index } => index,
        };
        let kind = resolve(parameter)?;
        bindings.insert(
            parameter.name.clone(),
            BindingDescriptor {
                binding: slot,
                visibility: ShaderStages::COMPUTE,
                kind,
            },
        );
    }

    if has_uniforms {
        bindings.insert(
            UNIFORM_INPUT.to_string(),
            BindingDescriptor {
                binding: 0,
                visibility: ShaderStages::COMPUTE,
                kind: Some(BindingKind::UniformBuffer),
            },
        );
    }

    Ok(bindings)
}

pub fn layout_entries(bindings: &Bindings) -> Vec<BindGroupLayoutEntry> {
    bindings.values().filter_map(BindingDescriptor::layout_entry).collect()
}

fn storage_access(access: ResourceAccess) -> StorageTextureAccess {
    match access {
        ResourceAccess::Read => StorageTextureAccess::ReadOnly,
        ResourceAccess::Write => StorageTextureAccess::WriteOnly,
        ResourceAccess::ReadWrite => StorageTextureAccess::ReadWrite,
    }
}

fn sample_type_of(result_type: Option<&ReflectionType>) -> TextureSampleType {
    match result_type.and_then(ReflectionType::scalar_name) {
        Some(name) if name.starts_with("uint") => TextureSampleType::Uint,
        Some(name) if name.starts_with("int") => TextureSampleType::Sint,
        _ => TextureSampleType::Float { filterable: false },
    }
}

/// Texel format implied by component count, scalar width and access mode.
fn derive_storage_format(
    name: &str,
    result_type: Option<&ReflectionType>,
    access: ResourceAccess,
) -> Result<TextureFormat, ShaderError> {
    let (components, scalar) = match result_type {
        Some(ReflectionType::Scalar { scalar_type }) => (1, scalar_type.as_str()),
        Some(ReflectionType::Vector {
            element_count,
            element_type,
        }) => match &**element_type {
            ReflectionType::Scalar { scalar_type } => (*element_count, scalar_type.as_str()),
            _ => return Err(no_format(name, access, "its texel type is not a scalar vector")),
        },
        _ => (4, "float32"),
    };
    let bits = scalar_bit_width(scalar).unwrap_or(0);
    let family = scalar.trim_end_matches(|c: char| c.is_ascii_digit());

    use TextureFormat as F;
    let format = match (access, components, family, bits) {
        (ResourceAccess::ReadWrite, 1, "float", 32) => F::R32Float,
        (ResourceAccess::ReadWrite, 1, "uint", 32) => F::R32Uint,
        (ResourceAccess::ReadWrite, 1, "int", 32) => F::R32Sint,
        (ResourceAccess::ReadWrite, _, _, _) => {
            return Err(no_format(
                name,
                access,
                "only single-channel 32-bit textures support read-write access",
            ))
        }
        (_, 1, "float", 32) => F::R32Float,
        (_, 1, "uint", 32) => F::R32Uint,
        (_, 1, "int", 32) => F::R32Sint,
        (_, 2, "float", 32) => F::Rg32Float,
        (_, 2, "uint", 32) => F::Rg32Uint,
        (_, 2, "int", 32) => F::Rg32Sint,
        (_, 4, "float", 32) => F::Rgba32Float,
        (_, 4, "uint", 32) => F::Rgba32Uint,
        (_, 4, "int", 32) => F::Rgba32Sint,
        (_, 4, "float", 16) => F::Rgba16Float,
        (_, 4, "uint", 16) => F::Rgba16Uint,
        (_, 4, "int", 16) => F::Rgba16Sint,
        _ => {
            return Err(no_format(
                name,
                access,
                &format!("no storage format has {} {} components", components, scalar),
            ))
        }
    };
    Ok(format)
}

fn no_format(name: &str, access: ResourceAccess, why: &str) -> ShaderError {
    ShaderError::binding(format!(
        "Cannot derive a texture format for {} with {:?} access: {}",
        name, access, why
    ))
}

const FORMAT_NAMES: &[(&str, TextureFormat)] = &[
    ("r8unorm", TextureFormat::R8Unorm),
    ("r8snorm", TextureFormat::R8Snorm),
    ("r8uint", TextureFormat::R8Uint),
    ("r8sint", TextureFormat::R8Sint),
    ("r16uint", TextureFormat::R16Uint),
    ("r16sint", TextureFormat::R16Sint),
    ("r16float", TextureFormat::R16Float),
    ("rg8unorm", TextureFormat::Rg8Unorm),
    ("rg8snorm", TextureFormat::Rg8Snorm),
    ("rg8uint", TextureFormat::Rg8Uint),
    ("rg8sint", TextureFormat::Rg8Sint),
    ("r32uint", TextureFormat::R32Uint),
    ("r32sint", TextureFormat::R32Sint),
    ("r32float", TextureFormat::R32Float),
    ("rg16uint", TextureFormat::Rg16Uint),
    ("rg16sint", TextureFormat::Rg16Sint),
    ("rg16float", TextureFormat::Rg16Float),
    ("rgba8unorm", TextureFormat::Rgba8Unorm),
    ("rgba8unorm-srgb", TextureFormat::Rgba8UnormSrgb),
    ("rgba8snorm", TextureFormat::Rgba8Snorm),
    ("rgba8uint", TextureFormat::Rgba8Uint),
    ("rgba8sint", TextureFormat::Rgba8Sint),
    ("bgra8unorm", TextureFormat::Bgra8Unorm),
    ("bgra8unorm-srgb", TextureFormat::Bgra8UnormSrgb),
    ("rgb10a2uint", TextureFormat::Rgb10a2Uint),
    ("rgb10a2unorm", TextureFormat::Rgb10a2Unorm),
    ("rg11b10ufloat", TextureFormat::Rg11b10Ufloat),
    ("rg32uint", TextureFormat::Rg32Uint),
    ("rg32sint", TextureFormat::Rg32Sint),
    ("rg32float", TextureFormat::Rg32Float),
    ("rgba16uint", TextureFormat::Rgba16Uint),
    ("rgba16sint", TextureFormat::Rgba16Sint),
    ("rgba16float", TextureFormat::Rgba16Float),
    ("rgba32uint", TextureFormat::Rgba32Uint),
    ("rgba32sint", TextureFormat::Rgba32Sint),
    ("rgba32float", TextureFormat::Rgba32Float),
];

pub fn texture_format_from_name(name: &str) -> Option<TextureFormat> {
    FORMAT_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, format)| *format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playground::reflection::tests::{buffer, scalar, slot_param, texture, uniform_param, vector};

    #[test]
    fn test_plain_texture_is_read_only() {
        let param = slot_param("image", 3, texture(vector(4, "float32"), None));
        assert_eq!(
            resolve(&param).unwrap(),
            Some(BindingKind::Texture {
                sample_type: TextureSampleType::Float { filterable: false }
            })
        );
    }

    #[test]
    fn test_explicit_format_wins() {
        let mut param = slot_param("outputTexture", 2, texture(vector(4, "float32"), Some(ResourceAccess::Write)));
        param.format = Some("rgba8unorm".into());
        assert_eq!(
            resolve(&param).unwrap(),
            Some(BindingKind::StorageTexture {
                access: StorageTextureAccess::WriteOnly,
                format: TextureFormat::Rgba8Unorm,
            })
        );
    }

    #[test]
    fn test_derived_read_write_format() {
        let param = slot_param("accum", 4, texture(scalar("float32"), Some(ResourceAccess::ReadWrite)));
        assert_eq!(
            resolve(&param).unwrap(),
            Some(BindingKind::StorageTexture {
                access: StorageTextureAccess::ReadWrite,
                format: TextureFormat::R32Float,
            })
        );
    }

    #[test]
    fn test_read_write_multichannel_is_rejected() {
        let param = slot_param("accum", 4, texture(vector(4, "float32"), Some(ResourceAccess::ReadWrite)));
        let err = resolve(&param).unwrap_err();
        assert!(err.to_string().contains("accum"));
    }

    #[test]
    fn test_vec3_storage_has_no_format() {
        let param = slot_param("rgb", 4, texture(vector(3, "float32"), Some(ResourceAccess::Write)));
        assert!(resolve(&param).is_err());
    }

    #[test]
    fn test_structured_buffer_is_storage() {
        let rw = slot_param("data", 1, buffer(scalar("float32"), Some(ResourceAccess::ReadWrite)));
        let ro = slot_param("lut", 2, buffer(scalar("float32"), None));
        assert_eq!(resolve(&rw).unwrap(), Some(BindingKind::StorageBuffer { read_only: false }));
        assert_eq!(resolve(&ro).unwrap(), Some(BindingKind::StorageBuffer { read_only: true }));
    }

    #[test]
    fn test_unrecognized_parameter_is_empty() {
        let param = slot_param("mystery", 5, scalar("float32"));
        assert_eq!(resolve(&param).unwrap(), None);
    }

    #[test]
    fn test_uniforms_fold_into_uniform_input() {
        let reflection = ReflectionJson {
            parameters: vec![
                uniform_param("time", 0, 4, scalar("float32")),
                uniform_param("tint", 16, 16, vector(4, "float32")),
                slot_param("data", 1, buffer(scalar("float32"), Some(ResourceAccess::ReadWrite))),
            ],
            ..Default::default()
        };
        let bindings = build_bindings(&reflection).unwrap();
        assert_eq!(bindings.len(), 2);
        assert!(!bindings.contains_key("time"));
        let uniform = bindings[UNIFORM_INPUT];
        assert_eq!(uniform.binding, 0);
        assert_eq!(uniform.kind, Some(BindingKind::UniformBuffer));
        assert_eq!(uniform.visibility, ShaderStages::COMPUTE);
        assert_eq!(bindings["data"].binding, 1);
    }

    #[test]
    fn test_no_uniform_input_without_uniforms() {
        let reflection = ReflectionJson {
            parameters: vec![slot_param("data", 1, buffer(scalar("float32"), None))],
            ..Default::default()
        };
        assert!(!build_bindings(&reflection).unwrap().contains_key(UNIFORM_INPUT));
    }

    #[test]
    fn test_layout_entries_skip_unrecognized() {
        let reflection = ReflectionJson {
            parameters: vec![
                slot_param("mystery", 5, scalar("float32")),
                slot_param("data", 1, buffer(scalar("float32"), None)),
            ],
            ..Default::default()
        };
        let bindings = build_bindings(&reflection).unwrap();
        assert_eq!(bindings.len(), 2);
        let entries = layout_entries(&bindings);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].binding, 1);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(texture_format_from_name("r32float"), Some(TextureFormat::R32Float));
        assert_eq!(texture_format_from_name("nope"), None);
    }
}
