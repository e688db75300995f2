//! Reflection of a validated naga module into the playground's reflection model.

use std::collections::BTreeMap;

use naga::proc::Layouter;
use naga::{
    AddressSpace, ArraySize, Handle, ImageClass, ImageDimension, Module, Scalar, ScalarKind,
    ShaderStage, StorageAccess, StorageFormat, Type, TypeInner,
};

use super::directives::{DirectiveTarget, Directives};
use crate::playground::reflection::{
    BaseShape, ReflectionBinding, ReflectionEntryPoint, ReflectionJson, ReflectionParameter,
    ReflectionType, ResourceAccess, UserAttribute,
};

pub fn reflect_module(
    module: &Module,
    directives: &Directives,
    hashed_strings: BTreeMap<u32, String>,
) -> Result<ReflectionJson, Vec<String>> {
    let mut layouter = Layouter::default();
    layouter
        .update(module.to_ctx())
        .map_err(|e| vec![format!("cannot compute type layout: {}", e)])?;

    let reflector = Reflector {
        module,
        layouter: &layouter,
        directives,
    };

    let mut problems = Vec::new();
    let mut parameters = Vec::new();
    let mut uniform_blocks = 0;

    for (_, var) in module.global_variables.iter() {
        let name = var.name.clone().unwrap_or_default();
        let result = match var.space {
            AddressSpace::Uniform => {
                uniform_blocks += 1;
                match reflector.slot(&name, var.binding.as_ref()) {
                    Ok(0) => reflector.uniform_block(&name, var.ty),
                    Ok(slot) => Err(format!(
                        "uniform block {} must use @binding(0), found @binding({})",
                        name, slot
                    )),
                    Err(e) => Err(e),
                }
            }
            AddressSpace::Storage { access } => {
                reflector.slot(&name, var.binding.as_ref()).and_then(|slot| {
                    reflector
                        .storage_buffer(&name, var.ty, access)
                        .map(|param| vec![param.in_slot(slot)])
                })
            }
            AddressSpace::Handle => reflector.slot(&name, var.binding.as_ref()).and_then(|slot| {
                reflector.handle(&name, var.ty).map(|param| vec![param.in_slot(slot)])
            }),
            AddressSpace::PushConstant => Err(format!("push constants are not supported: {}", name)),
            _ => Ok(Vec::new()),
        };
        match result {
            Ok(mut params) => parameters.append(&mut params),
            Err(problem) => problems.push(problem),
        }
    }

    if uniform_blocks > 1 {
        problems.push(format!(
            "only one var<uniform> block is supported, found {}",
            uniform_blocks
        ));
    }

    let entry_points = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == ShaderStage::Compute)
        .map(|ep| ReflectionEntryPoint {
            name: ep.name.clone(),
            parameters: Vec::new(),
            stage: "compute".to_string(),
            thread_group_size: ep.workgroup_size,
            user_attribs: directives
                .get(&DirectiveTarget::Function(ep.name.clone()))
                .cloned()
                .unwrap_or_default(),
        })
        .collect();

    if !problems.is_empty() {
        return Err(problems);
    }

    Ok(ReflectionJson {
        entry_points,
        parameters,
        hashed_strings,
    })
}

struct Reflector<'a> {
    module: &'a Module,
    layouter: &'a Layouter,
    directives: &'a Directives,
}

/// A parameter before its binding is known.
struct Unbound {
    name: String,
    ty: ReflectionType,
    format: Option<String>,
    user_attribs: Vec<UserAttribute>,
}

impl Unbound {
    fn in_slot(self, index: u32) -> ReflectionParameter {
        ReflectionParameter {
            binding: ReflectionBinding::DescriptorTableSlot { index },
            name: self.name,
            ty: self.ty,
            format: self.format,
            user_attribs: self.user_attribs,
        }
    }
}

impl Reflector<'_> {
    fn attribs(&self, target: DirectiveTarget) -> Vec<UserAttribute> {
        self.directives.get(&target).cloned().unwrap_or_default()
    }

    fn slot(&self, name: &str, binding: Option<&naga::ResourceBinding>) -> Result<u32, String> {
        match binding {
            Some(b) if b.group == 0 => Ok(b.binding),
            Some(b) => Err(format!("{} must be in @group(0), found @group({})", name, b.group)),
            None => Err(format!("{} has no @binding", name)),
        }
    }

    /// The single uniform block, flattened into one parameter per member.
    fn uniform_block(&self, name: &str, ty: Handle<Type>) -> Result<Vec<ReflectionParameter>, String> {
        match &self.module.types[ty].inner {
            TypeInner::Struct { members, .. } => members
                .iter()
                .map(|member| {
                    let member_name = member.name.clone().unwrap_or_default();
                    Ok(ReflectionParameter {
                        binding: ReflectionBinding::Uniform {
                            offset: member.offset,
                            size: self.layouter[member.ty].size,
                        },
                        ty: self.value_type(member.ty).map_err(|e| format!("{}.{}: {}", name, member_name, e))?,
                        format: None,
                        user_attribs: self.attribs(DirectiveTarget::Member(member_name.clone())),
                        name: member_name,
                    })
                })
                .collect(),
            TypeInner::Array { .. } => Err(format!("uniform arrays are not supported: {}", name)),
            _ => Ok(vec![ReflectionParameter {
                binding: ReflectionBinding::Uniform {
                    offset: 0,
                    size: self.layouter[ty].size,
                },
                name: name.to_string(),
                ty: self.value_type(ty).map_err(|e| format!("{}: {}", name, e))?,
                format: None,
                user_attribs: self.attribs(DirectiveTarget::Global(name.to_string())),
            }]),
        }
    }

    fn storage_buffer(&self, name: &str, ty: Handle<Type>, access: StorageAccess) -> Result<Unbound, String> {
        let TypeInner::Array { base, .. } = &self.module.types[ty].inner else {
            return Err(format!("storage variable {} must be an array", name));
        };
        let access = if access.contains(StorageAccess::STORE) {
            ResourceAccess::ReadWrite
        } else {
            ResourceAccess::Read
        };
        Ok(Unbound {
            name: name.to_string(),
            ty: ReflectionType::Resource {
                base_shape: BaseShape::StructuredBuffer,
                access: Some(access),
                result_type: Some(Box::new(
                    self.value_type(*base).map_err(|e| format!("{}: {}", name, e))?,
                )),
            },
            format: None,
            user_attribs: self.attribs(DirectiveTarget::Global(name.to_string())),
        })
    }

    fn handle(&self, name: &str, ty: Handle<Type>) -> Result<Unbound, String> {
        let (access, result_type, format) = match &self.module.types[ty].inner {
            TypeInner::Image {
                dim: ImageDimension::D2,
                arrayed: false,
                class,
            } => match class {
                ImageClass::Sampled { kind, multi: false } => (None, texel(*kind, 4), None),
                ImageClass::Storage { format, access } => {
                    let (kind, channels) = storage_texel(*format);
                    (
                        Some(texture_access(*access)),
                        texel(kind, channels),
                        Some(storage_format_name(*format).ok_or_else(|| {
                            format!("unsupported storage texture format {:?} on {}", format, name)
                        })?),
                    )
                }
                _ => return Err(format!("unsupported texture kind on {}", name)),
            },
            TypeInner::Image { .. } => {
                return Err(format!("only non-arrayed 2D textures are supported: {}", name))
            }
            TypeInner::Sampler { .. } => return Err(format!("samplers are not supported: {}", name)),
            _ => return Err(format!("unsupported resource type on {}", name)),
        };

        Ok(Unbound {
            name: name.to_string(),
            ty: ReflectionType::Resource {
                base_shape: BaseShape::Texture2D,
                access,
                result_type: Some(Box::new(result_type)),
            },
            format: format.map(str::to_string),
            user_attribs: self.attribs(DirectiveTarget::Global(name.to_string())),
        })
    }

    fn value_type(&self, ty: Handle<Type>) -> Result<ReflectionType, String> {
        let ty = &self.module.types[ty];
        match &ty.inner {
            TypeInner::Scalar(scalar) | TypeInner::Atomic(scalar) => Ok(ReflectionType::Scalar {
                scalar_type: scalar_name(*scalar)?,
            }),
            TypeInner::Vector { size, scalar } => Ok(ReflectionType::Vector {
                element_count: *size as u32,
                element_type: Box::new(ReflectionType::Scalar {
                    scalar_type: scalar_name(*scalar)?,
                }),
            }),
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => {
                let (columns, rows) = (*columns as u32, *rows as u32);
                let width = u32::from(scalar.width);
                let stride = if rows == 3 { 4 } else { rows } * width;
                let fields = (0..columns)
                    .map(|c| {
                        Ok(ReflectionParameter {
                            binding: ReflectionBinding::Uniform {
                                offset: c * stride,
                                size: rows * width,
                            },
                            name: format!("c{}", c),
                            ty: ReflectionType::Vector {
                                element_count: rows,
                                element_type: Box::new(ReflectionType::Scalar {
                                    scalar_type: scalar_name(*scalar)?,
                                }),
                            },
                            format: None,
                            user_attribs: Vec::new(),
                        })
                    })
                    .collect::<Result<_, String>>()?;
                Ok(ReflectionType::Struct {
                    name: format!("mat{}x{}", columns, rows),
                    fields,
                })
            }
            TypeInner::Struct { members, .. } => {
                let fields = members
                    .iter()
                    .map(|member| {
                        Ok(ReflectionParameter {
                            binding: ReflectionBinding::Uniform {
                                offset: member.offset,
                                size: self.layouter[member.ty].size,
                            },
                            name: member.name.clone().unwrap_or_default(),
                            ty: self.value_type(member.ty)?,
                            format: None,
                            user_attribs: Vec::new(),
                        })
                    })
                    .collect::<Result<_, String>>()?;
                Ok(ReflectionType::Struct {
                    name: ty.name.clone().unwrap_or_default(),
                    fields,
                })
            }
            TypeInner::Array {
                size: ArraySize::Constant(_),
                ..
            } => Err("fixed-size arrays are only supported as storage buffer elements".to_string()),
            other => Err(format!("unsupported type {:?}", other)),
        }
    }
}

fn scalar_name(scalar: Scalar) -> Result<String, String> {
    let family = match scalar.kind {
        ScalarKind::Float => "float",
        ScalarKind::Sint => "int",
        ScalarKind::Uint => "uint",
        ScalarKind::Bool => return Ok("bool".to_string()),
        ScalarKind::AbstractInt | ScalarKind::AbstractFloat => {
            return Err("abstract numeric types cannot be reflected".to_string())
        }
    };
    Ok(format!("{}{}", family, u32::from(scalar.width) * 8))
}

fn texel(kind: ScalarKind, channels: u32) -> ReflectionType {
    let scalar_type = match kind {
        ScalarKind::Sint => "int32",
        ScalarKind::Uint => "uint32",
        _ => "float32",
    }
    .to_string();
    if channels == 1 {
        ReflectionType::Scalar { scalar_type }
    } else {
        ReflectionType::Vector {
            element_count: channels,
            element_type: Box::new(ReflectionType::Scalar { scalar_type }),
        }
    }
}

fn texture_access(access: StorageAccess) -> ResourceAccess {
    let load = access.contains(StorageAccess::LOAD);
    let store = access.contains(StorageAccess::STORE);
    match (load, store) {
        (true, true) => ResourceAccess::ReadWrite,
        (false, true) => ResourceAccess::Write,
        _ => ResourceAccess::Read,
    }
}

/// Sample kind and channel count of a storage format.
fn storage_texel(format: StorageFormat) -> (ScalarKind, u32) {
    use StorageFormat as S;
    match format {
        S::R32Uint | S::R16Uint | S::R8Uint => (ScalarKind::Uint, 1),
        S::R32Sint | S::R16Sint | S::R8Sint => (ScalarKind::Sint, 1),
        S::R32Float | S::R16Float | S::R8Unorm | S::R8Snorm => (ScalarKind::Float, 1),
        S::Rg32Uint | S::Rg16Uint | S::Rg8Uint => (ScalarKind::Uint, 2),
        S::Rg32Sint | S::Rg16Sint | S::Rg8Sint => (ScalarKind::Sint, 2),
        S::Rg32Float | S::Rg16Float | S::Rg8Unorm | S::Rg8Snorm => (ScalarKind::Float, 2),
        S::Rgba32Uint | S::Rgba16Uint | S::Rgba8Uint | S::Rgb10a2Uint => (ScalarKind::Uint, 4),
        S::Rgba32Sint | S::Rgba16Sint | S::Rgba8Sint => (ScalarKind::Sint, 4),
        _ => (ScalarKind::Float, 4),
    }
}

/// WebGPU spelling of a storage format, as understood by the binding resolver.
fn storage_format_name(format: StorageFormat) -> Option<&'static str> {
    use StorageFormat as S;
    Some(match format {
        S::R8Unorm => "r8unorm",
        S::R8Snorm => "r8snorm",
        S::R8Uint => "r8uint",
        S::R8Sint => "r8sint",
        S::R16Uint => "r16uint",
        S::R16Sint => "r16sint",
        S::R16Float => "r16float",
        S::Rg8Unorm => "rg8unorm",
        S::Rg8Snorm => "rg8snorm",
        S::Rg8Uint => "rg8uint",
        S::Rg8Sint => "rg8sint",
        S::R32Uint => "r32uint",
        S::R32Sint => "r32sint",
        S::R32Float => "r32float",
        S::Rg16Uint => "rg16uint",
        S::Rg16Sint => "rg16sint",
        S::Rg16Float => "rg16float",
        S::Rgba8Unorm => "rgba8unorm",
        S::Rgba8Snorm => "rgba8snorm",
        S::Rgba8Uint => "rgba8uint",
        S::Rgba8Sint => "rgba8sint",
        S::Bgra8Unorm => "bgra8unorm",
        S::Rgb10a2Uint => "rgb10a2uint",
        S::Rgb10a2Unorm => "rgb10a2unorm",
        S::Rg11b10Ufloat => "rg11b10ufloat",
        S::Rg32Uint => "rg32uint",
        S::Rg32Sint => "rg32sint",
        S::Rg32Float => "rg32float",
        S::Rgba16Uint => "rgba16uint",
        S::Rgba16Sint => "rgba16sint",
        S::Rgba16Float => "rgba16float",
        S::Rgba32Uint => "rgba32uint",
        S::Rgba32Sint => "rgba32sint",
        S::Rgba32Float => "rgba32float",
        _ => return None,
    })
}
