//! Reflection model
//!
//! Data-only description of a compiled program as produced by the compiler:
//! global parameters, entry points, the type of every parameter and the
//! hash table used by the printf log. The JSON shape mirrors the `kind`
//! tagged documents the compiler emits, so a snapshot can be displayed,
//! saved and parsed back unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::ShaderError;

/// Type of a reflected parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReflectionType {
    Struct {
        name: String,
        fields: Vec<ReflectionParameter>,
    },
    Vector {
        element_count: u32,
        element_type: Box<ReflectionType>,
    },
    Scalar {
        scalar_type: String,
    },
    Resource {
        base_shape: BaseShape,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access: Option<ResourceAccess>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_type: Option<Box<ReflectionType>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseShape {
    #[serde(rename = "structuredBuffer")]
    StructuredBuffer,
    #[serde(rename = "texture2D")]
    Texture2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceAccess {
    Read,
    Write,
    ReadWrite,
}

/// Where a parameter lives: inside the shared uniform block, or in its own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReflectionBinding {
    Uniform { offset: u32, size: u32 },
    DescriptorTableSlot { index: u32 },
}

/// Positional directive argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeArgument {
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAttribute {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<AttributeArgument>,
}

impl UserAttribute {
    pub fn number(&self, index: usize) -> Option<f64> {
        match self.arguments.get(index) {
            Some(AttributeArgument::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn string(&self, index: usize) -> Option<&str> {
        match self.arguments.get(index) {
            Some(AttributeArgument::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// All leading numeric arguments.
    pub fn numbers(&self) -> Vec<f64> {
        self.arguments
            .iter()
            .map_while(|arg| match arg {
                AttributeArgument::Number(n) => Some(*n),
                AttributeArgument::String(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionParameter {
    pub binding: ReflectionBinding,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ReflectionType,
    /// Explicit texel format override, WebGPU spelling (`rgba8unorm`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_attribs: Vec<UserAttribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionEntryPoint {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ReflectionParameter>,
    pub stage: String,
    pub thread_group_size: [u32; 3],
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_attribs: Vec<UserAttribute>,
}

/// Root reflection document, replaced wholesale on every successful compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionJson {
    #[serde(default)]
    pub entry_points: Vec<ReflectionEntryPoint>,
    #[serde(default)]
    pub parameters: Vec<ReflectionParameter>,
    #[serde(default)]
    pub hashed_strings: BTreeMap<u32, String>,
}

impl ReflectionType {
    pub fn is_resource(&self) -> bool {
        matches!(self, ReflectionType::Resource { .. })
    }

    pub fn is_structured_buffer(&self) -> bool {
        matches!(
            self,
            ReflectionType::Resource {
                base_shape: BaseShape::StructuredBuffer,
                ..
            }
        )
    }

    pub fn is_texture_2d(&self) -> bool {
        matches!(
            self,
            ReflectionType::Resource {
                base_shape: BaseShape::Texture2D,
                ..
            }
        )
    }

    /// Scalar type name (`float32`) of a scalar, or of a vector's elements.
    pub fn scalar_name(&self) -> Option<&str> {
        match self {
            ReflectionType::Scalar { scalar_type } => Some(scalar_type),
            ReflectionType::Vector { element_type, .. } => element_type.scalar_name(),
            _ => None,
        }
    }

    fn check_nesting(&self, owner: &str) -> Result<(), ShaderError> {
        match self {
            ReflectionType::Vector { element_type, .. } => {
                if element_type.is_resource() {
                    return Err(ShaderError::binding(format!(
                        "{}: vector element type cannot be a resource",
                        owner
                    )));
                }
                element_type.check_nesting(owner)
            }
            ReflectionType::Resource {
                result_type: Some(result),
                ..
            } => {
                if result.is_resource() {
                    return Err(ShaderError::binding(format!(
                        "{}: resource result type cannot be a resource",
                        owner
                    )));
                }
                result.check_nesting(owner)
            }
            ReflectionType::Struct { fields, .. } => {
                fields.iter().try_for_each(|f| f.ty.check_nesting(owner))
            }
            _ => Ok(()),
        }
    }
}

/// Bit width embedded at the end of a scalar type name (`float32` -> 32).
pub fn scalar_bit_width(scalar_type: &str) -> Option<u32> {
    let digits_at = scalar_type
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    scalar_type[digits_at..].parse().ok()
}

impl ReflectionJson {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Vector elements and resource results are never themselves resources.
    pub fn validate(&self) -> Result<(), ShaderError> {
        let globals = self.parameters.iter();
        let locals = self.entry_points.iter().flat_map(|ep| ep.parameters.iter());
        globals
            .chain(locals)
            .try_for_each(|param| param.ty.check_nesting(&param.name))
    }

    pub fn find_parameter(&self, name: &str) -> Option<&ReflectionParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn find_entry_point(&self, name: &str) -> Option<&ReflectionEntryPoint> {
        self.entry_points.iter().find(|ep| ep.name == name)
    }

    pub fn uniform_parameters(&self) -> impl Iterator<Item = &ReflectionParameter> {
        self.parameters
            .iter()
            .filter(|p| matches!(p.binding, ReflectionBinding::Uniform { .. }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub fn scalar(name: &str) -> ReflectionType {
        ReflectionType::Scalar {
            scalar_type: name.to_string(),
        }
    }

    pub fn vector(count: u32, element: &str) -> ReflectionType {
        ReflectionType::Vector {
            element_count: count,
            element_type: Box::new(scalar(element)),
        }
    }

    pub fn buffer(result: ReflectionType, access: Option<ResourceAccess>) -> ReflectionType {
        ReflectionType::Resource {
            base_shape: BaseShape::StructuredBuffer,
            access,
            result_type: Some(Box::new(result)),
        }
    }

    pub fn texture(result: ReflectionType, access: Option<ResourceAccess>) -> ReflectionType {
        ReflectionType::Resource {
            base_shape: BaseShape::Texture2D,
            access,
            result_type: Some(Box::new(result)),
        }
    }

    pub fn slot_param(name: &str, index: u32, ty: ReflectionType) -> ReflectionParameter {
        ReflectionParameter {
            binding: ReflectionBinding::DescriptorTableSlot { index },
            name: name.to_string(),
            ty,
            format: None,
            user_attribs: Vec::new(),
        }
    }

    pub fn uniform_param(name: &str, offset: u32, size: u32, ty: ReflectionType) -> ReflectionParameter {
        ReflectionParameter {
            binding: ReflectionBinding::Uniform { offset, size },
            name: name.to_string(),
            ty,
            format: None,
            user_attribs: Vec::new(),
        }
    }

    pub fn attr(name: &str, arguments: Vec<AttributeArgument>) -> UserAttribute {
        UserAttribute {
            name: name.to_string(),
            arguments,
        }
    }

    pub fn num(n: f64) -> AttributeArgument {
        AttributeArgument::Number(n)
    }

    pub fn text(s: &str) -> AttributeArgument {
        AttributeArgument::String(s.to_string())
    }

    #[test]
    fn test_parse_compiler_document() {
        let doc = json!({
            "parameters": [
                {
                    "name": "outputTexture",
                    "binding": {"kind": "descriptorTableSlot", "index": 2},
                    "type": {
                        "kind": "resource",
                        "baseShape": "texture2D",
                        "access": "write",
                        "resultType": {"kind": "vector", "elementCount": 4,
                                       "elementType": {"kind": "scalar", "scalarType": "float32"}}
                    },
                    "format": "rgba8unorm"
                },
                {
                    "name": "brightness",
                    "binding": {"kind": "uniform", "offset": 4, "size": 4},
                    "type": {"kind": "scalar", "scalarType": "float32"},
                    "userAttribs": [{"name": "playground_SLIDER", "arguments": [0.5, 0.0, 1.0]}]
                }
            ],
            "entryPoints": [
                {"name": "imageMain", "stage": "compute", "threadGroupSize": [16, 16, 1]}
            ],
            "hashedStrings": {"2166136261": ""}
        });

        let reflection: ReflectionJson = serde_json::from_value(doc).unwrap();
        reflection.validate().unwrap();
        assert_eq!(reflection.parameters.len(), 2);
        assert!(reflection.parameters[0].ty.is_texture_2d());
        assert_eq!(reflection.parameters[0].format.as_deref(), Some("rgba8unorm"));
        assert_eq!(reflection.parameters[1].user_attribs[0].number(2), Some(1.0));
        assert_eq!(reflection.entry_points[0].thread_group_size, [16, 16, 1]);
        assert_eq!(reflection.hashed_strings.get(&2166136261).map(String::as_str), Some(""));
        assert_eq!(reflection.uniform_parameters().count(), 1);
    }

    #[test]
    fn test_round_trips_through_json() {
        let reflection = ReflectionJson {
            parameters: vec![slot_param("data", 1, buffer(scalar("float32"), Some(ResourceAccess::ReadWrite)))],
            ..Default::default()
        };
        let parsed: ReflectionJson = serde_json::from_str(&reflection.to_json_pretty()).unwrap();
        assert_eq!(parsed, reflection);
    }

    #[test]
    fn test_rejects_nested_resource() {
        let inner = buffer(scalar("float32"), None);
        let reflection = ReflectionJson {
            parameters: vec![slot_param("bad", 0, buffer(inner, None))],
            ..Default::default()
        };
        assert!(reflection.validate().is_err());
    }

    #[test]
    fn test_scalar_bit_width() {
        assert_eq!(scalar_bit_width("float32"), Some(32));
        assert_eq!(scalar_bit_width("uint8"), Some(8));
        assert_eq!(scalar_bit_width("int64"), Some(64));
        assert_eq!(scalar_bit_width("bool"), None);
    }

    #[test]
    fn test_attribute_arguments() {
        let a = attr("playground_CALL", vec![num(4.0), num(2.0), text("x")]);
        assert_eq!(a.numbers(), vec![4.0, 2.0]);
        assert_eq!(a.string(2), Some("x"));
        assert_eq!(a.number(2), None);
    }
}
