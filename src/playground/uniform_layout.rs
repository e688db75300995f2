//! Uniform layout calculator
//!
//! Byte sizes of reflected value types and the total size of the shared
//! uniform block.

use super::reflection::{scalar_bit_width, ReflectionBinding, ReflectionJson, ReflectionType};
use crate::utils::ShaderError;

pub fn round_up_to_nearest(x: u32, nearest: u32) -> u32 {
    if nearest == 0 {
        return x;
    }
    x.div_ceil(nearest) * nearest
}

/// Size in bytes of a value type.
///
/// Scalars take `bits / 8`, three-component vectors are padded to four, and
/// a struct spans its furthest field end rounded to its largest field size.
pub fn get_size(ty: &ReflectionType) -> Result<u32, ShaderError> {
    match ty {
        ReflectionType::Resource { .. } => Err(ShaderError::binding(
            "Cannot get the size of a resource type",
        )),
        ReflectionType::Scalar { scalar_type } => scalar_bit_width(scalar_type)
            .map(|bits| bits / 8)
            .ok_or_else(|| {
                ShaderError::binding(format!(
                    "Could not get bit count out of scalar type {}",
                    scalar_type
                ))
            }),
        ReflectionType::Struct { name, fields } => {
            let mut alignment = 0;
            let mut unaligned = 0;
            for field in fields {
                match field.binding {
                    ReflectionBinding::Uniform { offset, size } => {
                        alignment = alignment.max(size);
                        unaligned = unaligned.max(offset + size);
                    }
                    ReflectionBinding::DescriptorTableSlot { .. } => {
                        return Err(ShaderError::binding(format!(
                            "Field {} of struct {} has no uniform layout",
                            field.name, name
                        )))
                    }
                }
            }
            Ok(round_up_to_nearest(unaligned, alignment))
        }
        ReflectionType::Vector {
            element_count,
            element_type,
        } => {
            let element = get_size(element_type)?;
            if *element_count == 3 {
                Ok(4 * element)
            } else {
                Ok(element_count * element)
            }
        }
    }
}

/// Total byte size of the shared uniform block: the furthest `offset + size`
/// of any uniform parameter, rounded up to 16.
pub fn get_uniform_size(reflection: &ReflectionJson) -> u32 {
    let size = reflection
        .uniform_parameters()
        .filter_map(|p| match p.binding {
            ReflectionBinding::Uniform { offset, size } => Some(offset + size),
            ReflectionBinding::DescriptorTableSlot { .. } => None,
        })
        .max()
        .unwrap_or(0);
    round_up_to_nearest(size, 16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playground::reflection::tests::{buffer, scalar, slot_param, uniform_param, vector};

    #[test]
    fn test_scalar_sizes() {
        for (name, bytes) in [("float32", 4), ("float16", 2), ("int64", 8), ("uint8", 1), ("uint32", 4)] {
            assert_eq!(get_size(&scalar(name)).unwrap(), bytes, "{}", name);
        }
    }

    #[test]
    fn test_vec3_padded_to_vec4() {
        for element in ["float32", "float16", "int32"] {
            let padded = get_size(&vector(3, element)).unwrap();
            assert_eq!(padded, 4 * get_size(&scalar(element)).unwrap());
        }
        assert_eq!(get_size(&vector(2, "float32")).unwrap(), 8);
    }

    #[test]
    fn test_struct_rounds_to_largest_field() {
        let ty = ReflectionType::Struct {
            name: "Particle".into(),
            fields: vec![
                uniform_param("pos", 0, 16, vector(3, "float32")),
                uniform_param("mass", 16, 4, scalar("float32")),
            ],
        };
        assert_eq!(get_size(&ty).unwrap(), 32);
    }

    #[test]
    fn test_resource_has_no_size() {
        assert!(get_size(&buffer(scalar("float32"), None)).is_err());
        assert!(get_size(&scalar("bool")).is_err());
    }

    #[test]
    fn test_uniform_size_multiple_of_16() {
        let reflection = ReflectionJson {
            parameters: vec![
                uniform_param("time", 0, 4, scalar("float32")),
                uniform_param("color", 16, 12, vector(3, "float32")),
                slot_param("data", 1, buffer(scalar("float32"), None)),
            ],
            ..Default::default()
        };
        let size = get_uniform_size(&reflection);
        assert_eq!(size, 32);
        assert_eq!(size % 16, 0);
        assert!(size >= 28);
    }

    #[test]
    fn test_uniform_size_empty() {
        assert_eq!(get_uniform_size(&ReflectionJson::default()), 0);
    }
}
