//! Call plan builder
//!
//! Entry points tagged with `playground_CALL`, `playground_CALL_SIZE_OF` and
//! `playground_CALL_ONCE` become auxiliary compute passes that run before the
//! main pass of every frame.

use super::reflection::{ReflectionJson, ReflectionType};
use super::uniform_layout::get_size;
use crate::utils::ShaderError;

const CALL: &str = "playground_CALL";
const CALL_SIZE_OF: &str = "playground_CALL_SIZE_OF";
const CALL_ONCE: &str = "playground_CALL_ONCE";

/// Bytes per element when the sizing resource does not report one.
const DEFAULT_ELEMENT_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum CallSize {
    /// Threads follow the element count (or texel grid) of a resource.
    ResourceBased {
        resource_name: String,
        element_size: Option<u32>,
    },
    /// Literal thread counts, missing trailing dimensions padded with 1.
    FixedSize { size: [u32; 3] },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallCommand {
    pub fn_name: String,
    pub size: CallSize,
    pub call_once: bool,
}

/// Shape of an allocated resource, as far as dispatch sizing cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExtent {
    Buffer { size: u64 },
    Texture { width: u32, height: u32 },
}

/// Build the dispatch plan from entry-point directives, in entry-point order.
pub fn parse_call_commands(reflection: &ReflectionJson) -> Result<Vec<CallCommand>, ShaderError> {
    let mut commands = Vec::new();

    for entry_point in &reflection.entry_points {
        let fn_name = &entry_point.name;
        let mut size: Option<CallSize> = None;
        let mut call_once = false;

        for attribute in &entry_point.user_attribs {
            match attribute.name.as_str() {
                CALL_SIZE_OF => {
                    let resource_name = attribute.string(0).ok_or_else(|| {
                        ShaderError::binding(format!(
                            "CALL_SIZE_OF on {} expects a resource name",
                            fn_name
                        ))
                    })?;
                    let resource = reflection.find_parameter(resource_name).ok_or_else(|| {
                        ShaderError::binding(format!(
                            "Cannot find resource {} for {} CALL command",
                            resource_name, fn_name
                        ))
                    })?;
                    let element_size = match &resource.ty {
                        ReflectionType::Resource {
                            result_type: Some(result),
                            ..
                        } if resource.ty.is_structured_buffer() => Some(get_size(result)?),
                        _ => None,
                    };
                    if size.is_some() {
                        return Err(multiple_calls(fn_name));
                    }
                    size = Some(CallSize::ResourceBased {
                        resource_name: resource_name.to_string(),
                        element_size,
                    });
                }
                CALL => {
                    if size.is_some() {
                        return Err(multiple_calls(fn_name));
                    }
                    size = Some(CallSize::FixedSize {
                        size: fixed_size(fn_name, &attribute.numbers())?,
                    });
                }
                CALL_ONCE => {
                    if call_once {
                        return Err(ShaderError::binding(format!(
                            "Multiple CALL ONCE commands found for {}",
                            fn_name
                        )));
                    }
                    call_once = true;
                }
                _ => {}
            }
        }

        if let Some(size) = size {
            commands.push(CallCommand {
                fn_name: fn_name.clone(),
                size,
                call_once,
            });
        }
    }

    Ok(commands)
}

fn multiple_calls(fn_name: &str) -> ShaderError {
    ShaderError::binding(format!("Multiple CALL commands found for {}", fn_name))
}

fn fixed_size(fn_name: &str, dims: &[f64]) -> Result<[u32; 3], ShaderError> {
    if dims.is_empty() || dims.len() > 3 {
        return Err(ShaderError::binding(format!(
            "CALL on {} takes 1 to 3 sizes, got {}",
            fn_name,
            dims.len()
        )));
    }
    let mut size = [1u32; 3];
    for (slot, dim) in size.iter_mut().zip(dims) {
        if *dim < 1.0 || dim.fract() != 0.0 {
            return Err(ShaderError::binding(format!(
                "CALL on {} has an invalid size {}",
                fn_name, dim
            )));
        }
        *slot = *dim as u32;
    }
    Ok(size)
}

impl CallCommand {
    pub fn resource_name(&self) -> Option<&str> {
        match &self.size {
            CallSize::ResourceBased { resource_name, .. } => Some(resource_name),
            CallSize::FixedSize { .. } => None,
        }
    }

    /// Number of threads to launch along each axis.
    pub fn work_size(&self, extent: Option<DispatchExtent>) -> Result<[u32; 3], ShaderError> {
        match &self.size {
            CallSize::FixedSize { size } => Ok(*size),
            CallSize::ResourceBased {
                resource_name,
                element_size,
            } => match extent {
                Some(DispatchExtent::Buffer { size }) => {
                    let element = u64::from(element_size.unwrap_or(DEFAULT_ELEMENT_SIZE).max(1));
                    let count = u32::try_from(size / element).map_err(|_| {
                        ShaderError::resource(format!("{} is too large to dispatch over", resource_name))
                    })?;
                    Ok([count, 1, 1])
                }
                Some(DispatchExtent::Texture { width, height }) => Ok([width, height, 1]),
                None => Err(ShaderError::resource(format!(
                    "Error when dispatching {}. Resource not found: {}",
                    self.fn_name, resource_name
                ))),
            },
        }
    }
}

/// Work-groups needed to cover `work` threads with `thread_group`-sized groups.
pub fn workgroup_count(work: [u32; 3], thread_group: [u32; 3]) -> [u32; 3] {
    std::array::from_fn(|axis| work[axis].div_ceil(thread_group[axis].max(1)))
}
