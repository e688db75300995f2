//! Resource command interpreter, parse stage
//!
//! Turns `playground_*` directives on global parameters into typed
//! provisioning commands, and derives the interactive uniform controllers
//! from the slider and color commands.

use super::reflection::{
    ReflectionBinding, ReflectionJson, ReflectionParameter, ReflectionType, UserAttribute,
};
use super::uniform_layout::get_size;
use crate::utils::playground_constants::DIRECTIVE_PREFIX;
use crate::utils::ShaderError;

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Zeros { count: u32, element_size: u32 },
    Rand { count: u32 },
    Black { width: u32, height: u32 },
    /// Black texture sized as a fraction of the viewport.
    BlackScreen { width_scale: f32, height_scale: f32 },
    Url { url: String },
    Slider {
        default: f32,
        min: f32,
        max: f32,
        element_size: u32,
        offset: u32,
    },
    ColorPick {
        default: [f32; 3],
        element_size: u32,
        offset: u32,
    },
}

impl ParsedCommand {
    pub fn directive(&self) -> &'static str {
        match self {
            ParsedCommand::Zeros { .. } => "ZEROS",
            ParsedCommand::Rand { .. } => "RAND",
            ParsedCommand::Black { .. } => "BLACK",
            ParsedCommand::BlackScreen { .. } => "BLACK_SCREEN",
            ParsedCommand::Url { .. } => "URL",
            ParsedCommand::Slider { .. } => "SLIDER",
            ParsedCommand::ColorPick { .. } => "COLOR_PICK",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCommand {
    pub resource_name: String,
    pub command: ParsedCommand,
}

/// Parse every recognised directive on the global parameters, in declaration order.
pub fn parse_resource_commands(reflection: &ReflectionJson) -> Result<Vec<ResourceCommand>, ShaderError> {
    let mut commands = Vec::new();

    for parameter in &reflection.parameters {
        for attribute in &parameter.user_attribs {
            let Some(directive) = attribute.name.strip_prefix(DIRECTIVE_PREFIX) else {
                continue;
            };
            if let Some(command) = parse_directive(directive, attribute, parameter)? {
                commands.push(ResourceCommand {
                    resource_name: parameter.name.clone(),
                    command,
                });
            }
        }
    }

    Ok(commands)
}

fn parse_directive(
    directive: &str,
    attribute: &UserAttribute,
    parameter: &ReflectionParameter,
) -> Result<Option<ParsedCommand>, ShaderError> {
    let unsupported = |what: &str| {
        ShaderError::binding(format!(
            "{} attribute cannot be applied to {}, it only supports {}",
            directive, parameter.name, what
        ))
    };
    let number = |index: usize| {
        attribute.number(index).ok_or_else(|| {
            ShaderError::binding(format!(
                "{} attribute on {} is missing numeric argument {}",
                directive,
                parameter.name,
                index + 1
            ))
        })
    };
    let count = |index: usize| -> Result<u32, ShaderError> {
        let n = number(index)?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(ShaderError::binding(format!(
                "{} attribute on {} expects a non-negative integer, got {}",
                directive, parameter.name, n
            )));
        }
        Ok(n as u32)
    };

    let command = match directive {
        "ZEROS" => {
            let ReflectionType::Resource {
                result_type: Some(result_type),
                ..
            } = &parameter.ty
            else {
                return Err(unsupported("buffers"));
            };
            if !parameter.ty.is_structured_buffer() {
                return Err(unsupported("buffers"));
            }
            ParsedCommand::Zeros {
                count: count(0)?,
                element_size: get_size(result_type)?,
            }
        }
        "RAND" => {
            if !parameter.ty.is_structured_buffer() {
                return Err(unsupported("buffers"));
            }
            let is_float32 = matches!(
                &parameter.ty,
                ReflectionType::Resource { result_type: Some(r), .. }
                    if matches!(&**r, ReflectionType::Scalar { scalar_type } if scalar_type == "float32")
            );
            if !is_float32 {
                return Err(unsupported("float buffers"));
            }
            ParsedCommand::Rand { count: count(0)? }
        }
        "BLACK" => {
            if !parameter.ty.is_texture_2d() {
                return Err(unsupported("2D textures"));
            }
            ParsedCommand::Black {
                width: count(0)?,
                height: count(1)?,
            }
        }
        "BLACK_SCREEN" => {
            if !parameter.ty.is_texture_2d() {
                return Err(unsupported("2D textures"));
            }
            ParsedCommand::BlackScreen {
                width_scale: number(0)? as f32,
                height_scale: number(1)? as f32,
            }
        }
        "URL" => {
            if !parameter.ty.is_texture_2d() {
                return Err(unsupported("2D textures"));
            }
            let url = attribute.string(0).ok_or_else(|| {
                ShaderError::binding(format!(
                    "URL attribute on {} is missing its url argument",
                    parameter.name
                ))
            })?;
            ParsedCommand::Url { url: url.to_string() }
        }
        "SLIDER" => {
            let ReflectionBinding::Uniform { offset, size } = parameter.binding else {
                return Err(unsupported("floats"));
            };
            let is_float32 = matches!(&parameter.ty, ReflectionType::Scalar { scalar_type } if scalar_type == "float32");
            if !is_float32 {
                return Err(unsupported("floats"));
            }
            ParsedCommand::Slider {
                default: number(0)? as f32,
                min: number(1)? as f32,
                max: number(2)? as f32,
                element_size: size,
                offset,
            }
        }
        "COLOR_PICK" => {
            let ReflectionBinding::Uniform { offset, .. } = parameter.binding else {
                return Err(unsupported("float vectors"));
            };
            let ReflectionType::Vector {
                element_count,
                element_type,
            } = &parameter.ty
            else {
                return Err(unsupported("float vectors"));
            };
            let is_float32 = matches!(&**element_type, ReflectionType::Scalar { scalar_type } if scalar_type == "float32");
            if *element_count <= 2 || !is_float32 {
                return Err(unsupported("float vectors"));
            }
            ParsedCommand::ColorPick {
                default: [number(0)? as f32, number(1)? as f32, number(2)? as f32],
                element_size: get_size(element_type)?,
                offset,
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(command))
}

/// Interactive control writing straight into the uniform block.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformController {
    Slider {
        name: String,
        value: f32,
        min: f32,
        max: f32,
        byte_offset: u32,
    },
    ColorPick {
        name: String,
        value: [f32; 3],
        byte_offset: u32,
    },
}

impl UniformController {
    pub fn name(&self) -> &str {
        match self {
            UniformController::Slider { name, .. } | UniformController::ColorPick { name, .. } => name,
        }
    }

    pub fn byte_offset(&self) -> u32 {
        match self {
            UniformController::Slider { byte_offset, .. }
            | UniformController::ColorPick { byte_offset, .. } => *byte_offset,
        }
    }

    /// Current value as little-endian bytes, ready for `write_buffer`.
    pub fn value_bytes(&self) -> Vec<u8> {
        match self {
            UniformController::Slider { value, .. } => bytemuck::bytes_of(value).to_vec(),
            UniformController::ColorPick { value, .. } => bytemuck::cast_slice(value.as_slice()).to_vec(),
        }
    }
}

pub fn uniform_controllers(commands: &[ResourceCommand]) -> Vec<UniformController> {
    commands
        .iter()
        .filter_map(|rc| match &rc.command {
            ParsedCommand::Slider {
                default,
                min,
                max,
                offset,
                ..
            } => Some(UniformController::Slider {
                name: rc.resource_name.clone(),
                value: *default,
                min: *min,
                max: *max,
                byte_offset: *offset,
            }),
            ParsedCommand::ColorPick { default, offset, .. } => Some(UniformController::ColorPick {
                name: rc.resource_name.clone(),
                value: *default,
                byte_offset: *offset,
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playground::reflection::tests::{
        attr, buffer, num, scalar, slot_param, text, texture, uniform_param, vector,
    };
    use crate::playground::reflection::ResourceAccess;

    fn with_attr(mut param: ReflectionParameter, attribute: UserAttribute) -> ReflectionParameter {
        param.user_attribs.push(attribute);
        param
    }

    fn reflect(parameters: Vec<ReflectionParameter>) -> ReflectionJson {
        ReflectionJson {
            parameters,
            ..Default::default()
        }
    }

    #[test]
    fn test_zeros_uses_element_size() {
        let param = with_attr(
            slot_param("particles", 1, buffer(vector(3, "float32"), Some(ResourceAccess::ReadWrite))),
            attr("playground_ZEROS", vec![num(8.0)]),
        );
        let commands = parse_resource_commands(&reflect(vec![param])).unwrap();
        assert_eq!(
            commands,
            vec![ResourceCommand {
                resource_name: "particles".into(),
                command: ParsedCommand::Zeros { count: 8, element_size: 16 },
            }]
        );
    }

    #[test]
    fn test_zeros_on_texture_names_parameter() {
        let param = with_attr(
            slot_param("canvas", 2, texture(vector(4, "float32"), None)),
            attr("playground_ZEROS", vec![num(4.0)]),
        );
        let err = parse_resource_commands(&reflect(vec![param])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ZEROS"));
        assert!(msg.contains("canvas"));
        assert!(matches!(err, ShaderError::Binding(_)));
    }

    #[test]
    fn test_rand_requires_float_buffer() {
        let param = with_attr(
            slot_param("seeds", 1, buffer(scalar("uint32"), Some(ResourceAccess::ReadWrite))),
            attr("playground_RAND", vec![num(64.0)]),
        );
        let err = parse_resource_commands(&reflect(vec![param])).unwrap_err();
        assert!(err.to_string().contains("float buffers"));
    }

    #[test]
    fn test_texture_commands() {
        let params = vec![
            with_attr(
                slot_param("a", 1, texture(scalar("float32"), Some(ResourceAccess::ReadWrite))),
                attr("playground_BLACK", vec![num(64.0), num(32.0)]),
            ),
            with_attr(
                slot_param("b", 2, texture(vector(4, "float32"), None)),
                attr("playground_URL", vec![text("static/jeep.jpg")]),
            ),
            with_attr(
                slot_param("c", 3, texture(scalar("float32"), Some(ResourceAccess::ReadWrite))),
                attr("playground_BLACK_SCREEN", vec![num(1.0), num(0.5)]),
            ),
        ];
        let commands = parse_resource_commands(&reflect(params)).unwrap();
        assert_eq!(commands[0].command, ParsedCommand::Black { width: 64, height: 32 });
        assert_eq!(commands[1].command, ParsedCommand::Url { url: "static/jeep.jpg".into() });
        assert_eq!(
            commands[2].command,
            ParsedCommand::BlackScreen { width_scale: 1.0, height_scale: 0.5 }
        );
    }

    #[test]
    fn test_url_on_buffer_rejected() {
        let param = with_attr(
            slot_param("data", 1, buffer(scalar("float32"), None)),
            attr("playground_URL", vec![text("x.png")]),
        );
        assert!(parse_resource_commands(&reflect(vec![param])).is_err());
    }

    #[test]
    fn test_slider_and_color_pick_controllers() {
        let params = vec![
            with_attr(
                uniform_param("radius", 4, 4, scalar("float32")),
                attr("playground_SLIDER", vec![num(0.3), num(0.0), num(1.0)]),
            ),
            with_attr(
                uniform_param("tint", 16, 12, vector(3, "float32")),
                attr("playground_COLOR_PICK", vec![num(1.0), num(0.5), num(0.25)]),
            ),
        ];
        let commands = parse_resource_commands(&reflect(params)).unwrap();
        assert_eq!(
            commands[1].command,
            ParsedCommand::ColorPick { default: [1.0, 0.5, 0.25], element_size: 4, offset: 16 }
        );

        let controllers = uniform_controllers(&commands);
        assert_eq!(controllers.len(), 2);
        assert_eq!(controllers[0].name(), "radius");
        assert_eq!(controllers[0].byte_offset(), 4);
        assert_eq!(controllers[0].value_bytes(), 0.3f32.to_le_bytes().to_vec());
        assert_eq!(controllers[1].value_bytes().len(), 12);
    }

    #[test]
    fn test_slider_requires_uniform_float() {
        let param = with_attr(
            slot_param("data", 1, buffer(scalar("float32"), None)),
            attr("playground_SLIDER", vec![num(0.0), num(0.0), num(1.0)]),
        );
        let err = parse_resource_commands(&reflect(vec![param])).unwrap_err();
        assert!(err.to_string().contains("it only supports floats"));
    }

    #[test]
    fn test_color_pick_rejects_vec2() {
        let param = with_attr(
            uniform_param("uv", 0, 8, vector(2, "float32")),
            attr("playground_COLOR_PICK", vec![num(0.0), num(0.0), num(0.0)]),
        );
        assert!(parse_resource_commands(&reflect(vec![param])).is_err());
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let param = with_attr(
            slot_param("data", 1, buffer(scalar("float32"), None)),
            attr("playground_ZEROS", vec![]),
        );
        let err = parse_resource_commands(&reflect(vec![param])).unwrap_err();
        assert!(err.to_string().contains("missing numeric argument 1"));
    }

    #[test]
    fn test_foreign_attributes_are_ignored() {
        let params = vec![
            with_attr(
                slot_param("data", 1, buffer(scalar("float32"), None)),
                attr("vk_binding", vec![num(1.0)]),
            ),
            with_attr(
                slot_param("more", 2, buffer(scalar("float32"), None)),
                attr("playground_UNKNOWN", vec![]),
            ),
        ];
        assert!(parse_resource_commands(&reflect(params)).unwrap().is_empty());
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let params = vec![
            with_attr(
                slot_param("b", 2, buffer(scalar("float32"), Some(ResourceAccess::ReadWrite))),
                attr("playground_RAND", vec![num(16.0)]),
            ),
            with_attr(
                slot_param("a", 1, buffer(scalar("float32"), Some(ResourceAccess::ReadWrite))),
                attr("playground_ZEROS", vec![num(16.0)]),
            ),
        ];
        let names: Vec<_> = parse_resource_commands(&reflect(params))
            .unwrap()
            .into_iter()
            .map(|c| c.resource_name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
