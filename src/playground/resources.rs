//! Resource command interpreter, execution stage
//!
//! Planning is pure: bindings, commands and the viewport go in, a list of
//! allocations comes out. Allocation then turns the plan into wgpu objects.

use std::collections::HashMap;

use eframe::wgpu::{
    Buffer, BufferDescriptor, BufferUsages, Device, Extent3d, Limits, PollType, Queue, SubmissionIndex,
    TexelCopyBufferLayout, Texture, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages,
};

use super::bindings::{BindingDescriptor, Bindings};
use super::call_commands::DispatchExtent;
use super::random_fill::RandomFill;
use super::resource_commands::{ParsedCommand, ResourceCommand};
use crate::compiler::ShaderCompiler;
use crate::utils::image_loader::{create_image_texture, fetch_image};
use crate::utils::playground_constants::{
    MIN_UNIFORM_SIZE, MIN_VIEWPORT, OUTPUT_BUFFER, OUTPUT_BUFFER_READ, OUTPUT_BUFFER_SIZE,
    OUTPUT_TEXTURE, PRINTF_BUFFER, PRINTF_BUFFER_READ, PRINTF_BUFFER_SIZE, UNIFORM_INPUT,
};
use crate::utils::ShaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Texture,
}

/// A resource owned by the session.
#[derive(Debug, Clone)]
pub enum GpuResource {
    Buffer(Buffer),
    Texture(Texture),
}

impl GpuResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            GpuResource::Buffer(_) => ResourceKind::Buffer,
            GpuResource::Texture(_) => ResourceKind::Texture,
        }
    }

    pub fn extent(&self) -> DispatchExtent {
        match self {
            GpuResource::Buffer(buffer) => DispatchExtent::Buffer { size: buffer.size() },
            GpuResource::Texture(texture) => DispatchExtent::Texture {
                width: texture.width(),
                height: texture.height(),
            },
        }
    }

    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            GpuResource::Buffer(buffer) => Some(buffer),
            GpuResource::Texture(_) => None,
        }
    }

    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            GpuResource::Texture(texture) => Some(texture),
            GpuResource::Buffer(_) => None,
        }
    }

    pub fn destroy(&self) {
        match self {
            GpuResource::Buffer(buffer) => buffer.destroy(),
            GpuResource::Texture(texture) => texture.destroy(),
        }
    }
}

pub type ResourceMap = HashMap<String, GpuResource>;

/// Insert a resource, destroying whatever it replaces.
pub fn safe_set(resources: &mut ResourceMap, name: &str, resource: GpuResource) {
    if let Some(previous) = resources.insert(name.to_string(), resource) {
        log::debug!("[Resources] Replacing {}", name);
        previous.destroy();
    }
}

pub fn destroy_all(resources: &mut ResourceMap) {
    for (_, resource) in resources.drain() {
        resource.destroy();
    }
}

/// Block until a submission has finished executing.
pub fn wait_for_submission(device: &Device, submission: SubmissionIndex) -> Result<(), ShaderError> {
    device
        .poll(PollType::Wait {
            submission_index: Some(submission),
            timeout: None,
        })
        .map(|_| ())
        .map_err(|e| ShaderError::Gpu(format!("GPU Error\n\n{}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferInit {
    Zeroed,
    Random { count: u32 },
    Uninitialized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    Buffer {
        name: String,
        size: u64,
        usage: BufferUsages,
        init: BufferInit,
    },
    Texture {
        name: String,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsages,
        zeroed: bool,
    },
    Image {
        name: String,
        url: String,
    },
}

impl Allocation {
    pub fn name(&self) -> &str {
        match self {
            Allocation::Buffer { name, .. } | Allocation::Texture { name, .. } | Allocation::Image { name, .. } => {
                name
            }
        }
    }

    /// Explicit initial contents, when the allocation has any.
    pub fn initial_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Allocation::Buffer {
                size,
                init: BufferInit::Zeroed,
                ..
            } => Some(vec![0; *size as usize]),
            Allocation::Texture {
                width,
                height,
                format,
                zeroed: true,
                ..
            } => {
                let texel = u64::from(format.block_copy_size(None).unwrap_or(4));
                Some(vec![0; (u64::from(*width) * u64::from(*height) * texel) as usize])
            }
            _ => None,
        }
    }
}

/// Buffers are padded to the 4-byte copy alignment.
fn aligned(size: u64) -> u64 {
    size.div_ceil(4) * 4
}

fn binding_for<'a>(bindings: &'a Bindings, name: &str) -> Result<&'a BindingDescriptor, ShaderError> {
    bindings
        .get(name)
        .ok_or_else(|| ShaderError::resource(format!("Resource {} is not defined in the bindings.", name)))
}

fn black_texture(bindings: &Bindings, name: &str, width: u32, height: u32) -> Result<Allocation, ShaderError> {
    let binding = binding_for(bindings, name)?;
    let (format, usage) = if binding.is_storage_texture() {
        (
            binding.storage_format().unwrap_or(TextureFormat::R32Float),
            TextureUsages::STORAGE_BINDING,
        )
    } else if binding.is_texture() {
        (TextureFormat::Rgba8Unorm, TextureUsages::empty())
    } else {
        return Err(ShaderError::resource(format!("Resource {} is not a texture.", name)));
    };
    Ok(Allocation::Texture {
        name: name.to_string(),
        width,
        height,
        format,
        usage: usage | TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST | TextureUsages::RENDER_ATTACHMENT,
        zeroed: true,
    })
}

/// Storage buffers must fit both the buffer and the binding limit.
fn check_buffer_size(limits: &Limits, name: &str, directive: &str, size: u64) -> Result<(), ShaderError> {
    let max = limits.max_buffer_size.min(u64::from(limits.max_storage_buffer_binding_size));
    if size > max {
        return Err(ShaderError::resource(format!(
            "Resource {} requested by {} needs {} bytes, the device allows at most {}",
            name, directive, size, max
        )));
    }
    Ok(())
}

fn check_texture_size(limits: &Limits, name: &str, directive: &str, width: u32, height: u32) -> Result<(), ShaderError> {
    let max = limits.max_texture_dimension_2d;
    if width > max || height > max {
        return Err(ShaderError::resource(format!(
            "Resource {} requested by {} is {}x{}, the device allows at most {}x{}",
            name, directive, width, height, max, max
        )));
    }
    Ok(())
}

fn scaled(scale: f32, extent: u32) -> u32 {
    ((scale * extent as f32).floor() as u32).max(1)
}

/// Everything a run needs: command-driven resources followed by the
/// always-present output, log and uniform resources.
pub fn plan_allocations(
    bindings: &Bindings,
    commands: &[ResourceCommand],
    viewport: [u32; 2],
    uniform_size: u32,
    limits: &Limits,
) -> Result<Vec<Allocation>, ShaderError> {
    let [width, height] = viewport;
    if width < MIN_VIEWPORT || height < MIN_VIEWPORT {
        return Err(ShaderError::not_ready(format!("viewport is {}x{}", width, height)));
    }
    check_texture_size(limits, OUTPUT_TEXTURE, "the viewport", width, height)?;

    let mut plan = Vec::new();
    for ResourceCommand { resource_name, command } in commands {
        let name = resource_name.as_str();
        let allocation = match command {
            ParsedCommand::Zeros { count, element_size } => {
                if !binding_for(bindings, name)?.is_buffer() {
                    return Err(ShaderError::resource(format!(
                        "Resource {} is an invalid type for {}",
                        name,
                        command.directive()
                    )));
                }
                Allocation::Buffer {
                    name: name.to_string(),
                    size: aligned(u64::from(*count) * u64::from(*element_size)),
                    usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
                    init: BufferInit::Zeroed,
                }
            }
            ParsedCommand::Rand { count } => {
                if !binding_for(bindings, name)?.is_buffer() {
                    return Err(ShaderError::resource(format!("Resource {} is not defined as a buffer.", name)));
                }
                Allocation::Buffer {
                    name: name.to_string(),
                    size: u64::from(*count) * 4,
                    usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
                    init: BufferInit::Random { count: *count },
                }
            }
            ParsedCommand::Black { width, height } => black_texture(bindings, name, *width, *height)?,
            ParsedCommand::BlackScreen {
                width_scale,
                height_scale,
            } => black_texture(
                bindings,
                name,
                scaled(*width_scale, width),
                scaled(*height_scale, height),
            )?,
            ParsedCommand::Url { url } => {
                if !binding_for(bindings, name)?.is_texture() {
                    return Err(ShaderError::resource(format!("Resource {} is not a texture.", name)));
                }
                Allocation::Image {
                    name: name.to_string(),
                    url: url.clone(),
                }
            }
            ParsedCommand::Slider { .. } | ParsedCommand::ColorPick { .. } => continue,
        };
        match &allocation {
            Allocation::Buffer { size, .. } => check_buffer_size(limits, name, command.directive(), *size)?,
            Allocation::Texture { width, height, .. } => {
                check_texture_size(limits, name, command.directive(), *width, *height)?
            }
            Allocation::Image { .. } => {}
        }
        plan.push(allocation);
    }

    plan.push(Allocation::Texture {
        name: OUTPUT_TEXTURE.to_string(),
        width,
        height,
        format: TextureFormat::Rgba8Unorm,
        usage: TextureUsages::STORAGE_BINDING | TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_SRC,
        zeroed: false,
    });
    let readback_pair = |name: &str, read_name: &str, size: u64| {
        [
            Allocation::Buffer {
                name: name.to_string(),
                size,
                usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
                init: BufferInit::Zeroed,
            },
            Allocation::Buffer {
                name: read_name.to_string(),
                size,
                usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
                init: BufferInit::Uninitialized,
            },
        ]
    };
    plan.extend(readback_pair(OUTPUT_BUFFER, OUTPUT_BUFFER_READ, OUTPUT_BUFFER_SIZE));
    plan.extend(readback_pair(PRINTF_BUFFER, PRINTF_BUFFER_READ, PRINTF_BUFFER_SIZE));
    plan.push(Allocation::Buffer {
        name: UNIFORM_INPUT.to_string(),
        size: aligned(u64::from(uniform_size).max(MIN_UNIFORM_SIZE)),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        init: BufferInit::Zeroed,
    });

    Ok(plan)
}

/// Create every planned resource. Random fills run to completion before this returns.
pub fn allocate(
    device: &Device,
    queue: &Queue,
    plan: &[Allocation],
    random_fill: &mut RandomFill,
    compiler: &dyn ShaderCompiler,
) -> Result<ResourceMap, ShaderError> {
    let mut resources = ResourceMap::new();
    match allocate_into(device, queue, plan, random_fill, compiler, &mut resources) {
        Ok(()) => Ok(resources),
        Err(err) => {
            destroy_all(&mut resources);
            Err(err)
        }
    }
}

fn allocate_into(
    device: &Device,
    queue: &Queue,
    plan: &[Allocation],
    random_fill: &mut RandomFill,
    compiler: &dyn ShaderCompiler,
    resources: &mut ResourceMap,
) -> Result<(), ShaderError> {
    for allocation in plan {
        let initial = allocation.initial_bytes();
        let resource = match allocation {
            Allocation::Buffer { name, size, usage, init } => {
                log::debug!("[Resources] Buffer {} ({} bytes)", name, size);
                let buffer = device.create_buffer(&BufferDescriptor {
                    label: Some(name),
                    size: *size,
                    usage: *usage,
                    mapped_at_creation: false,
                });
                if let Some(bytes) = &initial {
                    queue.write_buffer(&buffer, 0, bytes);
                }
                if let BufferInit::Random { count } = init {
                    random_fill.fill(device, queue, compiler, &buffer, *count)?;
                }
                GpuResource::Buffer(buffer)
            }
            Allocation::Texture {
                name,
                width,
                height,
                format,
                usage,
                ..
            } => {
                log::debug!("[Resources] Texture {} ({}x{} {:?})", name, width, height, format);
                let size = Extent3d {
                    width: *width,
                    height: *height,
                    depth_or_array_layers: 1,
                };
                let texture = device.create_texture(&TextureDescriptor {
                    label: Some(name),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: TextureDimension::D2,
                    format: *format,
                    usage: *usage,
                    view_formats: &[],
                });
                if let Some(bytes) = &initial {
                    let texel = format.block_copy_size(None).unwrap_or(4);
                    queue.write_texture(
                        texture.as_image_copy(),
                        bytes,
                        TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(width * texel),
                            rows_per_image: Some(*height),
                        },
                        size,
                    );
                }
                GpuResource::Texture(texture)
            }
            Allocation::Image { name, url } => {
                let image = fetch_image(url)?;
                let (width, height) = image.dimensions();
                check_texture_size(&device.limits(), name, "URL", width, height)?;
                GpuResource::Texture(create_image_texture(device, queue, name, &image))
            }
        };
        safe_set(resources, allocation.name(), resource);
    }
    Ok(())
}
