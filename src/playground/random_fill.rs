//! Random buffer fill
//!
//! `playground_RAND` buffers are filled on the GPU by a small auxiliary
//! kernel. The kernel is compiled on first use and kept for the lifetime of
//! the session; every fill uses a fresh seed and waits for completion.

use eframe::wgpu::{
    Buffer, BufferDescriptor, BufferUsages, CommandEncoderDescriptor, Device, Queue,
};

use super::bindings::build_bindings;
use super::compute_pipeline::ComputePipeline;
use super::resources::{wait_for_submission, GpuResource, ResourceMap};
use crate::compiler::ShaderCompiler;
use crate::utils::playground_constants::{
    MIN_UNIFORM_SIZE, OUTPUT_BUFFER, RAND_ENTRY_POINT, RAND_WORKGROUP_WIDTH, UNIFORM_INPUT,
};
use crate::utils::ShaderError;

const RAND_FLOAT_SOURCE: &str = include_str!("../assets/shaders/rand_float.wgsl");

#[derive(Default)]
pub struct RandomFill {
    pipeline: Option<ComputePipeline>,
    seed: Option<Buffer>,
}

impl RandomFill {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_pipeline(&mut self, device: &Device, compiler: &dyn ShaderCompiler) -> Result<(), ShaderError> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        log::info!("[RandomFill] Compiling random fill kernel");
        let program = compiler
            .compile(RAND_FLOAT_SOURCE, RAND_ENTRY_POINT, "WGSL")
            .into_program()
            .map_err(|e| ShaderError::resource(format!("[Internal] Failed to compile randFloat shader: {}", e)))?;
        let bindings = build_bindings(&program.reflection)?;

        self.pipeline = Some(ComputePipeline::new(
            device,
            "rand_float",
            &program.code,
            bindings,
            &[RAND_ENTRY_POINT],
        ));
        self.seed = Some(device.create_buffer(&BufferDescriptor {
            label: Some("rand_float_seed"),
            size: MIN_UNIFORM_SIZE,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        Ok(())
    }

    /// Fill the first `count` floats of `target` with values in [0, 1).
    pub fn fill(
        &mut self,
        device: &Device,
        queue: &Queue,
        compiler: &dyn ShaderCompiler,
        target: &Buffer,
        count: u32,
    ) -> Result<(), ShaderError> {
        self.ensure_pipeline(device, compiler)?;
        let (Some(pipeline), Some(seed)) = (self.pipeline.as_mut(), self.seed.as_ref()) else {
            return Err(ShaderError::not_ready("random fill kernel unavailable"));
        };

        let seed_value: [f32; 4] = [rand::random::<f32>(), 0.0, 0.0, 0.0];
        queue.write_buffer(seed, 0, bytemuck::cast_slice(&seed_value));

        let resources = ResourceMap::from([
            (UNIFORM_INPUT.to_string(), GpuResource::Buffer(seed.clone())),
            (OUTPUT_BUFFER.to_string(), GpuResource::Buffer(target.clone())),
        ]);
        pipeline.create_bind_group(device, &resources)?;

        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("rand_float_encoder"),
        });
        pipeline.dispatch(
            &mut encoder,
            RAND_ENTRY_POINT,
            [count.div_ceil(RAND_WORKGROUP_WIDTH), 1, 1],
        )?;
        let submission = queue.submit(Some(encoder.finish()));
        wait_for_submission(device, submission)?;

        log::debug!("[RandomFill] Filled {} floats", count);
        Ok(())
    }
}
