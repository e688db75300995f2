//! Playground session
//!
//! Owns everything a run needs on the GPU side: the compiled program, the
//! allocated resource set, the compute pipeline and the presentation path.
//! It is driven by [`RenderLoop`](super::render_loop::RenderLoop) through the
//! [`FrameDriver`] trait, so setup and frames never overlap.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use eframe::wgpu::{BindGroup, CommandEncoderDescriptor, MapMode, PollType};
use egui_wgpu::RenderState;

use super::bindings::build_bindings;
use super::blit_pipeline::{BlitPipeline, DisplayTarget};
use super::call_commands::{parse_call_commands, workgroup_count, CallCommand};
use super::compute_pipeline::ComputePipeline;
use super::log_decoder::{decode, words_from_bytes};
use super::random_fill::RandomFill;
use super::reflection::{ReflectionBinding, ReflectionJson};
use super::render_loop::{FrameDriver, FrameOutcome};
use super::resource_commands::{parse_resource_commands, uniform_controllers, UniformController};
use super::resources::{
    allocate, destroy_all, plan_allocations, wait_for_submission, GpuResource, ResourceMap,
};
use super::uniform_layout::get_uniform_size;
use crate::compiler::{check_shader_type, CompileTarget, CompiledProgram, ShaderCompiler, ShaderMode};
use crate::utils::playground_constants::{
    FRAME_TIME_WINDOW, MAIN_PASS_TILE, MOUSE_UNIFORM, OUTPUT_BUFFER, OUTPUT_BUFFER_READ,
    OUTPUT_BUFFER_SIZE, OUTPUT_TEXTURE, PRINTF_BUFFER, PRINTF_BUFFER_READ, PRINTF_BUFFER_SIZE,
    PRINTF_RECORD_SIZE, TIME_UNIFORM, UNIFORM_INPUT,
};
use crate::utils::{guard_gpu, ShaderError};

/// Start (or restart) a run of `source` at the given viewport size.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub source: String,
    pub viewport: [u32; 2],
}

/// Result of compiling for the code and reflection panes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileReport {
    pub code: String,
    pub reflection_json: String,
    pub diagnostics: String,
}

impl CompileReport {
    fn from_program(program: &CompiledProgram, diagnostics: String) -> Self {
        Self {
            code: program.code.clone(),
            reflection_json: program.reflection.to_json_pretty(),
            diagnostics,
        }
    }
}

/// The last runnable WGSL compile, keyed by its source.
#[derive(Debug, Default)]
pub struct ProgramCache {
    entry: Option<(String, CompiledProgram)>,
}

impl ProgramCache {
    pub fn get(&self, source: &str) -> Option<&CompiledProgram> {
        self.entry
            .as_ref()
            .filter(|(cached_source, _)| cached_source == source)
            .map(|(_, program)| program)
    }

    /// Recompile only when the source changed since the last compile.
    pub fn program_for(
        &mut self,
        compiler: &dyn ShaderCompiler,
        source: &str,
        mode: ShaderMode,
    ) -> Result<CompiledProgram, ShaderError> {
        if let Some(program) = self.get(source) {
            return Ok(program.clone());
        }

        let program = compiler
            .compile(source, mode.entry_point(), CompileTarget::Wgsl.as_str())
            .into_program()?;
        self.entry = Some((source.to_string(), program.clone()));
        Ok(program)
    }
}

/// Compile `source` for display in any target. Nothing is run. Runnable WGSL
/// compiles go through `cache`, so the run that follows reuses them.
pub fn compile_for_display(
    compiler: &dyn ShaderCompiler,
    source: &str,
    target: CompileTarget,
    cache: &mut ProgramCache,
) -> CompileReport {
    if let (true, Ok(mode)) = (target.is_runnable(), check_shader_type(source)) {
        return match cache.program_for(compiler, source, mode) {
            Ok(program) => CompileReport::from_program(&program, String::new()),
            Err(ShaderError::Compilation(diagnostics)) => CompileReport {
                diagnostics,
                ..Default::default()
            },
            Err(err) => CompileReport {
                diagnostics: err.to_string(),
                ..Default::default()
            },
        };
    }

    let entry_point = match check_shader_type(source) {
        Ok(mode) => mode.entry_point().to_string(),
        Err(_) => match compiler.find_defined_entry_points(source).into_iter().next() {
            Some(name) => name,
            None => {
                return CompileReport {
                    diagnostics: "No compute entry point found.".to_string(),
                    ..Default::default()
                }
            }
        },
    };

    let outcome = compiler.compile(source, &entry_point, target.as_str());
    match outcome.program {
        Some(program) => CompileReport::from_program(&program, outcome.diagnostics),
        None => CompileReport {
            diagnostics: outcome.diagnostics,
            ..Default::default()
        },
    }
}

/// Pointer state in the classic `mouse` uniform convention.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub position: [f32; 2],
    pub click: [f32; 2],
    pub down: bool,
    pub clicked: bool,
}

impl PointerState {
    /// `xy` follows the pointer while pressed, `zw` is the last click.
    /// `z` is negative when released, `w` negative unless clicked this frame.
    pub fn to_uniform(&self) -> [f32; 4] {
        let z = if self.down { self.click[0] } else { -self.click[0].abs() };
        let w = if self.clicked { self.click[1] } else { -self.click[1].abs() };
        [self.position[0], self.position[1], z, w]
    }
}

/// Rolling average over the last few frame durations.
#[derive(Debug, Default)]
pub struct FrameTimer {
    samples: VecDeque<Duration>,
}

impl FrameTimer {
    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == FRAME_TIME_WINDOW as usize {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn average_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total.as_secs_f64() * 1000.0 / self.samples.len() as f64)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

/// Byte writes into `uniformInput` for one frame.
pub fn uniform_writes(
    reflection: &ReflectionJson,
    time: f32,
    mouse: [f32; 4],
    controllers: &[UniformController],
) -> Vec<(u64, Vec<u8>)> {
    let mut writes = Vec::new();
    let uniform_at = |name: &str, size: u32| {
        reflection.uniform_parameters().find_map(|p| match p.binding {
            ReflectionBinding::Uniform { offset, size: s } if p.name == name && s == size => Some(u64::from(offset)),
            _ => None,
        })
    };

    if let Some(offset) = uniform_at(TIME_UNIFORM, 4) {
        writes.push((offset, bytemuck::bytes_of(&time).to_vec()));
    }
    if let Some(offset) = uniform_at(MOUSE_UNIFORM, 16) {
        writes.push((offset, bytemuck::cast_slice(mouse.as_slice()).to_vec()));
    }
    for controller in controllers {
        writes.push((u64::from(controller.byte_offset()), controller.value_bytes()));
    }
    writes
}

/// Work-groups for the `imageMain`/`printMain` pass: one thread per pixel in
/// image mode, a single thread in print mode.
pub fn main_pass_workgroups(mode: ShaderMode, viewport: [u32; 2], thread_group: Option<[u32; 3]>) -> [u32; 3] {
    match mode {
        ShaderMode::Image => workgroup_count(
            [viewport[0], viewport[1], 1],
            thread_group.unwrap_or([MAIN_PASS_TILE, MAIN_PASS_TILE, 1]),
        ),
        ShaderMode::Print => [1, 1, 1],
    }
}

/// Keep values the user already tuned when a program is set up again.
pub fn retain_controller_values(previous: &[UniformController], next: &mut [UniformController]) {
    for controller in next.iter_mut() {
        let Some(old) = previous.iter().find(|p| p.name() == controller.name()) else {
            continue;
        };
        match (controller, old) {
            (UniformController::Slider { value, min, max, .. }, UniformController::Slider { value: old, .. }) => {
                *value = old.clamp(*min, *max);
            }
            (UniformController::ColorPick { value, .. }, UniformController::ColorPick { value: old, .. }) => {
                *value = *old;
            }
            _ => {}
        }
    }
}

struct ActiveRun {
    mode: ShaderMode,
    program: CompiledProgram,
    pipeline: ComputePipeline,
    resources: ResourceMap,
    calls: Vec<CallCommand>,
    controllers: Vec<UniformController>,
    display: Option<(DisplayTarget, BindGroup)>,
    viewport: [u32; 2],
    started: Instant,
    frames: u64,
}

impl ActiveRun {
    fn buffer(&self, name: &str) -> Result<&eframe::wgpu::Buffer, ShaderError> {
        self.resources
            .get(name)
            .and_then(GpuResource::as_buffer)
            .ok_or_else(|| ShaderError::resource(format!("{} buffer is missing", name)))
    }

    fn release(mut self, render_state: &RenderState) {
        destroy_all(&mut self.resources);
        if let Some((display, _)) = self.display.take() {
            display.release(render_state);
        }
    }
}

pub struct PlaygroundSession {
    render_state: RenderState,
    compiler: Box<dyn ShaderCompiler>,
    random_fill: RandomFill,
    blit: Option<BlitPipeline>,
    compiled: ProgramCache,
    active: Option<ActiveRun>,
    output: Option<String>,
    pointer: PointerState,
    frame_timer: FrameTimer,
}

impl PlaygroundSession {
    pub fn new(render_state: RenderState, compiler: Box<dyn ShaderCompiler>) -> Self {
        Self {
            render_state,
            compiler,
            random_fill: RandomFill::new(),
            blit: None,
            compiled: ProgramCache::default(),
            active: None,
            output: None,
            pointer: PointerState::default(),
            frame_timer: FrameTimer::default(),
        }
    }

    pub fn viewport(&self) -> Option<[u32; 2]> {
        self.active.as_ref().map(|run| run.viewport)
    }

    pub fn display_texture(&self) -> Option<eframe::egui::TextureId> {
        self.active
            .as_ref()
            .and_then(|run| run.display.as_ref())
            .map(|(display, _)| display.texture_id())
    }

    /// Decoded output of the last print run.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn controllers_mut(&mut self) -> &mut [UniformController] {
        match self.active.as_mut() {
            Some(run) => &mut run.controllers,
            None => &mut [],
        }
    }

    pub fn set_pointer(&mut self, pointer: PointerState) {
        self.pointer = pointer;
    }

    pub fn average_frame_ms(&self) -> Option<f64> {
        self.frame_timer.average_ms()
    }

    /// Compile for the code and reflection panes with the session's compiler.
    pub fn compile_for_display(&mut self, source: &str, target: CompileTarget) -> CompileReport {
        compile_for_display(self.compiler.as_ref(), source, target, &mut self.compiled)
    }

    fn build_run(&mut self, mode: ShaderMode, program: CompiledProgram, viewport: [u32; 2]) -> Result<ActiveRun, ShaderError> {
        let reflection = &program.reflection;
        let bindings = build_bindings(reflection)?;
        let commands = parse_resource_commands(reflection)?;
        let calls = parse_call_commands(reflection)?;
        let uniform_size = get_uniform_size(reflection);
        let device = &self.render_state.device;
        let plan = plan_allocations(&bindings, &commands, viewport, uniform_size, &device.limits())?;

        let queue = &self.render_state.queue;
        let mut resources = allocate(device, queue, &plan, &mut self.random_fill, self.compiler.as_ref())?;

        let mut entry_points: Vec<&str> = calls.iter().map(|call| call.fn_name.as_str()).collect();
        if !entry_points.contains(&mode.entry_point()) {
            entry_points.push(mode.entry_point());
        }

        let mut pipeline = ComputePipeline::new(device, "playground", &program.code, bindings, &entry_points);
        if let Err(err) = pipeline.create_bind_group(device, &resources) {
            destroy_all(&mut resources);
            return Err(err);
        }

        let display = match (mode, resources.get(OUTPUT_TEXTURE).and_then(GpuResource::as_texture)) {
            (ShaderMode::Image, Some(output)) => {
                let blit = self.blit.get_or_insert_with(|| BlitPipeline::new(device));
                let source = blit.bind(device, output);
                Some((DisplayTarget::new(&self.render_state, viewport), source))
            }
            _ => None,
        };

        let mut controllers = uniform_controllers(&commands);
        if let Some(previous) = &self.active {
            retain_controller_values(&previous.controllers, &mut controllers);
        }

        log::info!(
            "[Session] {:?} run ready: {} resources, {} auxiliary passes, {}x{}",
            mode,
            resources.len(),
            calls.len(),
            viewport[0],
            viewport[1]
        );

        Ok(ActiveRun {
            mode,
            program,
            pipeline,
            resources,
            calls,
            controllers,
            display,
            viewport,
            started: Instant::now(),
            frames: 0,
        })
    }

    fn execute(&mut self) -> Result<FrameOutcome, ShaderError> {
        let run = self
            .active
            .as_mut()
            .ok_or_else(|| ShaderError::not_ready("no active run"))?;
        let device = &self.render_state.device;
        let queue = &self.render_state.queue;
        let frame_start = Instant::now();

        let uniform = run.buffer(UNIFORM_INPUT)?;
        let time = run.started.elapsed().as_secs_f32();
        for (offset, bytes) in uniform_writes(&run.program.reflection, time, self.pointer.to_uniform(), &run.controllers) {
            queue.write_buffer(uniform, offset, &bytes);
        }

        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("playground_frame"),
        });

        for call in &run.calls {
            if call.call_once && run.frames > 0 {
                continue;
            }
            let extent = call
                .resource_name()
                .and_then(|name| run.resources.get(name))
                .map(GpuResource::extent);
            let work = call.work_size(extent)?;
            let thread_group = run
                .program
                .thread_group_sizes
                .get(&call.fn_name)
                .copied()
                .unwrap_or([1, 1, 1]);
            run.pipeline
                .dispatch(&mut encoder, &call.fn_name, workgroup_count(work, thread_group))?;
        }

        let main_workgroups = main_pass_workgroups(
            run.mode,
            run.viewport,
            run.program.thread_group_sizes.get(run.mode.entry_point()).copied(),
        );
        run.pipeline
            .dispatch(&mut encoder, run.mode.entry_point(), main_workgroups)?;

        match (&run.mode, &run.display) {
            (ShaderMode::Image, Some((display, source))) => {
                if let Some(blit) = &self.blit {
                    blit.encode(&mut encoder, source, display);
                }
            }
            _ => {
                encoder.copy_buffer_to_buffer(
                    run.buffer(PRINTF_BUFFER)?,
                    0,
                    run.buffer(PRINTF_BUFFER_READ)?,
                    0,
                    PRINTF_BUFFER_SIZE,
                );
                encoder.copy_buffer_to_buffer(
                    run.buffer(OUTPUT_BUFFER)?,
                    0,
                    run.buffer(OUTPUT_BUFFER_READ)?,
                    0,
                    OUTPUT_BUFFER_SIZE,
                );
            }
        }

        let submission = queue.submit(Some(encoder.finish()));
        wait_for_submission(device, submission)?;
        run.frames += 1;

        if run.mode == ShaderMode::Print {
            let bytes = read_mapped(device, run.buffer(PRINTF_BUFFER_READ)?)?;
            let lines = decode(run.program.hashed_strings(), &words_from_bytes(&bytes), PRINTF_RECORD_SIZE)?;
            log::info!("[Session] Print run produced {} lines", lines.len());
            self.output = Some(format!("Shader Output:\n{}", lines.join("")));
            return Ok(FrameOutcome::Finished);
        }

        self.frame_timer.record(frame_start.elapsed());
        Ok(FrameOutcome::Continue)
    }
}

/// Map a finished read-back buffer and copy its contents out.
fn read_mapped(device: &eframe::wgpu::Device, buffer: &eframe::wgpu::Buffer) -> Result<Vec<u8>, ShaderError> {
    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .map_err(|e| ShaderError::Gpu(format!("GPU Error\n\n{}", e)))?;

    rx.recv()
        .map_err(|_| ShaderError::resource("Buffer mapping was dropped"))?
        .map_err(|e| ShaderError::resource(format!("Failed to map the print buffer: {}", e)))?;

    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(bytes)
}

impl FrameDriver for PlaygroundSession {
    type Request = RunRequest;

    fn setup(&mut self, request: RunRequest) -> Result<(), ShaderError> {
        let mode = check_shader_type(&request.source)?;
        let program = self
            .compiled
            .program_for(self.compiler.as_ref(), &request.source, mode)?;
        let run = guard_gpu(|| self.build_run(mode, program, request.viewport))?;

        if let Some(previous) = self.active.replace(run) {
            previous.release(&self.render_state);
        }
        self.output = None;
        self.frame_timer.reset();
        Ok(())
    }

    fn frame(&mut self) -> Result<FrameOutcome, ShaderError> {
        guard_gpu(|| self.execute())
    }
}

impl Drop for PlaygroundSession {
    fn drop(&mut self) {
        if let Some(run) = self.active.take() {
            run.release(&self.render_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::compiler::{CompileOutcome, WgslCompiler};
    use crate::playground::reflection::tests::{scalar, uniform_param, vector};

    #[test]
    fn test_pointer_uniform_signs() {
        let mut pointer = PointerState {
            position: [10.0, 20.0],
            click: [30.0, 40.0],
            down: true,
            clicked: true,
        };
        assert_eq!(pointer.to_uniform(), [10.0, 20.0, 30.0, 40.0]);

        pointer.down = false;
        pointer.clicked = false;
        assert_eq!(pointer.to_uniform(), [10.0, 20.0, -30.0, -40.0]);
    }

    #[test]
    fn test_frame_timer_window() {
        let mut timer = FrameTimer::default();
        assert_eq!(timer.average_ms(), None);
        for _ in 0..FRAME_TIME_WINDOW {
            timer.record(Duration::from_millis(100));
        }
        for _ in 0..FRAME_TIME_WINDOW {
            timer.record(Duration::from_millis(10));
        }
        let avg = timer.average_ms().unwrap();
        assert!((avg - 10.0).abs() < 1e-6, "{}", avg);
    }

    #[test]
    fn test_uniform_writes_builtins_and_controllers() {
        let reflection = ReflectionJson {
            parameters: vec![
                uniform_param("time", 0, 4, scalar("float32")),
                uniform_param("radius", 4, 4, scalar("float32")),
                uniform_param("mouse", 16, 16, vector(4, "float32")),
            ],
            ..Default::default()
        };
        let controllers = [UniformController::Slider {
            name: "radius".into(),
            value: 0.5,
            min: 0.0,
            max: 1.0,
            byte_offset: 4,
        }];
        let writes = uniform_writes(&reflection, 2.0, [1.0, 2.0, 3.0, 4.0], &controllers);
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0], (0, 2.0f32.to_le_bytes().to_vec()));
        assert_eq!(writes[1].0, 16);
        assert_eq!(writes[1].1.len(), 16);
        assert_eq!(writes[2], (4, 0.5f32.to_le_bytes().to_vec()));
    }

    #[test]
    fn test_time_with_wrong_size_is_ignored() {
        let reflection = ReflectionJson {
            parameters: vec![uniform_param("time", 0, 8, vector(2, "float32"))],
            ..Default::default()
        };
        assert!(uniform_writes(&reflection, 1.0, [0.0; 4], &[]).is_empty());
    }

    #[test]
    fn test_controller_values_survive_restart() {
        let previous = [
            UniformController::Slider {
                name: "radius".into(),
                value: 0.9,
                min: 0.0,
                max: 1.0,
                byte_offset: 4,
            },
            UniformController::ColorPick {
                name: "color".into(),
                value: [0.1, 0.2, 0.3],
                byte_offset: 16,
            },
        ];
        let mut next = vec![
            UniformController::Slider {
                name: "radius".into(),
                value: 0.25,
                min: 0.0,
                max: 0.5,
                byte_offset: 4,
            },
            UniformController::Slider {
                name: "color".into(),
                value: 0.5,
                min: 0.0,
                max: 1.0,
                byte_offset: 16,
            },
        ];
        retain_controller_values(&previous, &mut next);
        assert!(matches!(next[0], UniformController::Slider { value, .. } if value == 0.5));
        assert!(matches!(next[1], UniformController::Slider { value, .. } if value == 0.5));
    }

    #[test]
    fn test_compile_for_display_targets() {
        let compiler = WgslCompiler::new();
        let source = include_str!("../assets/shaders/circle.wgsl");

        let report = compile_for_display(&compiler, source, CompileTarget::Hlsl, &mut ProgramCache::default());
        assert!(report.diagnostics.is_empty(), "{}", report.diagnostics);
        assert!(report.reflection_json.contains("\"radius\""));

        let report = compile_for_display(&compiler, "fn helper() {}", CompileTarget::Wgsl, &mut ProgramCache::default());
        assert_eq!(report.diagnostics, "No compute entry point found.");
    }

    #[test]
    fn test_compile_for_display_library_source() {
        let compiler = WgslCompiler::new();
        let source = include_str!("../assets/shaders/rand_float.wgsl");
        let mut cache = ProgramCache::default();
        let report = compile_for_display(&compiler, source, CompileTarget::Wgsl, &mut cache);
        assert!(report.code.contains("computeMain"));
        assert!(cache.get(source).is_none());
    }

    struct CountingCompiler {
        inner: WgslCompiler,
        calls: Cell<u32>,
    }

    impl ShaderCompiler for CountingCompiler {
        fn compile(&self, source: &str, entry_point: &str, target: &str) -> CompileOutcome {
            self.calls.set(self.calls.get() + 1);
            self.inner.compile(source, entry_point, target)
        }

        fn find_defined_entry_points(&self, source: &str) -> Vec<String> {
            self.inner.find_defined_entry_points(source)
        }
    }

    #[test]
    fn test_display_compile_is_reused_by_run() {
        let compiler = CountingCompiler {
            inner: WgslCompiler::new(),
            calls: Cell::new(0),
        };
        let source = include_str!("../assets/shaders/circle.wgsl");
        let mut cache = ProgramCache::default();

        let report = compile_for_display(&compiler, source, CompileTarget::Wgsl, &mut cache);
        assert!(report.diagnostics.is_empty(), "{}", report.diagnostics);
        assert!(report.reflection_json.contains("\"radius\""));

        let program = cache.program_for(&compiler, source, ShaderMode::Image).unwrap();
        assert_eq!(program.code, report.code);
        assert_eq!(compiler.calls.get(), 1);

        compile_for_display(&compiler, source, CompileTarget::Hlsl, &mut cache);
        assert_eq!(compiler.calls.get(), 2);
        assert!(cache.get(source).is_some());
    }

    #[test]
    fn test_failed_display_compile_is_not_cached() {
        let compiler = WgslCompiler::new();
        let source = "@compute @workgroup_size(16, 16)\nfn imageMain() { let x: u32 = 1.5; }";
        let mut cache = ProgramCache::default();
        let report = compile_for_display(&compiler, source, CompileTarget::Wgsl, &mut cache);
        assert!(!report.diagnostics.is_empty());
        assert!(report.code.is_empty());
        assert!(cache.get(source).is_none());
    }

    #[test]
    fn test_main_pass_follows_workgroup_size() {
        assert_eq!(main_pass_workgroups(ShaderMode::Image, [640, 480], Some([8, 8, 1])), [80, 60, 1]);
        assert_eq!(main_pass_workgroups(ShaderMode::Image, [640, 480], Some([16, 16, 1])), [40, 30, 1]);
        assert_eq!(main_pass_workgroups(ShaderMode::Image, [100, 30], Some([64, 1, 1])), [2, 30, 1]);
        assert_eq!(main_pass_workgroups(ShaderMode::Image, [100, 30], None), [7, 2, 1]);
        assert_eq!(main_pass_workgroups(ShaderMode::Print, [640, 480], Some([1, 1, 1])), [1, 1, 1]);
    }

    #[test]
    fn test_main_pass_covers_viewport_for_compiled_shader() {
        let source = "@compute @workgroup_size(8, 8)\nfn imageMain(@builtin(global_invocation_id) id: vec3<u32>) {\n    textureStore(outputTexture, vec2<i32>(id.xy), vec4<f32>(1.0));\n}";
        let program = WgslCompiler::new()
            .compile(source, "imageMain", "WGSL")
            .into_program()
            .unwrap();
        let thread_group = program.thread_group_sizes.get("imageMain").copied();
        assert_eq!(thread_group, Some([8, 8, 1]));

        let groups = main_pass_workgroups(ShaderMode::Image, [640, 480], thread_group);
        assert_eq!([groups[0] * 8, groups[1] * 8], [640, 480]);
    }
}
