use std::collections::BTreeMap;
use std::sync::OnceLock;

use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{Module, ShaderStage};
use regex::Regex;

use super::compiler::{check_shader_type, CompileOutcome, CompileTarget, CompiledProgram, ShaderCompiler};
use super::directives::{extract_directives, replace_string_hashes};
use super::reflect::reflect_module;
use crate::utils::catch_panic_mut;
use crate::utils::playground_constants::PRINT_MAIN;

/// Print helpers, the log buffer and the output texture.
const PRELUDE: &str = include_str!("../assets/shaders/prelude.wgsl");

/// naga-backed compiler for the playground's WGSL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct WgslCompiler;

struct Prepared {
    source: String,
    hashed_strings: BTreeMap<u32, String>,
}

impl WgslCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Hash string literals and append the prelude to runnable sources.
    fn prepare(source: &str) -> Prepared {
        let (processed, hashed_strings) = replace_string_hashes(source);
        let source = if check_shader_type(source).is_ok() {
            format!("{}\n\n{}", processed, PRELUDE)
        } else {
            processed
        };
        Prepared {
            source,
            hashed_strings,
        }
    }

    fn parse_and_validate(source: &str) -> Result<(Module, ModuleInfo), String> {
        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| format!("WGSL Parse Error:\n{}", e.emit_to_string(source)))?;

        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        let info = validator
            .validate(&module)
            .map_err(|e| format!("WGSL Validation Error:\n{}", e.emit_to_string(source)))?;

        Ok((module, info))
    }

    fn compile_program(&self, source: &str, entry_point: &str, target: &str) -> Result<CompiledProgram, String> {
        let target: CompileTarget = target.parse()?;
        let prepared = Self::prepare(source);
        let directives = extract_directives(&prepared.source)?;

        log::debug!("[Compiler] Compiling {} bytes for {}", prepared.source.len(), target);
        let (module, info) = Self::parse_and_validate(&prepared.source)?;

        let reflection = reflect_module(&module, &directives, prepared.hashed_strings)
            .map_err(|problems| problems.join("\n"))?;
        reflection.validate().map_err(|e| e.to_string())?;
        let Some(entry) = reflection.find_entry_point(entry_point) else {
            return Err(format!("compute entry point '{}' not found", entry_point));
        };
        // The print helpers keep their write cursor per invocation.
        if entry.name == PRINT_MAIN && entry.thread_group_size != [1, 1, 1] {
            let [x, y, z] = entry.thread_group_size;
            return Err(format!(
                "{} must be declared with @workgroup_size(1), found @workgroup_size({}, {}, {})",
                PRINT_MAIN, x, y, z
            ));
        }

        let code = match target {
            CompileTarget::Wgsl => prepared.source,
            CompileTarget::Hlsl => to_hlsl(&module, &info)?,
            CompileTarget::Metal => to_msl(&module, &info)?,
        };

        let thread_group_sizes = reflection
            .entry_points
            .iter()
            .map(|ep| (ep.name.clone(), ep.thread_group_size))
            .collect();

        Ok(CompiledProgram {
            code,
            target,
            reflection,
            thread_group_sizes,
        })
    }
}

impl ShaderCompiler for WgslCompiler {
    fn compile(&self, source: &str, entry_point: &str, target: &str) -> CompileOutcome {
        match catch_panic_mut(|| self.compile_program(source, entry_point, target)) {
            Ok(Ok(program)) => {
                log::info!(
                    "[Compiler] Compiled {} ({} parameters, {} entry points)",
                    entry_point,
                    program.reflection.parameters.len(),
                    program.reflection.entry_points.len()
                );
                CompileOutcome {
                    program: Some(program),
                    diagnostics: String::new(),
                }
            }
            Ok(Err(diagnostics)) => {
                log::warn!("[Compiler] {}", diagnostics);
                CompileOutcome::failed(diagnostics)
            }
            Err(panic_msg) => CompileOutcome::failed(format!("Internal compiler error: {}", panic_msg)),
        }
    }

    fn find_defined_entry_points(&self, source: &str) -> Vec<String> {
        let prepared = Self::prepare(source);
        let parsed = catch_panic_mut(|| naga::front::wgsl::parse_str(&prepared.source));
        match parsed {
            Ok(Ok(module)) => module
                .entry_points
                .iter()
                .filter(|ep| ep.stage == ShaderStage::Compute)
                .map(|ep| ep.name.clone())
                .collect(),
            // best effort on sources that do not parse yet
            _ => scan_compute_functions(source),
        }
    }
}

fn scan_compute_functions(source: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"@compute[^{;]*?\bfn\s+([A-Za-z_][A-Za-z0-9_]*)").expect("entry point pattern")
    });
    re.captures_iter(source).map(|c| c[1].to_string()).collect()
}

fn to_hlsl(module: &Module, info: &ModuleInfo) -> Result<String, String> {
    let options = naga::back::hlsl::Options::default();
    let pipeline_options = naga::back::hlsl::PipelineOptions::default();
    let mut out = String::new();
    {
        let mut writer = naga::back::hlsl::Writer::new(&mut out, &options, &pipeline_options);
        writer
            .write(module, info, None)
            .map_err(|e| format!("HLSL translation failed: {}", e))?;
    }
    Ok(out)
}

fn to_msl(module: &Module, info: &ModuleInfo) -> Result<String, String> {
    let options = naga::back::msl::Options {
        lang_version: (2, 0),
        ..Default::default()
    };
    let (code, _) = naga::back::msl::write_string(
        module,
        info,
        &options,
        &naga::back::msl::PipelineOptions::default(),
    )
    .map_err(|e| format!("Metal translation failed: {}", e))?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playground::reflection::{BaseShape, ReflectionBinding, ReflectionType, ResourceAccess};
    use crate::utils::playground_constants::{OUTPUT_TEXTURE, PRINTF_BUFFER};

    const CIRCLE: &str = include_str!("../assets/shaders/circle.wgsl");
    const PRINT: &str = include_str!("../assets/shaders/print.wgsl");
    const MULTI: &str = include_str!("../assets/shaders/multi_kernel.wgsl");
    const RAND: &str = include_str!("../assets/shaders/rand_float.wgsl");

    fn compile(source: &str, entry: &str) -> CompiledProgram {
        let outcome = WgslCompiler::new().compile(source, entry, "WGSL");
        match outcome.program {
            Some(program) => program,
            None => panic!("compile failed:\n{}", outcome.diagnostics),
        }
    }

    #[test]
    fn test_circle_uniform_block_is_flattened() {
        let program = compile(CIRCLE, "imageMain");
        let r = &program.reflection;

        let radius = r.find_parameter("radius").unwrap();
        assert_eq!(radius.binding, ReflectionBinding::Uniform { offset: 4, size: 4 });
        assert_eq!(radius.user_attribs[0].name, "playground_SLIDER");

        let color = r.find_parameter("color").unwrap();
        assert_eq!(color.binding, ReflectionBinding::Uniform { offset: 16, size: 12 });
        assert_eq!(color.user_attribs[0].name, "playground_COLOR_PICK");

        let mouse = r.find_parameter("mouse").unwrap();
        assert_eq!(mouse.binding, ReflectionBinding::Uniform { offset: 32, size: 16 });
        assert_eq!(program.thread_group_sizes.get("imageMain"), Some(&[16, 16, 1]));
    }

    #[test]
    fn test_prelude_resources_are_reflected() {
        let program = compile(CIRCLE, "imageMain");
        let output = program.reflection.find_parameter(OUTPUT_TEXTURE).unwrap();
        assert_eq!(output.binding, ReflectionBinding::DescriptorTableSlot { index: 2 });
        assert_eq!(output.format.as_deref(), Some("rgba8unorm"));
        assert!(matches!(
            output.ty,
            ReflectionType::Resource { base_shape: BaseShape::Texture2D, access: Some(ResourceAccess::Write), .. }
        ));

        let log = program.reflection.find_parameter(PRINTF_BUFFER).unwrap();
        assert!(log.ty.is_structured_buffer());
    }

    #[test]
    fn test_print_demo_hashes_strings() {
        let program = compile(PRINT, "printMain");
        let strings: Vec<&str> = program.hashed_strings().values().map(String::as_str).collect();
        assert!(strings.contains(&"Hello from the GPU!\n"));
        assert!(strings.contains(&"magic"));
        assert!(!program.code.contains("getStringHash"));
    }

    #[test]
    fn test_multi_kernel_directives() {
        let program = compile(MULTI, "imageMain");
        let r = &program.reflection;

        let noise = r.find_parameter("noise").unwrap();
        assert_eq!(noise.user_attribs[0].name, "playground_RAND");
        assert!(matches!(
            noise.ty,
            ReflectionType::Resource { base_shape: BaseShape::StructuredBuffer, access: Some(ResourceAccess::Read), .. }
        ));

        let trail = r.find_parameter("trail").unwrap();
        assert_eq!(trail.format.as_deref(), Some("r32float"));

        let seed = r.find_entry_point("seedParticles").unwrap();
        let names: Vec<&str> = seed.user_attribs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["playground_CALL", "playground_CALL_ONCE"]);
        assert_eq!(seed.thread_group_size, [64, 1, 1]);
    }

    #[test]
    fn test_non_runnable_source_has_no_prelude() {
        let program = compile(RAND, "computeMain");
        assert!(program.reflection.find_parameter(PRINTF_BUFFER).is_none());
        assert!(program.reflection.find_parameter("seed").is_some());
        assert!(program.reflection.find_parameter("outputBuffer").is_some());
    }

    #[test]
    fn test_parse_error_is_a_diagnostic() {
        let outcome = WgslCompiler::new().compile("fn imageMain( {", "imageMain", "WGSL");
        assert!(outcome.program.is_none());
        assert!(outcome.diagnostics.contains("WGSL Parse Error"));
    }

    #[test]
    fn test_unknown_target() {
        let outcome = WgslCompiler::new().compile(CIRCLE, "imageMain", "SPIRV");
        assert!(outcome.program.is_none());
        assert_eq!(outcome.diagnostics, "unknown compile target: SPIRV");
    }

    #[test]
    fn test_missing_entry_point() {
        let outcome = WgslCompiler::new().compile(CIRCLE, "printMain", "WGSL");
        assert!(outcome.diagnostics.contains("printMain"));
    }

    #[test]
    fn test_print_main_runs_single_invocation() {
        let src = "@compute @workgroup_size(4)\nfn printMain() {\n    print_begin(0u);\n    print_end();\n}";
        let outcome = WgslCompiler::new().compile(src, "printMain", "WGSL");
        assert!(outcome.program.is_none());
        assert!(
            outcome.diagnostics.contains("found @workgroup_size(4, 1, 1)"),
            "{}",
            outcome.diagnostics
        );

        let program = compile(PRINT, "printMain");
        assert_eq!(program.thread_group_sizes.get("printMain"), Some(&[1, 1, 1]));
    }

    #[test]
    fn test_samplers_are_rejected() {
        let src = "@group(0) @binding(3) var s: sampler;\n@compute @workgroup_size(1) fn main() {}";
        let outcome = WgslCompiler::new().compile(src, "main", "WGSL");
        assert!(outcome.diagnostics.contains("samplers are not supported: s"));
    }

    #[test]
    fn test_translation_targets() {
        for target in ["HLSL", "METAL"] {
            let outcome = WgslCompiler::new().compile(CIRCLE, "imageMain", target);
            let program = outcome.program.unwrap_or_else(|| panic!("{}: {}", target, outcome.diagnostics));
            assert!(program.code.contains("imageMain"), "{}", target);
        }
    }

    #[test]
    fn test_find_defined_entry_points() {
        let names = WgslCompiler::new().find_defined_entry_points(MULTI);
        assert_eq!(names, vec!["seedParticles", "moveParticles", "fadeTrail", "imageMain"]);

        let broken = "@compute @workgroup_size(1)\nfn first() {\n@compute @workgroup_size(1) fn second() {}";
        assert_eq!(WgslCompiler::new().find_defined_entry_points(broken), vec!["first", "second"]);
    }
}
