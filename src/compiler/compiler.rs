use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::playground::reflection::ReflectionJson;
use crate::utils::playground_constants::{IMAGE_MAIN, NOT_RUNNABLE_MESSAGE, PRINT_MAIN};
use crate::utils::ShaderError;

/// Output language of a compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileTarget {
    #[default]
    Wgsl,
    Hlsl,
    Metal,
}

impl CompileTarget {
    pub const ALL: [CompileTarget; 3] = [CompileTarget::Wgsl, CompileTarget::Hlsl, CompileTarget::Metal];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompileTarget::Wgsl => "WGSL",
            CompileTarget::Hlsl => "HLSL",
            CompileTarget::Metal => "METAL",
        }
    }

    /// Only WGSL output can be executed by the playground.
    pub fn is_runnable(&self) -> bool {
        matches!(self, CompileTarget::Wgsl)
    }
}

impl fmt::Display for CompileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompileTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompileTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown compile target: {}", s))
    }
}

/// Everything the engine needs from a successful compile.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub code: String,
    pub target: CompileTarget,
    pub reflection: ReflectionJson,
    pub thread_group_sizes: BTreeMap<String, [u32; 3]>,
}

impl CompiledProgram {
    pub fn hashed_strings(&self) -> &BTreeMap<u32, String> {
        &self.reflection.hashed_strings
    }
}

/// Result of a compile: a program when one was produced, plus any diagnostic text.
#[derive(Debug, Clone, Default)]
pub struct CompileOutcome {
    pub program: Option<CompiledProgram>,
    pub diagnostics: String,
}

impl CompileOutcome {
    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            program: None,
            diagnostics: diagnostics.into(),
        }
    }

    /// The program, or the diagnostics as a compilation error.
    pub fn into_program(self) -> Result<CompiledProgram, ShaderError> {
        self.program
            .ok_or(ShaderError::Compilation(self.diagnostics))
    }
}

/// The compiler collaborator. Implementations must never panic on bad input;
/// every failure is reported through `CompileOutcome::diagnostics`.
pub trait ShaderCompiler {
    fn compile(&self, source: &str, entry_point: &str, target: &str) -> CompileOutcome;

    fn find_defined_entry_points(&self, source: &str) -> Vec<String>;
}

/// How a runnable source produces its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderMode {
    Image,
    Print,
}

impl ShaderMode {
    pub fn entry_point(&self) -> &'static str {
        match self {
            ShaderMode::Image => IMAGE_MAIN,
            ShaderMode::Print => PRINT_MAIN,
        }
    }
}

/// Classify a source by which runnable entry point it mentions. Exactly one
/// of `imageMain`/`printMain` must appear.
pub fn check_shader_type(source: &str) -> Result<ShaderMode, ShaderError> {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    let (image, print) = RE.get_or_init(|| {
        (
            Regex::new(&format!(r"\b{}\b", IMAGE_MAIN)).expect("imageMain pattern"),
            Regex::new(&format!(r"\b{}\b", PRINT_MAIN)).expect("printMain pattern"),
        )
    });

    match (image.is_match(source), print.is_match(source)) {
        (true, false) => Ok(ShaderMode::Image),
        (false, true) => Ok(ShaderMode::Print),
        _ => Err(ShaderError::Compilation(NOT_RUNNABLE_MESSAGE.to_string())),
    }
}
