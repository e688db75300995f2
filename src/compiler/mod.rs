#[allow(clippy::module_inception)]
pub mod compiler;
pub mod directives;
mod reflect;
pub mod wgsl_compiler;

pub use compiler::{check_shader_type, CompileOutcome, CompileTarget, CompiledProgram, ShaderCompiler, ShaderMode};
pub use wgsl_compiler::WgslCompiler;
