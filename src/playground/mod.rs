//! Reflection-driven execution engine: binding resolution, resource
//! commands, call plans, the printf log decoder and the render loop.

pub mod bindings;
pub mod blit_pipeline;
pub mod call_commands;
pub mod compute_pipeline;
pub mod log_decoder;
pub mod printf;
pub mod random_fill;
pub mod reflection;
pub mod render_loop;
pub mod resource_commands;
pub mod resources;
pub mod session;
pub mod uniform_layout;

pub use render_loop::{LoopState, RenderLoop};
pub use resource_commands::UniformController;
pub use session::{CompileReport, PlaygroundSession, PointerState, RunRequest};
