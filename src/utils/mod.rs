pub mod errors;
pub mod image_loader;
pub mod panic_handler;
pub mod playground_constants;
pub mod playground_document;
pub mod theme;

pub use errors::{format_shader_error, ShaderError};
pub use panic_handler::{catch_panic_mut, guard_gpu};
pub use theme::apply_playground_theme;
