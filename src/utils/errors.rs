use std::any::Any;
use thiserror::Error;

/// Errors raised while compiling, setting up or running a playground program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShaderError {
    /// Compiler diagnostics that prevented a program from being produced.
    #[error("{0}")]
    Compilation(String),

    /// A directive or binding does not fit the parameter it was applied to.
    #[error("{0}")]
    Binding(String),

    /// An image, texture or buffer could not be acquired.
    #[error("{0}")]
    Resource(String),

    /// Malformed printf format string.
    #[error("{0}")]
    Format(String),

    /// Preconditions are not met yet (no pipeline, zero-sized viewport).
    /// Swallowed silently by the render loop.
    #[error("not ready: {0}")]
    NotReady(String),

    /// A wgpu validation panic caught during setup or a frame.
    #[error("{0}")]
    Gpu(String),
}

impl ShaderError {
    pub fn binding(msg: impl Into<String>) -> Self {
        ShaderError::Binding(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        ShaderError::Resource(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        ShaderError::NotReady(msg.into())
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, ShaderError::NotReady(_))
    }
}

/// Render an error for the diagnostics pane.
pub fn format_shader_error(err: &ShaderError) -> String {
    match err {
        ShaderError::Compilation(msg) => format!("Compilation failed:\n{}", msg),
        ShaderError::Binding(msg) => format!("Binding error: {}", msg),
        ShaderError::Resource(msg) => format!("Resource error: {}", msg),
        ShaderError::Format(msg) => format!("Format error: {}", msg),
        ShaderError::NotReady(msg) => format!("Not ready: {}", msg),
        ShaderError::Gpu(msg) => msg.clone(),
    }
}

pub fn panic_to_string(e: Box<dyn Any + Send>) -> String {
    let any = &*e;
    if let Some(s) = any.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = any.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic occurred".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_is_distinguished() {
        assert!(ShaderError::not_ready("viewport").is_not_ready());
        assert!(!ShaderError::binding("x").is_not_ready());
    }

    #[test]
    fn test_format_binding_error() {
        let err = ShaderError::binding("ZEROS attribute cannot be applied to tex");
        assert_eq!(
            format_shader_error(&err),
            "Binding error: ZEROS attribute cannot be applied to tex"
        );
    }

    #[test]
    fn test_panic_to_string() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_to_string(boxed), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_to_string(boxed), "bang");
    }
}
