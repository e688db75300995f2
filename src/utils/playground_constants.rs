//! Centralized playground constants
//!
//! Reserved resource names, buffer capacities and dispatch tiles shared by
//! the compiler prelude, the resource allocator and the render loop.

/// Prefix shared by every resource and call directive.
pub const DIRECTIVE_PREFIX: &str = "playground_";

/// Entry points that make a source runnable.
pub const IMAGE_MAIN: &str = "imageMain";
pub const PRINT_MAIN: &str = "printMain";

// Resources provisioned for every run, independent of directives.
pub const OUTPUT_TEXTURE: &str = "outputTexture";
pub const OUTPUT_BUFFER: &str = "outputBuffer";
pub const OUTPUT_BUFFER_READ: &str = "outputBufferRead";
pub const PRINTF_BUFFER: &str = "g_printedBuffer";
pub const PRINTF_BUFFER_READ: &str = "printfBufferRead";
pub const UNIFORM_INPUT: &str = "uniformInput";

/// Byte size of one `{type, low, high}` log record.
pub const PRINTF_RECORD_SIZE: usize = 12;
/// Number of records the log buffer holds.
pub const PRINTF_RECORD_CAPACITY: usize = 2048;
pub const PRINTF_BUFFER_SIZE: u64 = (PRINTF_RECORD_SIZE * PRINTF_RECORD_CAPACITY) as u64;

/// Small result buffer and its staging twin.
pub const OUTPUT_BUFFER_SIZE: u64 = 2 * 2 * 4;

/// Smallest uniform buffer we ever allocate.
pub const MIN_UNIFORM_SIZE: u64 = 16;

/// Main image pass is dispatched in 16x16 tiles over the viewport.
pub const MAIN_PASS_TILE: u32 = 16;

/// Work-group width of the random fill kernel.
pub const RAND_WORKGROUP_WIDTH: u32 = 64;
pub const RAND_ENTRY_POINT: &str = "computeMain";

/// Uniform members the loop fills in every frame when present.
pub const TIME_UNIFORM: &str = "time";
pub const MOUSE_UNIFORM: &str = "mouse";

/// Viewports smaller than this are treated as not ready.
pub const MIN_VIEWPORT: u32 = 2;

/// Frames averaged for the timing readout.
pub const FRAME_TIME_WINDOW: u32 = 20;

pub const TRUNCATED_LOG_NOTICE: &str = "Print buffer is out of boundary, some data is missing!!!";
pub const NOT_RUNNABLE_MESSAGE: &str =
    "In order to run the shader, please define either imageMain or printMain function in the shader code.";
