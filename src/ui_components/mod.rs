pub mod output_panels;
pub mod settings_menu;
pub mod shader_editor;
pub mod uniform_controls;
pub mod wgsl_syntax;
