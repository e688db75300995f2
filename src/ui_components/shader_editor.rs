//! Playground source editor
//!
//! Uses `egui_code_editor` when the `code_editor` feature is on, otherwise a
//! monospace `TextEdit` with the same WGSL highlighting.

use eframe::egui;

use super::wgsl_syntax;

/// Renders the WGSL editor.
pub fn render_shader_editor(ui: &mut egui::Ui, code: &mut String, editor_id: &str, font_size: f32) {
    ui.set_min_height(ui.available_height());

    #[cfg(feature = "code_editor")]
    {
        egui_code_editor::CodeEditor::default()
            .id_source(editor_id)
            .with_fontsize(font_size)
            .with_theme(egui_code_editor::ColorTheme::GITHUB_DARK)
            .with_syntax(wgsl_syntax::wgsl())
            .with_numlines(true)
            .vscroll(true)
            .auto_shrink(false)
            .show(ui, code);
    }

    #[cfg(not(feature = "code_editor"))]
    {
        let mut layouter = |ui: &egui::Ui, text: &dyn egui::TextBuffer, wrap_width: f32| {
            let mut job = wgsl_syntax::layout_job(text.as_str(), font_size);
            job.wrap.max_width = wrap_width;
            ui.painter().layout_job(job)
        };
        ui.add(
            egui::TextEdit::multiline(code)
                .id(egui::Id::new(editor_id))
                .font(egui::TextStyle::Monospace)
                .code_editor()
                .desired_width(f32::INFINITY)
                .desired_rows(30)
                .layouter(&mut layouter),
        );
    }
}
