use eframe::egui;

use crate::compiler::CompileTarget;
use crate::utils::playground_document::PlaygroundSettings;

pub fn settings_overlay(ctx: &egui::Context, show_settings: &mut bool, settings: &mut PlaygroundSettings) {
    if !*show_settings {
        return;
    }

    egui::Window::new("Settings")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 50.0))
        .resizable(false)
        .collapsible(false)
        .default_width(260.0)
        .open(show_settings)
        .show(ctx, |ui| {
            ui.heading("Editor");
            ui.separator();

            ui.label("Font Size:");
            ui.add(egui::Slider::new(&mut settings.editor_font_size, 12.0..=48.0).text("px"));

            ui.add_space(10.0);
            ui.heading("Compiler");
            ui.separator();
            target_combo(ui, "settings_target", &mut settings.target);
        });
}

/// Compile target picker. Only WGSL output can be run.
pub fn target_combo(ui: &mut egui::Ui, id: &str, target: &mut String) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(target.as_str())
        .show_ui(ui, |ui| {
            for option in CompileTarget::ALL {
                let label = if option.is_runnable() {
                    option.as_str().to_string()
                } else {
                    format!("{} (view only)", option.as_str())
                };
                ui.selectable_value(target, option.as_str().to_string(), label);
            }
        });
}
