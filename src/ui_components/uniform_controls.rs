use eframe::egui;

use crate::playground::UniformController;

/// Sliders and color pickers for `playground_SLIDER` / `playground_COLOR_PICK`
/// members. New values reach the uniform buffer on the next frame.
pub fn render_uniform_controls(ui: &mut egui::Ui, controllers: &mut [UniformController]) {
    if controllers.is_empty() {
        return;
    }

    egui::Frame::group(ui.style())
        .fill(egui::Color32::from_rgb(25, 25, 30))
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 60, 70)))
        .corner_radius(6.0)
        .inner_margin(10.0)
        .show(ui, |ui| {
            ui.label(egui::RichText::new("Uniforms").size(14.0).strong());
            ui.add_space(4.0);

            egui::Grid::new("uniform_controls_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    for controller in controllers.iter_mut() {
                        match controller {
                            UniformController::Slider { name, value, min, max, .. } => {
                                ui.label(name.as_str());
                                ui.add(egui::Slider::new(value, *min..=*max));
                            }
                            UniformController::ColorPick { name, value, .. } => {
                                ui.label(name.as_str());
                                ui.color_edit_button_rgb(value);
                            }
                        }
                        ui.end_row();
                    }
                });
        });
}
