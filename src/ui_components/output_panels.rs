//! Read-only panes next to the preview: compiled code, reflection JSON and
//! print output.

use eframe::egui;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTab {
    #[default]
    Output,
    Code,
    Reflection,
}

impl OutputTab {
    const ALL: [OutputTab; 3] = [OutputTab::Output, OutputTab::Code, OutputTab::Reflection];

    fn label(self) -> &'static str {
        match self {
            OutputTab::Output => "Output",
            OutputTab::Code => "Compiled Code",
            OutputTab::Reflection => "Reflection",
        }
    }
}

pub fn render_output_tabs(ui: &mut egui::Ui, active: &mut OutputTab) {
    ui.horizontal(|ui| {
        for tab in OutputTab::ALL {
            if ui.selectable_label(*active == tab, tab.label()).clicked() {
                *active = tab;
            }
        }
    });
}

/// Monospace, selectable, scrollable text.
pub fn render_text_pane(ui: &mut egui::Ui, id: &str, text: &str, placeholder: &str) {
    egui::ScrollArea::both()
        .id_salt(id)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            if text.is_empty() {
                ui.label(egui::RichText::new(placeholder).italics().color(egui::Color32::GRAY));
                return;
            }
            let mut view = text;
            ui.add(
                egui::TextEdit::multiline(&mut view)
                    .font(egui::TextStyle::Monospace)
                    .desired_width(f32::INFINITY),
            );
        });
}
