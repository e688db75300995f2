use eframe::egui;

use crate::compiler::{CompileTarget, WgslCompiler};
use crate::playground::session::{compile_for_display, ProgramCache};
use crate::playground::{CompileReport, LoopState, PlaygroundSession, PointerState, RenderLoop, RunRequest};
use crate::ui_components::output_panels::{render_output_tabs, render_text_pane, OutputTab};
use crate::ui_components::settings_menu::{self, target_combo};
use crate::ui_components::shader_editor::render_shader_editor;
use crate::ui_components::uniform_controls::render_uniform_controls;
use crate::utils::playground_constants::MIN_VIEWPORT;
use crate::utils::playground_document::{PlaygroundDocument, PlaygroundSettings};
use crate::utils::{apply_playground_theme, format_shader_error, ShaderError};

/// Built-in demos: (menu label, source).
pub const DEMOS: [(&str, &str); 3] = [
    ("Circle (image)", include_str!("../assets/shaders/circle.wgsl")),
    ("Hello printf (print)", include_str!("../assets/shaders/print.wgsl")),
    ("Particles (multi-kernel)", include_str!("../assets/shaders/multi_kernel.wgsl")),
];

pub struct PlaygroundApp {
    source: String,
    demo_index: usize,
    settings: PlaygroundSettings,

    render_loop: Option<RenderLoop<PlaygroundSession>>,
    running_source: Option<String>,
    run_pending: bool,
    viewport: [u32; 2],
    pointer: PointerState,

    report: CompileReport,
    output_tab: OutputTab,

    show_settings: bool,
    show_error_window: bool,
    error_message: String,
}

impl PlaygroundApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        log::info!("[PlaygroundApp] Initializing");

        let render_loop = match cc.wgpu_render_state.as_ref() {
            Some(render_state) => Some(RenderLoop::new(PlaygroundSession::new(
                render_state.clone(),
                Box::new(WgslCompiler::new()),
            ))),
            None => {
                log::error!("[PlaygroundApp] wgpu render state unavailable, running is disabled");
                None
            }
        };

        Self {
            source: DEMOS[0].1.to_string(),
            demo_index: 0,
            settings: PlaygroundSettings::default(),

            render_loop,
            running_source: None,
            // first demo starts once the preview has a size
            run_pending: true,
            viewport: [0, 0],
            pointer: PointerState::default(),

            report: CompileReport::default(),
            output_tab: OutputTab::default(),

            show_settings: false,
            show_error_window: false,
            error_message: String::new(),
        }
    }

    fn target(&self) -> CompileTarget {
        self.settings.target.parse().unwrap_or(CompileTarget::Wgsl)
    }

    fn show_error(&mut self, err: &ShaderError) {
        self.error_message = format_shader_error(err);
        self.show_error_window = true;
    }
}

impl eframe::App for PlaygroundApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        apply_playground_theme(ctx, self.settings.editor_font_size);
        self.handle_input(ctx);

        egui::SidePanel::left("editor_panel")
            .resizable(true)
            .default_width(790.0)
            .frame(egui::Frame::default().inner_margin(0.0).fill(egui::Color32::from_rgb(20, 20, 25)))
            .show(ctx, |ui| {
                self.render_editor_panel(ui);
            });

        egui::TopBottomPanel::bottom("output_panel")
            .resizable(true)
            .default_height(260.0)
            .show(ctx, |ui| {
                self.render_output_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_preview(ui);
        });

        if self.run_pending && self.viewport.iter().all(|&d| d >= MIN_VIEWPORT) {
            self.run_pending = false;
            self.run();
        }

        self.drive_loop(ctx);

        settings_menu::settings_overlay(ctx, &mut self.show_settings, &mut self.settings);
        self.render_error_window(ctx);
    }
}

impl PlaygroundApp {
    fn render_editor_panel(&mut self, ui: &mut egui::Ui) {
        ui.spacing_mut().item_spacing = egui::vec2(6.0, 0.0);

        ui.vertical(|ui| {
            let toolbar = egui::Frame::default()
                .fill(egui::Color32::from_rgb(30, 30, 35))
                .inner_margin(egui::Margin::symmetric(8, 6));
            toolbar.show(ui, |ui| {
                ui.horizontal(|ui| {
                    let mut demo_index = self.demo_index;
                    egui::ComboBox::from_id_salt("demo_select")
                        .selected_text(DEMOS[demo_index].0)
                        .show_ui(ui, |ui| {
                            for (index, (label, _)) in DEMOS.iter().enumerate() {
                                ui.selectable_value(&mut demo_index, index, *label);
                            }
                        });
                    if demo_index != self.demo_index {
                        self.load_demo(demo_index);
                    }

                    target_combo(ui, "toolbar_target", &mut self.settings.target);

                    let run_label = if self.target().is_runnable() { "Run" } else { "Compile" };
                    if ui
                        .button(egui::RichText::new(run_label).strong())
                        .on_hover_text("Compile and run (Ctrl+Enter)")
                        .clicked()
                    {
                        self.run();
                    }
                    if ui.button("Open").clicked() {
                        self.open_document();
                    }
                    if ui.button("Save").clicked() {
                        self.save_document();
                    }
                    if ui.button("⚙").on_hover_text("Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                });
            });

            egui::ScrollArea::vertical()
                .id_salt("editor_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    render_shader_editor(ui, &mut self.source, "playground_source", self.settings.editor_font_size);
                });
        });
    }

    fn render_preview(&mut self, ui: &mut egui::Ui) {
        let frame_ms = self.session().and_then(PlaygroundSession::average_frame_ms);
        ui.horizontal(|ui| {
            let state = self.render_loop.as_ref().map(RenderLoop::state);
            ui.label(format!("State: {:?}", state.unwrap_or(LoopState::Idle)));
            if let Some(ms) = frame_ms {
                ui.label(format!("{:.2} ms/frame", ms));
            }
        });

        if let Some(session) = self.render_loop.as_mut().map(RenderLoop::driver_mut) {
            render_uniform_controls(ui, session.controllers_mut());
        }

        let size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let ppp = ui.ctx().pixels_per_point();
        self.viewport = [
            (rect.width() * ppp).round().max(0.0) as u32,
            (rect.height() * ppp).round().max(0.0) as u32,
        ];

        if let Some(pos) = response.interact_pointer_pos() {
            let local = (pos - rect.min) * ppp;
            self.pointer.position = [local.x, local.y];
            if response.drag_started() || response.clicked() {
                self.pointer.click = [local.x, local.y];
                self.pointer.clicked = true;
            }
        }
        self.pointer.down = response.is_pointer_button_down_on();

        let texture = self.session().and_then(PlaygroundSession::display_texture);
        match texture {
            Some(texture_id) => {
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                ui.painter().image(texture_id, rect, uv, egui::Color32::WHITE);
            }
            None => {
                ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);
            }
        }

        let pointer = self.pointer;
        if let Some(session) = self.render_loop.as_mut().map(RenderLoop::driver_mut) {
            session.set_pointer(pointer);
        }
        self.pointer.clicked = false;
    }

    fn render_output_panel(&mut self, ui: &mut egui::Ui) {
        render_output_tabs(ui, &mut self.output_tab);
        ui.separator();

        match self.output_tab {
            OutputTab::Output => {
                let text = self
                    .session()
                    .and_then(PlaygroundSession::output)
                    .map(str::to_string)
                    .unwrap_or_else(|| self.report.diagnostics.clone());
                render_text_pane(ui, "output_pane", &text, "Run a printMain shader to see its output.");
            }
            OutputTab::Code => render_text_pane(ui, "code_pane", &self.report.code, "Nothing compiled yet."),
            OutputTab::Reflection => {
                render_text_pane(ui, "reflection_pane", &self.report.reflection_json, "Nothing compiled yet.")
            }
        }
    }

    fn render_error_window(&mut self, ctx: &egui::Context) {
        if !self.show_error_window {
            return;
        }

        egui::Window::new("Shader Error")
            .collapsible(false)
            .resizable(true)
            .default_width(600.0)
            .default_height(450.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(550.0);

                egui::ScrollArea::vertical().max_height(380.0).show(ui, |ui| {
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new(&self.error_message)
                            .color(egui::Color32::from_rgb(255, 120, 120))
                            .size(13.0)
                            .family(egui::FontFamily::Monospace),
                    );
                    ui.add_space(10.0);
                });

                ui.separator();
                ui.horizontal(|ui| {
                    ui.add_space(ui.available_width() - 70.0);
                    if ui.button("  Close  ").clicked() {
                        self.show_error_window = false;
                    }
                });
            });
    }

    fn session(&self) -> Option<&PlaygroundSession> {
        self.render_loop.as_ref().map(RenderLoop::driver)
    }

    /// Advance the render loop, restarting image runs whose viewport changed.
    fn drive_loop(&mut self, ctx: &egui::Context) {
        let viewport = self.viewport;
        let Some(render_loop) = self.render_loop.as_mut() else {
            return;
        };

        let resized = render_loop.state() == LoopState::Running
            && render_loop.driver().viewport().is_some_and(|current| current != viewport);
        if resized {
            if let Some(source) = self.running_source.clone() {
                log::debug!("[PlaygroundApp] Viewport changed to {}x{}", viewport[0], viewport[1]);
                render_loop.request(RunRequest { source, viewport });
            }
        }

        if render_loop.is_active() {
            render_loop.tick();
            ctx.request_repaint();
        }

        if let Some(err) = render_loop.take_error() {
            self.show_error(&err);
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let (run, bigger, smaller) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::Enter),
                i.modifiers.command && i.key_pressed(egui::Key::Plus),
                i.modifiers.command && i.key_pressed(egui::Key::Minus),
            )
        });
        if run {
            self.run();
        }
        if bigger {
            self.settings.editor_font_size = (self.settings.editor_font_size + 2.0).min(48.0);
        }
        if smaller {
            self.settings.editor_font_size = (self.settings.editor_font_size - 2.0).max(12.0);
        }
    }

    /// Compile for the panes and, for the runnable target, (re)start the loop.
    fn run(&mut self) {
        let target = self.target();
        log::info!("[PlaygroundApp] Run requested ({} bytes, target {})", self.source.len(), target);

        self.report = match self.render_loop.as_mut() {
            Some(render_loop) => render_loop.driver_mut().compile_for_display(&self.source, target),
            None => compile_for_display(&WgslCompiler::new(), &self.source, target, &mut ProgramCache::default()),
        };
        self.show_error_window = false;

        if !target.is_runnable() {
            self.output_tab = OutputTab::Code;
            if !self.report.diagnostics.is_empty() {
                self.show_error(&ShaderError::Compilation(self.report.diagnostics.clone()));
            }
            return;
        }

        let Some(render_loop) = self.render_loop.as_mut() else {
            self.show_error(&ShaderError::Gpu("GPU Error\n\nNo wgpu device available".to_string()));
            return;
        };
        self.running_source = Some(self.source.clone());
        render_loop.request(RunRequest {
            source: self.source.clone(),
            viewport: self.viewport,
        });
        self.output_tab = OutputTab::Output;
    }

    fn load_demo(&mut self, index: usize) {
        log::info!("[PlaygroundApp] Loading demo {}", DEMOS[index].0);
        self.demo_index = index;
        self.source = DEMOS[index].1.to_string();
        self.run();
    }

    fn open_document(&mut self) {
        match PlaygroundDocument::open_with_dialog() {
            Some(Ok(document)) => {
                log::info!("[PlaygroundApp] Opened document (version {})", document.version);
                self.source = document.source;
                self.settings.target = document.target;
                self.settings.entry_point = document.entry_point;
                self.run();
            }
            Some(Err(msg)) => self.show_error(&ShaderError::resource(msg)),
            None => {}
        }
    }

    fn save_document(&mut self) {
        let document = PlaygroundDocument::new(self.source.clone(), &self.settings);
        if let Some(Err(msg)) = document.save_with_dialog() {
            self.show_error(&ShaderError::resource(msg));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{check_shader_type, ShaderCompiler, ShaderMode};

    #[test]
    fn test_demos_are_runnable() {
        let modes: Vec<ShaderMode> = DEMOS
            .iter()
            .map(|(label, source)| check_shader_type(source).unwrap_or_else(|e| panic!("{}: {}", label, e)))
            .collect();
        assert_eq!(modes, vec![ShaderMode::Image, ShaderMode::Print, ShaderMode::Image]);
    }

    #[test]
    fn test_demos_compile() {
        let compiler = WgslCompiler::new();
        for (label, source) in DEMOS {
            let mode = check_shader_type(source).unwrap();
            let outcome = compiler.compile(source, mode.entry_point(), "WGSL");
            assert!(outcome.program.is_some(), "{}: {}", label, outcome.diagnostics);
        }
    }
}
