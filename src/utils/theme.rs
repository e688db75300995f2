use eframe::egui::{self, Color32, Context, CornerRadius, FontFamily, FontId, Margin, TextStyle, Visuals};

/// Dark theme for the playground: editor on the left, preview on black.
pub fn apply_playground_theme(ctx: &Context, editor_font_size: f32) {
    let mut style = (*ctx.style()).clone();
    style.visuals = Visuals::dark();

    style.visuals.window_fill = Color32::from_rgb(22, 22, 26);
    style.visuals.panel_fill = Color32::from_rgb(16, 16, 19);
    style.visuals.extreme_bg_color = Color32::from_rgb(10, 10, 12);
    style.visuals.code_bg_color = Color32::from_rgb(16, 16, 18);
    style.visuals.window_corner_radius = CornerRadius::same(6);

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(8);
    style.spacing.button_padding = egui::vec2(10.0, 5.0);

    style
        .text_styles
        .insert(TextStyle::Monospace, FontId::new(editor_font_size, FontFamily::Monospace));

    ctx.set_style(style);
}
