//! Theme and styling for the GUI
//!
//! Provides the AppTheme struct with colors, spacing, and styled widget factories.

use eframe::egui;

#[derive(Clone, Copy)]
pub struct AppTheme {
    // Base colors
    pub background: egui::Color32,
    pub surface: egui::Color32,
    pub surface_hover: egui::Color32,
    pub surface_active: egui::Color32,
    pub panel_fill: egui::Color32,
    pub text_primary: egui::Color32,
    pub text_secondary: egui::Color32,

    // Semantic colors
    pub primary: egui::Color32,
    pub secondary: egui::Color32,
    pub success: egui::Color32,
    pub warning: egui::Color32,
    pub error: egui::Color32,

    pub accent_blue: egui::Color32,
    pub accent_orange: egui::Color32,

    pub spacing_xs: f32,
    pub spacing_sm: f32,
    pub spacing_md: f32,
    pub spacing_lg: f32,

    pub button_small: egui::Vec2,
    pub button_medium: egui::Vec2,
}

impl Default for AppTheme {
    fn default() -> Self {
        Self {
            // Night blue surfaces with a gateway-teal accent
            background: egui::Color32::from_rgb(10, 14, 22),
            surface: egui::Color32::from_rgb(18, 24, 36),
            surface_hover: egui::Color32::from_rgb(28, 36, 52),
            surface_active: egui::Color32::from_rgb(40, 50, 70),
            panel_fill: egui::Color32::from_rgb(14, 19, 29),
            text_primary: egui::Color32::from_rgb(226, 232, 240),
            text_secondary: egui::Color32::from_rgb(140, 150, 170),

            primary: egui::Color32::from_rgb(56, 189, 248),
            secondary: egui::Color32::from_rgb(60, 70, 90),
            success: egui::Color32::from_rgb(52, 211, 153),
            warning: egui::Color32::from_rgb(251, 191, 36),
            error: egui::Color32::from_rgb(248, 113, 113),

            accent_blue: egui::Color32::from_rgb(96, 165, 250),
            accent_orange: egui::Color32::from_rgb(251, 146, 60),

            spacing_xs: 4.0,
            spacing_sm: 8.0,
            spacing_md: 16.0,
            spacing_lg: 24.0,

            button_small: egui::vec2(90.0, 26.0),
            button_medium: egui::vec2(130.0, 32.0),
        }
    }
}

impl AppTheme {
    pub fn button_primary(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary).strong())
            .fill(self.surface)
            .stroke(egui::Stroke::new(2.0, self.primary))
            .min_size(self.button_medium)
    }

    /// Outlined button for secondary actions
    pub fn button_secondary(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary))
            .fill(self.surface)
            .stroke(egui::Stroke::new(1.5, self.secondary))
            .min_size(self.button_medium)
    }

    pub fn button_small(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary))
            .fill(self.secondary)
            .stroke(egui::Stroke::new(1.0, self.surface_active))
            .min_size(self.button_small)
    }

    pub fn frame_surface(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.surface)
            .rounding(4.0)
            .inner_margin(self.spacing_md)
            .stroke(egui::Stroke::new(1.0, self.secondary))
    }

    pub fn frame_panel(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.panel_fill)
            .rounding(6.0)
            .inner_margin(self.spacing_md)
            .stroke(egui::Stroke::new(1.0, self.primary))
    }

    pub fn section_header_text(&self, icon: &str, title: &str) -> String {
        format!("{} {}", icon, title)
    }
}

/// Configure the egui context style with the given theme
pub fn configure_style(ctx: &egui::Context, theme: &AppTheme) {
    let mut visuals = egui::Visuals::dark();
    visuals.window_fill = theme.background;
    visuals.panel_fill = theme.panel_fill;
    visuals.override_text_color = Some(theme.text_primary);

    visuals.widgets.noninteractive.bg_fill = theme.surface;
    visuals.widgets.inactive.bg_fill = theme.surface;
    visuals.widgets.hovered.bg_fill = theme.surface_hover;
    visuals.widgets.active.bg_fill = theme.surface_active;
    visuals.widgets.open.bg_fill = theme.surface_active;

    visuals.widgets.inactive.bg_stroke = egui::Stroke::new(1.0, theme.secondary);
    visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.0, theme.primary);
    visuals.widgets.active.bg_stroke = egui::Stroke::new(2.0, theme.primary);
    visuals.selection.bg_fill = theme.surface_active;

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.spacing.menu_margin = egui::Margin::same(8.0);

    style.text_styles.insert(
        egui::TextStyle::Heading,
        egui::FontId::new(20.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Body,
        egui::FontId::new(14.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Monospace,
        egui::FontId::new(12.0, egui::FontFamily::Monospace),
    );

    ctx.set_style(style);
}
