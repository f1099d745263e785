//! Activity log view
//!
//! Shows the operation log file plus the paths the app writes to.

use crate::gui::app::GuiApp;
use crate::user_settings::UserSettings;
use eframe::egui::{self, RichText};

impl GuiApp {
    pub(crate) fn view_activity_log(&mut self, ui: &mut egui::Ui) {
        if self.log_view.is_placeholder() && self.log_view.job.is_none() {
            self.refresh_logs();
        }

        self.render_section_header(ui, "📜", "ACTIVITY LOG");
        ui.add_space(self.theme.spacing_sm);

        ui.horizontal(|ui| {
            let is_loading = self.log_view.job.is_some();
            if ui
                .add_enabled(
                    !is_loading,
                    self.theme.button_small(if is_loading { "..." } else { "Refresh" }),
                )
                .clicked()
            {
                self.refresh_logs();
            }
        });
        ui.add_space(self.theme.spacing_xs);

        if let Some(err) = &self.log_view.error {
            ui.colored_label(self.theme.error, err);
        }

        let scroll_to_bottom = self.log_view.scroll_to_bottom;
        self.theme.frame_surface().show(ui, |ui| {
            ui.set_min_height(300.0);
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .max_height(420.0)
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.monospace(&self.log_view.content);
                    if scroll_to_bottom {
                        ui.label("").scroll_to_me(Some(egui::Align::BOTTOM));
                    }
                });
        });
        self.log_view.scroll_to_bottom = false;

        ui.add_space(self.theme.spacing_lg);
        self.render_about_panel(ui);
    }

    fn render_about_panel(&mut self, ui: &mut egui::Ui) {
        self.theme.frame_panel().show(ui, |ui| {
            ui.label(RichText::new("About").size(16.0).strong());
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("about_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_xs])
                .show(ui, |ui| {
                    ui.label(RichText::new("Version:").color(self.theme.text_secondary));
                    ui.label(RichText::new(env!("CARGO_PKG_VERSION")).strong());
                    ui.end_row();

                    ui.label(RichText::new("Supported asset:").color(self.theme.text_secondary));
                    ui.label(&self.config.supported_asset);
                    ui.end_row();

                    for (label, path) in [
                        ("Settings file:", UserSettings::settings_path_display()),
                        ("Log file:", crate::operation_log::log_file_path()),
                    ] {
                        ui.label(RichText::new(label).color(self.theme.text_secondary));
                        ui.horizontal(|ui| {
                            ui.label(RichText::new(&path).small().color(self.theme.text_secondary));
                            if ui.small_button("📋").on_hover_text("Copy path").clicked() {
                                ui.output_mut(|o| o.copied_text = path.clone());
                            }
                        });
                        ui.end_row();
                    }
                });
        });
    }
}
