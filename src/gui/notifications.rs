//! Notification history and toast overlay.

use eframe::egui::{self, RichText};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::theme::AppTheme;

const MAX_NOTIFICATIONS: usize = 50;
const TOAST_DURATION: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct NotificationEntry {
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl NotificationEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: chrono::Local::now(),
        }
    }

    pub fn time_ago(&self) -> String {
        Self::describe_age(chrono::Local::now().signed_duration_since(self.timestamp))
            .unwrap_or_else(|| self.timestamp.format("%m/%d %H:%M").to_string())
    }

    fn describe_age(age: chrono::Duration) -> Option<String> {
        if age.num_seconds() < 60 {
            Some("just now".to_string())
        } else if age.num_minutes() < 60 {
            Some(format!("{}m ago", age.num_minutes()))
        } else if age.num_hours() < 24 {
            Some(format!("{}h ago", age.num_hours()))
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct Notifications {
    entries: VecDeque<NotificationEntry>,
    toast_until: Option<Instant>,
    show_history: bool,
}

impl Notifications {
    pub fn push(&mut self, message: impl Into<String>) {
        let entry = NotificationEntry::new(message);
        tracing::debug!("Notification: {}", entry.message);
        self.entries.push_back(entry);
        while self.entries.len() > MAX_NOTIFICATIONS {
            self.entries.pop_front();
        }
        self.toast_until = Some(Instant::now() + TOAST_DURATION);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&NotificationEntry> {
        self.entries.back()
    }

    fn toast_visible(&self, now: Instant) -> bool {
        self.toast_until.is_some_and(|until| now < until)
    }

    /// Toast in the bottom-right corner, plus the history window when opened.
    pub fn render(&mut self, ctx: &egui::Context, theme: &AppTheme) {
        let toast_visible = self.toast_visible(Instant::now());
        if !toast_visible {
            self.toast_until = None;
        }

        egui::Area::new(egui::Id::new("notification_overlay"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(theme.surface)
                    .rounding(6.0)
                    .stroke(egui::Stroke::new(1.0, theme.primary))
                    .inner_margin(egui::Margin::symmetric(8.0, 6.0))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            let icon_color = if self.is_empty() {
                                theme.text_secondary
                            } else {
                                theme.primary
                            };
                            if ui
                                .add(
                                    egui::Button::new(RichText::new("🔔").color(icon_color))
                                        .fill(egui::Color32::TRANSPARENT)
                                        .stroke(egui::Stroke::NONE),
                                )
                                .on_hover_text("Notification history")
                                .clicked()
                            {
                                self.show_history = !self.show_history;
                            }

                            if toast_visible {
                                if let Some(entry) = self.latest() {
                                    let text = if entry.message.chars().count() > 48 {
                                        let short: String = entry.message.chars().take(48).collect();
                                        format!("{}...", short)
                                    } else {
                                        entry.message.clone()
                                    };
                                    ui.label(RichText::new(text).size(12.0));
                                }
                            } else if !self.is_empty() {
                                ui.label(
                                    RichText::new(self.len().to_string())
                                        .size(10.0)
                                        .color(theme.accent_orange),
                                );
                            }
                        });
                    });
            });

        if self.show_history {
            self.render_history(ctx, theme);
        }
    }

    fn render_history(&mut self, ctx: &egui::Context, theme: &AppTheme) {
        let mut open = true;
        egui::Window::new("Notifications")
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_width(420.0)
            .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -50.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(format!("{} notifications", self.len()))
                            .color(theme.text_secondary),
                    );
                    if ui.add(theme.button_small("Clear")).clicked() {
                        self.entries.clear();
                    }
                });
                ui.separator();
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .max_height(280.0)
                    .show(ui, |ui| {
                        if self.entries.is_empty() {
                            ui.label(RichText::new("No notifications yet.").color(theme.text_secondary));
                        }
                        for entry in self.entries.iter().rev() {
                            ui.horizontal_wrapped(|ui| {
                                ui.label(
                                    RichText::new(format!("[{}]", entry.time_ago()))
                                        .size(11.0)
                                        .color(theme.text_secondary),
                                );
                                ui.label(RichText::new(&entry.message).size(12.0));
                            });
                        }
                    });
            });
        if !open {
            self.show_history = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_caps_history() {
        let mut notifications = Notifications::default();
        for i in 0..60 {
            notifications.push(format!("message {}", i));
        }
        assert_eq!(notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(notifications.latest().unwrap().message, "message 59");
        assert_eq!(notifications.entries.front().unwrap().message, "message 10");
    }

    #[test]
    fn test_push_shows_toast() {
        let mut notifications = Notifications::default();
        assert!(!notifications.toast_visible(Instant::now()));
        notifications.push("Switched to Avalanche");
        assert!(notifications.toast_visible(Instant::now()));
        assert!(!notifications.toast_visible(Instant::now() + TOAST_DURATION * 2));
    }

    #[test]
    fn test_describe_age() {
        assert_eq!(
            NotificationEntry::describe_age(chrono::Duration::seconds(5)).as_deref(),
            Some("just now")
        );
        assert_eq!(
            NotificationEntry::describe_age(chrono::Duration::minutes(12)).as_deref(),
            Some("12m ago")
        );
        assert_eq!(
            NotificationEntry::describe_age(chrono::Duration::hours(3)).as_deref(),
            Some("3h ago")
        );
        assert!(NotificationEntry::describe_age(chrono::Duration::days(2)).is_none());
    }
}
