//! Modal message dialog for load/save outcomes.

use eframe::egui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Info,
}

impl Severity {
    fn icon(&self) -> &'static str {
        match self {
            Severity::Error => "❌",
            Severity::Info => "ℹ️",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Info => "Notice",
        }
    }
}

/// A message waiting to be acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDialog {
    pub severity: Severity,
    pub message: String,
}

impl MessageDialog {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, message: message.into() }
    }

    /// Draws the dialog centered on screen. Returns `true` once dismissed.
    pub fn show(&self, ctx: &egui::Context) -> bool {
        let title = format!("{} {}", self.severity.icon(), self.severity.title());

        let mut should_close = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&self.message);
                ui.add_space(12.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                    if ui.button("OK").clicked() {
                        should_close = true;
                    }
                });
            });

        should_close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_severity() {
        let failed = MessageDialog::error("Failed to load PDF: nope");
        assert_eq!(failed.severity, Severity::Error);
        assert_eq!(failed.severity.title(), "Error");

        let saved = MessageDialog::info("PDF Saved!");
        assert_eq!(saved.severity.title(), "Notice");
        assert_eq!(saved.message, "PDF Saved!");
    }
}
