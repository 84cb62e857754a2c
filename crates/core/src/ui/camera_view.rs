//! Live camera preview and capture affordance.

use eframe::egui;

pub struct CameraView<'a> {
    /// Permission/device failure to display instead of the preview.
    pub error: Option<&'a str>,
    /// Latest preview frame, if the first frame has arrived.
    pub preview: Option<&'a egui::TextureHandle>,
    /// Whether a frame is buffered; capture stays disabled until then.
    pub ready: bool,
}

/// Renders the capture view. Returns true when the capture button was
/// pressed.
pub fn show(ui: &mut egui::Ui, view: &CameraView) -> bool {
    if let Some(error) = view.error {
        // Blocking inline message; no retry affordance, the user has to
        // fix platform permissions and restart the flow.
        ui.centered_and_justified(|ui| {
            ui.colored_label(egui::Color32::LIGHT_RED, error);
        });
        return false;
    }

    let mut capture = false;

    ui.vertical_centered(|ui| {
        ui.add_space(8.0);
        ui.heading("Strike a pose");
        ui.add_space(8.0);

        let preview_height = (ui.available_height() - 110.0).max(120.0);
        match view.preview {
            Some(texture) => {
                ui.add(
                    egui::Image::new(texture)
                        .max_size(egui::vec2(ui.available_width(), preview_height)),
                );
            }
            None => {
                ui.add_space(preview_height * 0.4);
                ui.spinner();
                ui.label("Starting camera...");
                ui.add_space(preview_height * 0.4);
            }
        }

        ui.add_space(12.0);
        let button = egui::Button::new(egui::RichText::new("Capture").size(18.0))
            .min_size(egui::vec2(160.0, 44.0));
        if ui.add_enabled(view.ready, button).clicked() {
            capture = true;
        }
    });

    capture
}
